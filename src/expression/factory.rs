//! Canonicalizing builders for sums and products.
//!
//! [`AddFactory`] accumulates a running constant plus a term-to-coefficient
//! map; [`MulFactory`] accumulates a running constant times a
//! base-to-exponent map. Feeding an expression into a builder flattens it
//! into the accumulator, merging like terms and erasing entries that cancel,
//! so `build` produces the canonical node directly. The arithmetic operators
//! use these internally; they are public so that long sums and products can
//! be assembled in O(n log n) instead of rebuilding the map on every `+`.

use std::collections::BTreeMap;

use crate::scalar::Scalar;

use super::node::ExpressionNode;
use super::Expression;

/// Builds a canonical sum `constant + Σ coefficient * term`.
#[derive(Debug, Clone)]
pub struct AddFactory<T> {
    constant: T,
    terms: BTreeMap<Expression<T>, T>,
}

impl<T: Scalar> Default for AddFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> AddFactory<T> {
    /// An empty sum, equal to zero.
    pub fn new() -> Self {
        Self {
            constant: T::zero(),
            terms: BTreeMap::new(),
        }
    }

    /// Starts from an existing sum node's pieces.
    pub(crate) fn from_parts(constant: T, terms: BTreeMap<Expression<T>, T>) -> Self {
        Self { constant, terms }
    }

    /// Adds `e` to the running sum, flattening sums and splitting scaled
    /// products into coefficient and term.
    pub fn add(&mut self, e: &Expression<T>) {
        match e.node() {
            ExpressionNode::Constant(v) => self.add_constant(v.clone()),
            ExpressionNode::Add { constant, terms } => {
                self.add_constant(constant.clone());
                for (term, coeff) in terms {
                    self.add_term(coeff.clone(), term.clone());
                }
            }
            ExpressionNode::Mul { constant, factors } if !constant.is_one() => {
                // c * rest: the product's constant becomes the coefficient
                let rest = MulFactory::from_parts(T::one(), factors.clone()).build();
                self.add_term(constant.clone(), rest);
            }
            _ => self.add_term(T::one(), e.clone()),
        }
    }

    /// Adds a constant to the running sum.
    pub fn add_constant(&mut self, v: T) {
        self.constant = self.constant.clone() + v;
    }

    /// Adds `coefficient * term`, merging with an existing entry for the
    /// same term and erasing the entry if the coefficients cancel.
    pub fn add_term(&mut self, coefficient: T, term: Expression<T>) {
        if coefficient.is_zero() {
            return;
        }
        let cancelled = match self.terms.get_mut(&term) {
            Some(existing) => {
                *existing = existing.clone() + coefficient;
                existing.is_zero()
            }
            None => {
                self.terms.insert(term.clone(), coefficient);
                false
            }
        };
        if cancelled {
            self.terms.remove(&term);
        }
    }

    /// Negates the whole running sum in place.
    pub fn negate(&mut self) {
        self.constant = -self.constant.clone();
        for coeff in self.terms.values_mut() {
            *coeff = -coeff.clone();
        }
    }

    /// Finalizes the canonical expression.
    pub fn build(mut self) -> Expression<T> {
        if self.terms.is_empty() {
            return Expression::new(self.constant);
        }
        if self.constant.is_zero() && self.terms.len() == 1 {
            // collapse `0 + 1*t` to `t` and `0 + c*t` to the product `c*t`
            if let Some((term, coeff)) = self.terms.pop_first() {
                if coeff.is_one() {
                    return term;
                }
                let mut product = MulFactory::new();
                product.mul_constant(coeff);
                product.mul(&term);
                return product.build();
            }
        }
        Expression::new_add(self.constant, self.terms)
    }
}

/// Builds a canonical product `constant * Π base^exponent`.
#[derive(Debug, Clone)]
pub struct MulFactory<T> {
    constant: T,
    factors: BTreeMap<Expression<T>, Expression<T>>,
}

impl<T: Scalar> Default for MulFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> MulFactory<T> {
    /// An empty product, equal to one.
    pub fn new() -> Self {
        Self {
            constant: T::one(),
            factors: BTreeMap::new(),
        }
    }

    pub(crate) fn from_parts(constant: T, factors: BTreeMap<Expression<T>, Expression<T>>) -> Self {
        Self { constant, factors }
    }

    /// Multiplies `e` into the running product, flattening products and
    /// splitting powers into base and exponent.
    pub fn mul(&mut self, e: &Expression<T>) {
        if self.constant.is_zero() {
            return;
        }
        match e.node() {
            ExpressionNode::Constant(v) => self.mul_constant(v.clone()),
            ExpressionNode::Mul { constant, factors } => {
                self.mul_constant(constant.clone());
                for (base, exponent) in factors {
                    self.multiply(base.clone(), exponent.clone());
                }
            }
            ExpressionNode::Pow { base, exponent } => {
                self.multiply(base.clone(), exponent.clone());
            }
            _ => self.multiply(e.clone(), Expression::one()),
        }
    }

    /// Multiplies a constant into the running product. Zero absorbs every
    /// accumulated factor.
    pub fn mul_constant(&mut self, v: T) {
        self.constant = self.constant.clone() * v;
        if self.constant.is_zero() {
            self.factors.clear();
        }
    }

    /// Multiplies `base ^ exponent` in, merging with an existing entry for
    /// the same base by adding exponents and erasing the entry when the
    /// exponents cancel.
    pub fn multiply(&mut self, mut base: Expression<T>, mut exponent: Expression<T>) {
        if self.constant.is_zero() {
            return;
        }
        // (b^m)^n with integer constants m, n collapses to b^(m*n). This is
        // unsound for even m over a negative base, e.g. (x^2)^0.5 != x, and
        // is accepted as part of the canonical form.
        let folded = match base.node() {
            ExpressionNode::Pow {
                base: inner_base,
                exponent: inner_exponent,
            } if inner_exponent.value().is_some_and(|v| v.is_integer())
                && exponent.value().is_some_and(|v| v.is_integer()) =>
            {
                Some((inner_base.clone(), inner_exponent.clone()))
            }
            _ => None,
        };
        if let Some((inner_base, inner_exponent)) = folded {
            exponent = inner_exponent * exponent;
            base = inner_base;
        }
        let cancelled = match self.factors.get_mut(&base) {
            Some(existing) => {
                *existing = existing.clone() + exponent;
                existing.value().is_some_and(Scalar::is_zero)
            }
            None => {
                if exponent.value().is_some_and(Scalar::is_zero) {
                    return;
                }
                self.factors.insert(base.clone(), exponent);
                false
            }
        };
        if cancelled {
            self.factors.remove(&base);
        }
    }

    /// Negates the running product in place by flipping its constant.
    pub fn negate(&mut self) {
        self.constant = -self.constant.clone();
    }

    /// Finalizes the canonical expression.
    pub fn build(mut self) -> Expression<T> {
        if self.constant.is_zero() {
            return Expression::zero();
        }
        if self.factors.is_empty() {
            return Expression::new(self.constant);
        }
        if self.constant.is_one() && self.factors.len() == 1 {
            // collapse `1 * b^e` to `b` or a bare power node
            if let Some((base, exponent)) = self.factors.pop_first() {
                if exponent.value().is_some_and(Scalar::is_one) {
                    return base;
                }
                return Expression::new_pow(base, exponent);
            }
        }
        Expression::new_mul(self.constant, self.factors)
    }
}
