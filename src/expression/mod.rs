//! The symbolic expression tree.
//!
//! An [`Expression`] is a cheaply cloneable handle (an [`Rc`]) to an
//! immutable, canonicalized tree node. All construction funnels through the
//! arithmetic operators and the [`AddFactory`]/[`MulFactory`] builders, which
//! apply the simplification rules exactly once, at build time; after that the
//! tree never changes shape. Structural equality and a total structural order
//! are derived from the canonical form, so two expressions built from the
//! same arithmetic in any order compare equal.
//!
//! ```
//! use symtree::{Environment, Expression, Variable};
//!
//! let var_x = Variable::new("x");
//! let var_y = Variable::new("y");
//! let x = Expression::<f64>::from(&var_x);
//! let y = Expression::<f64>::from(&var_y);
//!
//! let e = (&x + &y) * (&x - &y);
//! let env = Environment::from_pairs([(var_x, 3.0), (var_y, 2.0)])?;
//! assert_eq!(e.evaluate(&env)?, 5.0);
//! assert_eq!(e.expand()?, &x * &x - &y * &y);
//! # Ok::<(), symtree::Error>(())
//! ```

mod arith;
mod diff;
mod display;
mod expand;
mod factory;
mod node;

pub use factory::{AddFactory, MulFactory};
pub use node::ExpressionKind;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::Error;
use crate::scalar::Scalar;
use crate::variable::{Variable, VariableType};
use crate::variables::Variables;

use node::{ExpressionCell, ExpressionNode};

/// A mapping from variables to the expressions substituted for them.
pub type Substitution<T> = HashMap<Variable, Expression<T>>;

/// An immutable symbolic expression over typed variables and scalars of
/// type `T`.
///
/// Cloning is O(1): expressions share their subtrees. Equality, ordering and
/// hashing are structural, over the canonical form. Because the tree is
/// reference counted without atomics and carries interior caches, an
/// expression is neither `Send` nor `Sync`.
#[derive(Debug)]
pub struct Expression<T>(Rc<ExpressionCell<T>>);

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Scalar> PartialEq for Expression<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Scalar> Eq for Expression<T> {}

impl<T: Scalar> PartialOrd for Expression<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Scalar> Ord for Expression<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        if Rc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        self.0.node().structural_cmp(other.0.node())
    }
}

impl<T: Scalar> Hash for Expression<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.node().hash_into(state);
    }
}

impl<T: Scalar> Default for Expression<T> {
    fn default() -> Self {
        Self::zero()
    }
}

// Conversions from the scalar are per concrete type: a blanket
// `From<T> for Expression<T>` would collide with `From<Variable>` under the
// coherence rules, which disregard the `Scalar` bound.
macro_rules! impl_from_scalar {
    ($($t:ty),*) => {$(
        impl From<$t> for Expression<$t> {
            fn from(value: $t) -> Self {
                Expression::new(value)
            }
        }
    )*};
}

impl_from_scalar!(i32, i64, f32, f64);

#[cfg(feature = "rational")]
impl From<rug::Rational> for Expression<rug::Rational> {
    fn from(value: rug::Rational) -> Self {
        Expression::new(value)
    }
}

impl<T: Scalar> From<Variable> for Expression<T> {
    /// Wraps a variable as an expression.
    ///
    /// # Panics
    ///
    /// Panics if the variable is the dummy or is Boolean-typed; Boolean
    /// variables have no arithmetic interpretation.
    fn from(var: Variable) -> Self {
        assert!(
            !var.is_dummy(),
            "the dummy variable cannot appear in an expression"
        );
        assert!(
            var.var_type() != VariableType::Boolean,
            "Boolean variable {var} cannot appear in an arithmetic expression"
        );
        Self::from_node(ExpressionNode::Var(var))
    }
}

impl<T: Scalar> From<&Variable> for Expression<T> {
    fn from(var: &Variable) -> Self {
        Self::from(var.clone())
    }
}

impl<T: Scalar> Expression<T> {
    /// Wraps a value as a constant expression. A NaN value yields the NaN
    /// expression instead of a constant carrying NaN.
    pub fn new(value: T) -> Self {
        if value.is_nan() {
            Self::nan()
        } else {
            Self::from_node(ExpressionNode::Constant(value))
        }
    }

    /// The constant zero.
    pub fn zero() -> Self {
        Self::new(T::zero())
    }

    /// The constant one.
    pub fn one() -> Self {
        Self::new(T::one())
    }

    /// The NaN expression. Evaluating, substituting into, or expanding it
    /// is an error.
    pub fn nan() -> Self {
        Self::from_node(ExpressionNode::NaN)
    }

    fn from_node(node: ExpressionNode<T>) -> Self {
        Self(Rc::new(ExpressionCell::new(node)))
    }

    pub(crate) fn new_add(constant: T, terms: BTreeMap<Expression<T>, T>) -> Self {
        Self::from_node(ExpressionNode::Add { constant, terms })
    }

    pub(crate) fn new_mul(constant: T, factors: BTreeMap<Expression<T>, Expression<T>>) -> Self {
        Self::from_node(ExpressionNode::Mul { constant, factors })
    }

    pub(crate) fn new_pow(base: Expression<T>, exponent: Expression<T>) -> Self {
        Self::from_node(ExpressionNode::Pow { base, exponent })
    }

    pub(crate) fn new_div(numerator: Expression<T>, denominator: Expression<T>) -> Self {
        Self::from_node(ExpressionNode::Div {
            numerator,
            denominator,
        })
    }

    pub(crate) fn node(&self) -> &ExpressionNode<T> {
        self.0.node()
    }

    pub(crate) fn mark_expanded(&self) {
        self.0.set_expanded();
    }

    pub(crate) fn cell_mut(&mut self) -> Option<&mut ExpressionCell<T>> {
        Rc::get_mut(&mut self.0)
    }

    /// The kind of the root node.
    pub fn kind(&self) -> ExpressionKind {
        self.node().kind()
    }

    /// Whether the root node is a constant.
    pub fn is_constant(&self) -> bool {
        self.kind() == ExpressionKind::Constant
    }

    /// Whether this is the constant `value`, compared numerically.
    pub fn is_constant_value(&self, value: &T) -> bool {
        match self.node() {
            ExpressionNode::Constant(v) => v == value,
            _ => false,
        }
    }

    /// Whether the root node is a variable.
    pub fn is_variable(&self) -> bool {
        self.kind() == ExpressionKind::Var
    }

    /// Whether the root node is a sum.
    pub fn is_addition(&self) -> bool {
        self.kind() == ExpressionKind::Add
    }

    /// Whether the root node is a product.
    pub fn is_multiplication(&self) -> bool {
        self.kind() == ExpressionKind::Mul
    }

    /// Whether the root node is a power.
    pub fn is_power(&self) -> bool {
        self.kind() == ExpressionKind::Pow
    }

    /// Whether the root node is a division.
    pub fn is_division(&self) -> bool {
        self.kind() == ExpressionKind::Div
    }

    /// Whether this is the NaN expression.
    pub fn is_nan(&self) -> bool {
        self.kind() == ExpressionKind::NaN
    }

    /// Whether the root node has no children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind(),
            ExpressionKind::Constant | ExpressionKind::Var | ExpressionKind::NaN
        )
    }

    /// Whether this expression is a polynomial: built from constants and
    /// variables with addition, multiplication, nonnegative integer constant
    /// powers, and division by constants.
    pub fn is_polynomial(&self) -> bool {
        self.0.is_polynomial()
    }

    /// Whether this expression is already in expanded form, so that
    /// [`expand`](Self::expand) returns the same handle.
    pub fn is_expanded(&self) -> bool {
        self.0.is_expanded()
    }

    /// The value of a constant node.
    pub fn value(&self) -> Option<&T> {
        match self.node() {
            ExpressionNode::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// The variable of a variable node.
    pub fn variable(&self) -> Option<&Variable> {
        match self.node() {
            ExpressionNode::Var(var) => Some(var),
            _ => None,
        }
    }

    /// The leading constant of a sum or product node.
    pub fn constant(&self) -> Option<&T> {
        match self.node() {
            ExpressionNode::Add { constant, .. } | ExpressionNode::Mul { constant, .. } => {
                Some(constant)
            }
            _ => None,
        }
    }

    /// The term-to-coefficient map of a sum node.
    pub fn terms(&self) -> Option<&BTreeMap<Expression<T>, T>> {
        match self.node() {
            ExpressionNode::Add { terms, .. } => Some(terms),
            _ => None,
        }
    }

    /// The base-to-exponent map of a product node.
    pub fn factors(&self) -> Option<&BTreeMap<Expression<T>, Expression<T>>> {
        match self.node() {
            ExpressionNode::Mul { factors, .. } => Some(factors),
            _ => None,
        }
    }

    /// The base of a power node.
    pub fn base(&self) -> Option<&Expression<T>> {
        match self.node() {
            ExpressionNode::Pow { base, .. } => Some(base),
            _ => None,
        }
    }

    /// The exponent of a power node.
    pub fn exponent(&self) -> Option<&Expression<T>> {
        match self.node() {
            ExpressionNode::Pow { exponent, .. } => Some(exponent),
            _ => None,
        }
    }

    /// The numerator of a division node.
    pub fn numerator(&self) -> Option<&Expression<T>> {
        match self.node() {
            ExpressionNode::Div { numerator, .. } => Some(numerator),
            _ => None,
        }
    }

    /// The denominator of a division node.
    pub fn denominator(&self) -> Option<&Expression<T>> {
        match self.node() {
            ExpressionNode::Div { denominator, .. } => Some(denominator),
            _ => None,
        }
    }

    /// Structural equality; same as `==`.
    pub fn equal_to(&self, other: &Self) -> bool {
        self == other
    }

    /// Structural strict order; same as `<`.
    pub fn less(&self, other: &Self) -> bool {
        self < other
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The set of variables occurring in this expression. Computed once and
    /// cached in the node.
    pub fn variables(&self) -> &Variables {
        self.0.variables()
    }

    /// Evaluates the expression under `env`.
    ///
    /// Every variable in [`variables`](Self::variables) must be bound in
    /// `env`; division resolves `x/0` to [`Error::DivisionByZero`] and
    /// `0/0` to [`Error::Indeterminate`] instead of producing IEEE
    /// infinities or NaN.
    pub fn evaluate(&self, env: &Environment<T>) -> Result<T, Error> {
        match self.node() {
            ExpressionNode::Constant(v) => Ok(v.clone()),
            ExpressionNode::Var(var) => env.at(var).cloned(),
            ExpressionNode::Add { constant, terms } => {
                let mut sum = constant.clone();
                for (term, coeff) in terms {
                    sum = sum + coeff.clone() * term.evaluate(env)?;
                }
                Ok(sum)
            }
            ExpressionNode::Mul { constant, factors } => {
                let mut product = constant.clone();
                for (base, exponent) in factors {
                    let b = base.evaluate(env)?;
                    let e = exponent.evaluate(env)?;
                    product = product * eval_pow(b, &e)?;
                }
                Ok(product)
            }
            ExpressionNode::Pow { base, exponent } => {
                let b = base.evaluate(env)?;
                let e = exponent.evaluate(env)?;
                eval_pow(b, &e)
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => {
                let n = numerator.evaluate(env)?;
                let d = denominator.evaluate(env)?;
                if d.is_zero() {
                    if n.is_zero() {
                        Err(Error::Indeterminate(self.to_string()))
                    } else {
                        Err(Error::DivisionByZero(self.to_string()))
                    }
                } else {
                    Ok(n / d)
                }
            }
            ExpressionNode::NaN => Err(Error::NanExpression {
                operation: "evaluate",
            }),
        }
    }

    /// Replaces every occurrence of `var` with `e`, rebuilding the enclosing
    /// nodes through the canonicalizing operators.
    pub fn substitute(&self, var: &Variable, e: &Expression<T>) -> Result<Expression<T>, Error> {
        let mut s = Substitution::new();
        s.insert(var.clone(), e.clone());
        self.substitute_all(&s)
    }

    /// Applies all replacements in `s` simultaneously: the substituted
    /// expressions are not themselves rewritten again.
    pub fn substitute_all(&self, s: &Substitution<T>) -> Result<Expression<T>, Error> {
        match self.node() {
            ExpressionNode::Constant(_) => Ok(self.clone()),
            ExpressionNode::Var(var) => Ok(match s.get(var) {
                Some(e) => e.clone(),
                None => self.clone(),
            }),
            ExpressionNode::Add { constant, terms } => {
                let mut builder = AddFactory::new();
                builder.add_constant(constant.clone());
                for (term, coeff) in terms {
                    builder.add(&(Expression::new(coeff.clone()) * term.substitute_all(s)?));
                }
                Ok(builder.build())
            }
            ExpressionNode::Mul { constant, factors } => {
                let mut builder = MulFactory::new();
                builder.mul_constant(constant.clone());
                for (base, exponent) in factors {
                    builder.mul(&base.substitute_all(s)?.pow(&exponent.substitute_all(s)?));
                }
                Ok(builder.build())
            }
            ExpressionNode::Pow { base, exponent } => {
                Ok(base.substitute_all(s)?.pow(&exponent.substitute_all(s)?))
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => Ok(numerator.substitute_all(s)? / denominator.substitute_all(s)?),
            ExpressionNode::NaN => Err(Error::NanExpression {
                operation: "substitute",
            }),
        }
    }

    /// Substitutes the bindings of `env` as constants, leaving unbound
    /// variables symbolic.
    pub fn evaluate_partial(&self, env: &Environment<T>) -> Result<Expression<T>, Error> {
        let s: Substitution<T> = env
            .iter()
            .map(|(var, value)| (var.clone(), Expression::new(value.clone())))
            .collect();
        self.substitute_all(&s)
    }
}

pub(crate) fn eval_pow<T: Scalar>(base: T, exponent: &T) -> Result<T, Error> {
    if T::FRACTIONAL
        && base.is_finite()
        && base < T::zero()
        && exponent.is_finite()
        && !exponent.is_integer()
    {
        return Err(Error::PowDomain {
            base: base.to_string(),
            exponent: exponent.to_string(),
        });
    }
    base.checked_pow(exponent)
        .ok_or_else(|| Error::PowUnrepresentable {
            base: base.to_string(),
            exponent: exponent.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn xyz() -> (Variable, Variable, Variable) {
        (Variable::new("x"), Variable::new("y"), Variable::new("z"))
    }

    #[test]
    fn constant_queries() {
        let e = Expression::from(3.0);
        assert!(e.is_constant());
        assert!(e.is_leaf());
        assert!(e.is_polynomial());
        assert!(e.is_expanded());
        assert_eq!(e.value(), Some(&3.0));
        assert!(e.is_constant_value(&3.0));
        assert!(!e.is_constant_value(&4.0));
        assert!(e.variables().is_empty());
    }

    #[test]
    fn nan_value_becomes_nan_expression() {
        let e = Expression::from(f64::NAN);
        assert!(e.is_nan());
        assert_eq!(e.kind(), ExpressionKind::NaN);
        assert_eq!(e, Expression::<f64>::nan());
    }

    #[test]
    #[should_panic(expected = "dummy variable")]
    fn dummy_variable_rejected() {
        let _ = Expression::<f64>::from(Variable::default());
    }

    #[test]
    #[should_panic(expected = "Boolean variable")]
    fn boolean_variable_rejected() {
        let b = Variable::with_type("b", VariableType::Boolean);
        let _ = Expression::<f64>::from(b);
    }

    #[test]
    fn structural_equality_is_order_independent() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        assert_eq!(&x + &y, &y + &x);
        assert_eq!(&x * &y, &y * &x);
        assert_eq!((&x + &y) * 3.0, 3.0 * (&y + &x));
    }

    #[test]
    fn negative_zero_is_structurally_distinct() {
        let pos = Expression::<f64>::from(0.0);
        let neg = Expression::from(-0.0);
        assert_ne!(pos, neg);
        assert!(neg < pos);
        // but both are the numeric zero for simplification purposes
        assert!(neg.value().unwrap().is_zero());
    }

    #[test]
    fn kind_order_is_total() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let c = Expression::from(5.0);
        let sum = &x + &y;
        let prod = &x * &y;
        let pw = x.pow(&y);
        let div = &x / &y;
        let nan = Expression::<f64>::nan();
        let mut v = vec![
            nan.clone(),
            div.clone(),
            pw.clone(),
            prod.clone(),
            sum.clone(),
            x.clone(),
            c.clone(),
        ];
        v.sort();
        assert_eq!(v, vec![c, x, sum, prod, pw, div, nan]);
    }

    #[test]
    fn variables_are_collected_once() {
        let (var_x, var_y, var_z) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let z = Expression::<f64>::from(&var_z);
        let e = (&x + &y) * z.pow(&x);
        let vars = e.variables();
        assert_eq!(vars.len(), 3);
        assert!(vars.contains(&var_x));
        assert!(vars.contains(&var_y));
        assert!(vars.contains(&var_z));
        // cached: the second call returns the same set
        assert!(std::ptr::eq(vars, e.variables()));
    }

    #[test]
    fn evaluate_arithmetic() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let e = 2.0 * &x + y.pow(&Expression::from(3.0)) - 1.0;
        let env = Environment::from_pairs([(var_x, 4.0), (var_y, 2.0)]).unwrap();
        assert_eq!(e.evaluate(&env).unwrap(), 15.0);
    }

    #[test]
    fn evaluate_unbound_variable() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let env = Environment::from_pairs([(var_y, 1.0)]).unwrap();
        assert_eq!(
            x.evaluate(&env),
            Err(Error::UnboundVariable("x".to_string()))
        );
    }

    #[test]
    fn evaluate_division_by_zero() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let e = &x / &y;
        let env = Environment::from_pairs([(var_x.clone(), 1.0), (var_y.clone(), 0.0)]).unwrap();
        assert!(matches!(e.evaluate(&env), Err(Error::DivisionByZero(_))));
        let env0 = Environment::from_pairs([(var_x, 0.0), (var_y, 0.0)]).unwrap();
        assert!(matches!(e.evaluate(&env0), Err(Error::Indeterminate(_))));
    }

    #[test]
    fn evaluate_pow_domain() {
        let (var_x, _, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let e = x.pow(&Expression::from(0.5));
        let env = Environment::from_pairs([(var_x, -4.0)]).unwrap();
        assert!(matches!(e.evaluate(&env), Err(Error::PowDomain { .. })));
    }

    #[test]
    fn evaluate_integer_pow_overflow() {
        let (var_x, _, _) = xyz();
        let x = Expression::<i64>::from(&var_x);
        let e = x.pow(&Expression::from(80));
        let env = Environment::from_pairs([(var_x, 10)]).unwrap();
        assert!(matches!(
            e.evaluate(&env),
            Err(Error::PowUnrepresentable { .. })
        ));
    }

    #[test]
    fn evaluate_nan_expression() {
        let e = Expression::<f64>::nan();
        let env = Environment::new();
        assert_eq!(
            e.evaluate(&env),
            Err(Error::NanExpression {
                operation: "evaluate"
            })
        );
    }

    #[test]
    fn substitute_variable_with_expression() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let e = &x * &x + 2.0 * &x;
        let got = e.substitute(&var_x, &(&y + 1.0)).unwrap();
        let expected = (&y + 1.0) * (&y + 1.0) + 2.0 * (&y + 1.0);
        assert_eq!(got, expected);
    }

    #[test]
    fn substitute_is_simultaneous() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let mut s = Substitution::new();
        s.insert(var_x.clone(), y.clone());
        s.insert(var_y.clone(), x.clone());
        let got = (&x + 2.0 * &y).substitute_all(&s).unwrap();
        assert_eq!(got, &y + 2.0 * &x);
    }

    #[test]
    fn substitute_into_nan_fails() {
        let (var_x, _, _) = xyz();
        let e = Expression::<f64>::nan();
        assert_eq!(
            e.substitute(&var_x, &Expression::one()),
            Err(Error::NanExpression {
                operation: "substitute"
            })
        );
    }

    #[test]
    fn substitute_simplifies_the_result() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        // x - x collapses to 0 once y is put in place of x
        let e = &x - &y;
        let got = e.substitute(&var_y, &x).unwrap();
        assert_eq!(got, Expression::zero());
    }

    #[test]
    fn evaluate_partial_leaves_unbound_symbolic() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let e = &x * &y + &y;
        let env = Environment::from_pairs([(var_x, 3.0)]).unwrap();
        let got = e.evaluate_partial(&env).unwrap();
        assert_eq!(got, 4.0 * &y);
    }

    #[test]
    fn clone_shares_the_tree() {
        let (var_x, _, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let e = &x + 1.0;
        let f = e.clone();
        assert!(e.ptr_eq(&f));
        assert_eq!(e, f);
    }

    #[test]
    fn polynomial_classification() {
        let (var_x, var_y, _) = xyz();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        assert!((&x * &x * &y + 2.0 * &x).is_polynomial());
        assert!((x.pow(&Expression::from(3.0))).is_polynomial());
        assert!(((&x + &y) / 2.0).is_polynomial());
        assert!(!x.pow(&y).is_polynomial());
        assert!(!x.pow(&Expression::from(-1.0)).is_polynomial());
        assert!(!(&x / &y).is_polynomial());
        assert!(!Expression::<f64>::nan().is_polynomial());
    }
}
