//! Operator overloads and the simplification rules they apply.
//!
//! Every operator canonicalizes as it builds: identities are folded away,
//! constant operands are combined, sums and products are flattened through
//! the factories, and a NaN operand poisons the result. The compound
//! assignment forms additionally fold a constant right-hand side into the
//! left-hand constant in place when the left expression is the sole owner of
//! its node, which makes accumulation loops like `sum += c` allocation-free.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::error::Error;
use crate::scalar::Scalar;
use crate::variable::Variable;

use super::node::ExpressionNode;
use super::{eval_pow, AddFactory, Expression, MulFactory};

fn add_impl<T: Scalar>(lhs: &Expression<T>, rhs: &Expression<T>) -> Expression<T> {
    if lhs.is_nan() || rhs.is_nan() {
        return Expression::nan();
    }
    if lhs.value().is_some_and(Scalar::is_zero) {
        return rhs.clone();
    }
    if rhs.value().is_some_and(Scalar::is_zero) {
        return lhs.clone();
    }
    if let (Some(a), Some(b)) = (lhs.value(), rhs.value()) {
        return Expression::new(a.clone() + b.clone());
    }
    let mut builder = AddFactory::new();
    builder.add(lhs);
    builder.add(rhs);
    builder.build()
}

fn sub_impl<T: Scalar>(lhs: &Expression<T>, rhs: &Expression<T>) -> Expression<T> {
    if lhs.is_nan() || rhs.is_nan() {
        return Expression::nan();
    }
    if rhs.value().is_some_and(Scalar::is_zero) {
        return lhs.clone();
    }
    if lhs == rhs {
        return Expression::zero();
    }
    add_impl(lhs, &neg_impl(rhs))
}

fn neg_impl<T: Scalar>(e: &Expression<T>) -> Expression<T> {
    match e.node() {
        ExpressionNode::NaN => Expression::nan(),
        ExpressionNode::Constant(v) => Expression::new(-v.clone()),
        ExpressionNode::Add { constant, terms } => {
            let mut builder = AddFactory::from_parts(constant.clone(), terms.clone());
            builder.negate();
            builder.build()
        }
        ExpressionNode::Mul { constant, factors } => {
            let mut builder = MulFactory::from_parts(constant.clone(), factors.clone());
            builder.negate();
            builder.build()
        }
        _ => {
            let mut builder = MulFactory::new();
            builder.mul_constant(-T::one());
            builder.mul(e);
            builder.build()
        }
    }
}

fn mul_impl<T: Scalar>(lhs: &Expression<T>, rhs: &Expression<T>) -> Expression<T> {
    if lhs.is_nan() || rhs.is_nan() {
        return Expression::nan();
    }
    if lhs.value().is_some_and(Scalar::is_zero) || rhs.value().is_some_and(Scalar::is_zero) {
        return Expression::zero();
    }
    if lhs.value().is_some_and(Scalar::is_one) {
        return rhs.clone();
    }
    if rhs.value().is_some_and(Scalar::is_one) {
        return lhs.clone();
    }
    if let (Some(a), Some(b)) = (lhs.value(), rhs.value()) {
        return Expression::new(a.clone() * b.clone());
    }
    // quotients multiply into a single quotient
    match (lhs.node(), rhs.node()) {
        (
            ExpressionNode::Div {
                numerator: n1,
                denominator: d1,
            },
            ExpressionNode::Div {
                numerator: n2,
                denominator: d2,
            },
        ) => return div_impl(&mul_impl(n1, n2), &mul_impl(d1, d2)),
        (
            ExpressionNode::Div {
                numerator,
                denominator,
            },
            _,
        ) => return div_impl(&mul_impl(numerator, rhs), denominator),
        (
            _,
            ExpressionNode::Div {
                numerator,
                denominator,
            },
        ) => return div_impl(&mul_impl(lhs, numerator), denominator),
        _ => {}
    }
    let mut builder = MulFactory::new();
    builder.mul(lhs);
    builder.mul(rhs);
    builder.build()
}

fn div_impl<T: Scalar>(lhs: &Expression<T>, rhs: &Expression<T>) -> Expression<T> {
    if lhs.is_nan() || rhs.is_nan() {
        return Expression::nan();
    }
    if let Some(d) = rhs.value() {
        // division by a literal zero is malformed at construction time;
        // x/0 with x bound later surfaces as an evaluation error instead
        if d.is_zero() {
            return Expression::nan();
        }
        if d.is_one() {
            return lhs.clone();
        }
        if let Some(n) = lhs.value() {
            return Expression::new(n.clone() / d.clone());
        }
        if T::FRACTIONAL {
            return mul_impl(lhs, &Expression::new(T::one() / d.clone()));
        }
        // exact division is not available for integral scalars, so the
        // quotient stays a quotient
        return Expression::new_div(lhs.clone(), rhs.clone());
    }
    if lhs.value().is_some_and(Scalar::is_zero) {
        return Expression::zero();
    }
    if lhs == rhs {
        return Expression::one();
    }
    Expression::new_div(lhs.clone(), rhs.clone())
}

fn pow_impl<T: Scalar>(base: &Expression<T>, exponent: &Expression<T>) -> Expression<T> {
    if base.is_nan() || exponent.is_nan() {
        return Expression::nan();
    }
    if exponent.value().is_some_and(Scalar::is_zero) {
        return Expression::one();
    }
    if exponent.value().is_some_and(Scalar::is_one) {
        return base.clone();
    }
    if base.value().is_some_and(Scalar::is_one) {
        return Expression::one();
    }
    if let (Some(b), Some(e)) = (base.value(), exponent.value()) {
        // only a domain-invalid power folds to NaN; an unrepresentable
        // result keeps the Pow cell and errors at evaluation instead
        return match eval_pow(b.clone(), e) {
            Ok(v) => Expression::new(v),
            Err(Error::PowDomain { .. }) => Expression::nan(),
            Err(_) => Expression::new_pow(base.clone(), exponent.clone()),
        };
    }
    // (b^m)^n with integer constant exponents collapses to b^(m*n)
    if let ExpressionNode::Pow {
        base: inner_base,
        exponent: inner_exponent,
    } = base.node()
    {
        let both_integer = inner_exponent.value().is_some_and(|v| v.is_integer())
            && exponent.value().is_some_and(|v| v.is_integer());
        if both_integer {
            return pow_impl(inner_base, &mul_impl(inner_exponent, exponent));
        }
    }
    Expression::new_pow(base.clone(), exponent.clone())
}

impl<T: Scalar> Expression<T> {
    /// Raises this expression to `exponent`, folding constant cases and
    /// integer powers of powers.
    ///
    /// A constant power whose result is undefined over the reals, such as a
    /// negative base with a fractional exponent, yields the NaN expression.
    /// A constant power whose result merely cannot be represented in the
    /// scalar type, such as `2^70` over `i64`, stays a symbolic power and
    /// reports [`Error::PowUnrepresentable`] when evaluated.
    pub fn pow(&self, exponent: &Expression<T>) -> Expression<T> {
        pow_impl(self, exponent)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $impl_fn:ident) => {
        impl<T: Scalar> $trait for Expression<T> {
            type Output = Expression<T>;
            fn $method(self, rhs: Expression<T>) -> Expression<T> {
                $impl_fn(&self, &rhs)
            }
        }

        impl<T: Scalar> $trait<&Expression<T>> for Expression<T> {
            type Output = Expression<T>;
            fn $method(self, rhs: &Expression<T>) -> Expression<T> {
                $impl_fn(&self, rhs)
            }
        }

        impl<T: Scalar> $trait<Expression<T>> for &Expression<T> {
            type Output = Expression<T>;
            fn $method(self, rhs: Expression<T>) -> Expression<T> {
                $impl_fn(self, &rhs)
            }
        }

        impl<T: Scalar> $trait<&Expression<T>> for &Expression<T> {
            type Output = Expression<T>;
            fn $method(self, rhs: &Expression<T>) -> Expression<T> {
                $impl_fn(self, rhs)
            }
        }

        impl<T: Scalar> $trait<&Variable> for Expression<T> {
            type Output = Expression<T>;
            fn $method(self, rhs: &Variable) -> Expression<T> {
                $impl_fn(&self, &Expression::from(rhs))
            }
        }

        impl<T: Scalar> $trait<&Variable> for &Expression<T> {
            type Output = Expression<T>;
            fn $method(self, rhs: &Variable) -> Expression<T> {
                $impl_fn(self, &Expression::from(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, add_impl);
impl_binary_op!(Sub, sub, sub_impl);
impl_binary_op!(Mul, mul, mul_impl);
impl_binary_op!(Div, div, div_impl);

impl<T: Scalar> Neg for Expression<T> {
    type Output = Expression<T>;
    fn neg(self) -> Expression<T> {
        neg_impl(&self)
    }
}

impl<T: Scalar> Neg for &Expression<T> {
    type Output = Expression<T>;
    fn neg(self) -> Expression<T> {
        neg_impl(self)
    }
}

// Mixed expression/scalar operands are implemented per concrete scalar
// type: blanket `Op<T> for Expression<T>` impls would collide with the
// `Op<&Variable>` impls above under the coherence rules.
macro_rules! impl_scalar_operand_ops {
    ($($t:ty),*) => {$(
        impl_scalar_operand_ops!(@one $t, Add, add, add_impl);
        impl_scalar_operand_ops!(@one $t, Sub, sub, sub_impl);
        impl_scalar_operand_ops!(@one $t, Mul, mul, mul_impl);
        impl_scalar_operand_ops!(@one $t, Div, div, div_impl);
    )*};
    (@one $t:ty, $trait:ident, $method:ident, $impl_fn:ident) => {
        impl $trait<$t> for Expression<$t> {
            type Output = Expression<$t>;
            fn $method(self, rhs: $t) -> Expression<$t> {
                $impl_fn(&self, &Expression::new(rhs))
            }
        }

        impl $trait<$t> for &Expression<$t> {
            type Output = Expression<$t>;
            fn $method(self, rhs: $t) -> Expression<$t> {
                $impl_fn(self, &Expression::new(rhs))
            }
        }

        impl $trait<Expression<$t>> for $t {
            type Output = Expression<$t>;
            fn $method(self, rhs: Expression<$t>) -> Expression<$t> {
                $impl_fn(&Expression::new(self), &rhs)
            }
        }

        impl $trait<&Expression<$t>> for $t {
            type Output = Expression<$t>;
            fn $method(self, rhs: &Expression<$t>) -> Expression<$t> {
                $impl_fn(&Expression::new(self), rhs)
            }
        }
    };
}

impl_scalar_operand_ops!(i32, i64, f32, f64);

#[cfg(feature = "rational")]
impl_scalar_operand_ops!(rug::Rational);

impl<T: Scalar> AddAssign<&Expression<T>> for Expression<T> {
    fn add_assign(&mut self, rhs: &Expression<T>) {
        if let Some(v) = rhs.value() {
            if v.is_zero() {
                return;
            }
            // sole-owner constant accumulation happens in place
            if let Some(folded) = fold_constant_in_place(self, v, |a, b| a + b) {
                if folded {
                    return;
                }
            }
        }
        let result = add_impl(self, rhs);
        *self = result;
    }
}

impl<T: Scalar> AddAssign<Expression<T>> for Expression<T> {
    fn add_assign(&mut self, rhs: Expression<T>) {
        *self += &rhs;
    }
}

impl<T: Scalar> AddAssign<T> for Expression<T> {
    fn add_assign(&mut self, rhs: T) {
        *self += &Expression::new(rhs);
    }
}

impl<T: Scalar> SubAssign<&Expression<T>> for Expression<T> {
    fn sub_assign(&mut self, rhs: &Expression<T>) {
        if let Some(v) = rhs.value() {
            if v.is_zero() {
                return;
            }
            if let Some(folded) = fold_constant_in_place(self, v, |a, b| a - b) {
                if folded {
                    return;
                }
            }
        }
        let result = sub_impl(self, rhs);
        *self = result;
    }
}

impl<T: Scalar> SubAssign<Expression<T>> for Expression<T> {
    fn sub_assign(&mut self, rhs: Expression<T>) {
        *self -= &rhs;
    }
}

impl<T: Scalar> SubAssign<T> for Expression<T> {
    fn sub_assign(&mut self, rhs: T) {
        *self -= &Expression::new(rhs);
    }
}

impl<T: Scalar> MulAssign<&Expression<T>> for Expression<T> {
    fn mul_assign(&mut self, rhs: &Expression<T>) {
        if let Some(v) = rhs.value() {
            if v.is_one() {
                return;
            }
            if let Some(folded) = fold_constant_in_place(self, v, |a, b| a * b) {
                if folded {
                    return;
                }
            }
        }
        let result = mul_impl(self, rhs);
        *self = result;
    }
}

impl<T: Scalar> MulAssign<Expression<T>> for Expression<T> {
    fn mul_assign(&mut self, rhs: Expression<T>) {
        *self *= &rhs;
    }
}

impl<T: Scalar> MulAssign<T> for Expression<T> {
    fn mul_assign(&mut self, rhs: T) {
        *self *= &Expression::new(rhs);
    }
}

impl<T: Scalar> DivAssign<&Expression<T>> for Expression<T> {
    fn div_assign(&mut self, rhs: &Expression<T>) {
        if let Some(v) = rhs.value() {
            if v.is_one() {
                return;
            }
            if !v.is_zero() {
                if let Some(folded) = fold_constant_in_place(self, v, |a, b| a / b) {
                    if folded {
                        return;
                    }
                }
            }
        }
        let result = div_impl(self, rhs);
        *self = result;
    }
}

impl<T: Scalar> DivAssign<Expression<T>> for Expression<T> {
    fn div_assign(&mut self, rhs: Expression<T>) {
        *self /= &rhs;
    }
}

impl<T: Scalar> DivAssign<T> for Expression<T> {
    fn div_assign(&mut self, rhs: T) {
        *self /= &Expression::new(rhs);
    }
}

/// Folds `combine(lhs_constant, rhs)` into `lhs` without allocating, when
/// `lhs` is a constant solely owned by this handle and the folded value is
/// not NaN. Returns `Some(true)` on success, `Some(false)` or `None` when
/// the slow path must run.
fn fold_constant_in_place<T: Scalar>(
    lhs: &mut Expression<T>,
    rhs: &T,
    combine: impl FnOnce(T, T) -> T,
) -> Option<bool> {
    let cell = lhs.cell_mut()?;
    let value = cell.constant_value_mut()?;
    let folded = combine(value.clone(), rhs.clone());
    if folded.is_nan() {
        return Some(false);
    }
    *value = folded;
    Some(true)
}
