//! Polynomial expansion.
//!
//! Expansion distributes products over sums and multiplies out integer
//! powers of sums, producing the fully distributed canonical form. A node
//! that is already in that form short-circuits: its expanded flag was
//! computed at construction, so `expand` returns the same handle without
//! walking the tree, and a freshly expanded result is marked so that
//! expanding it again is free.

use crate::error::Error;
use crate::scalar::Scalar;

use super::node::ExpressionNode;
use super::{AddFactory, Expression};

impl<T: Scalar> Expression<T> {
    /// Expands products over sums and integer powers of sums.
    ///
    /// Returns the same handle when the expression is already expanded.
    /// Fails on the NaN expression and on an expression whose expansion
    /// forces an undefined constant power.
    pub fn expand(&self) -> Result<Expression<T>, Error> {
        if self.is_expanded() {
            return Ok(self.clone());
        }
        let result = match self.node() {
            ExpressionNode::NaN => {
                return Err(Error::NanExpression {
                    operation: "expand",
                })
            }
            ExpressionNode::Constant(_) | ExpressionNode::Var(_) => self.clone(),
            ExpressionNode::Add { constant, terms } => {
                let mut builder = AddFactory::new();
                builder.add_constant(constant.clone());
                for (term, coeff) in terms {
                    builder.add(&expand_multiplication(
                        &Expression::new(coeff.clone()),
                        &term.expand()?,
                    ));
                }
                builder.build()
            }
            ExpressionNode::Mul { constant, factors } => {
                let mut acc = Expression::new(constant.clone());
                for (base, exponent) in factors {
                    let factor = expand_pow(&base.expand()?, &exponent.expand()?);
                    acc = expand_multiplication(&acc, &factor);
                }
                acc
            }
            ExpressionNode::Pow { base, exponent } => {
                expand_pow(&base.expand()?, &exponent.expand()?)
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => numerator.expand()? / denominator.expand()?,
        };
        if result.is_nan() {
            return Err(Error::NanExpression {
                operation: "expand",
            });
        }
        result.mark_expanded();
        Ok(result)
    }
}

/// `e1 * e2` with the product distributed over any sum operand. Both
/// operands are assumed to be individually expanded.
fn expand_multiplication<T: Scalar>(e1: &Expression<T>, e2: &Expression<T>) -> Expression<T> {
    if let ExpressionNode::Add { constant, terms } = e1.node() {
        let mut builder = AddFactory::new();
        builder.add(&expand_multiplication(
            &Expression::new(constant.clone()),
            e2,
        ));
        for (term, coeff) in terms {
            builder.add(&expand_multiplication(
                &(Expression::new(coeff.clone()) * term),
                e2,
            ));
        }
        return builder.build();
    }
    if let ExpressionNode::Add { constant, terms } = e2.node() {
        let mut builder = AddFactory::new();
        builder.add(&expand_multiplication(
            e1,
            &Expression::new(constant.clone()),
        ));
        for (term, coeff) in terms {
            builder.add(&expand_multiplication(
                e1,
                &(Expression::new(coeff.clone()) * term),
            ));
        }
        return builder.build();
    }
    e1 * e2
}

/// `base ^ exponent` with the power pushed through products and, for
/// nonnegative integer constant exponents, multiplied out over sums.
fn expand_pow<T: Scalar>(base: &Expression<T>, exponent: &Expression<T>) -> Expression<T> {
    if let ExpressionNode::Mul { constant, factors } = base.node() {
        let mut acc = Expression::new(constant.clone()).pow(exponent);
        for (b, e) in factors {
            let factor = expand_pow(b, &(e.clone() * exponent));
            acc = expand_multiplication(&acc, &factor);
        }
        return acc;
    }
    if base.is_addition() {
        let int_exponent = exponent.value().and_then(|v| {
            if v.is_integer() && !(*v < T::zero()) {
                v.to_i64()
            } else {
                None
            }
        });
        if let Some(n) = int_exponent {
            return expand_pow_int(base, n);
        }
    }
    base.pow(exponent)
}

/// Exponentiation by squaring over the expanded multiplication, so that
/// `(x+y)^8` distributes three squarings instead of seven products.
fn expand_pow_int<T: Scalar>(base: &Expression<T>, n: i64) -> Expression<T> {
    match n {
        0 => Expression::one(),
        1 => base.clone(),
        _ => {
            let half = expand_pow_int(base, n / 2);
            let squared = expand_multiplication(&half, &half);
            if n % 2 == 0 {
                squared
            } else {
                expand_multiplication(&squared, base)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::variable::Variable;
    use assert_float_eq::assert_f64_near;
    use pretty_assertions::assert_eq;

    struct Vars {
        var_x: Variable,
        var_y: Variable,
        var_z: Variable,
        x: Expression<f64>,
        y: Expression<f64>,
        z: Expression<f64>,
    }

    fn vars() -> Vars {
        let var_x = Variable::new("x");
        let var_y = Variable::new("y");
        let var_z = Variable::new("z");
        let x = Expression::from(&var_x);
        let y = Expression::from(&var_y);
        let z = Expression::from(&var_z);
        Vars {
            var_x,
            var_y,
            var_z,
            x,
            y,
            z,
        }
    }

    fn pow(e: &Expression<f64>, n: f64) -> Expression<f64> {
        e.pow(&Expression::from(n))
    }

    /// Checks that expansion preserves the value of `e` over a grid of
    /// sign-varied bindings for x, y, z.
    fn assert_expand_preserves_evaluation(v: &Vars, e: &Expression<f64>) {
        let expanded = e.expand().unwrap();
        for x_val in [-2.0, 3.0] {
            for y_val in [-5.0, 4.0] {
                for z_val in [-1.0, 2.0] {
                    let env = Environment::from_pairs([
                        (v.var_x.clone(), x_val),
                        (v.var_y.clone(), y_val),
                        (v.var_z.clone(), z_val),
                    ])
                    .unwrap();
                    assert_f64_near!(
                        e.evaluate(&env).unwrap(),
                        expanded.evaluate(&env).unwrap(),
                        16
                    );
                }
            }
        }
    }

    #[test]
    fn difference_of_squares() {
        let v = vars();
        let e = (&v.x + 1.0) * (&v.x - 1.0);
        assert!(!e.is_expanded());
        assert_eq!(e.expand().unwrap(), pow(&v.x, 2.0) - 1.0);
    }

    #[test]
    fn square_of_a_sum() {
        let v = vars();
        let e = pow(&(&v.x + &v.y), 2.0);
        assert_eq!(
            e.expand().unwrap(),
            pow(&v.x, 2.0) + 2.0 * &v.x * &v.y + pow(&v.y, 2.0)
        );
    }

    #[test]
    fn scaled_sums_distribute() {
        let v = vars();
        let e = 5.0 * (3.0 + 2.0 * &v.y) + 30.0 * (7.0 + &v.x);
        assert_eq!(e.expand().unwrap(), 225.0 + 30.0 * &v.x + 10.0 * &v.y);
    }

    #[test]
    fn power_pushes_through_products() {
        let v = vars();
        let e = pow(&(2.0 * &v.x * pow(&v.y, 2.0)), 2.0);
        assert_eq!(
            e.expand().unwrap(),
            4.0 * pow(&v.x, 2.0) * pow(&v.y, 4.0)
        );
    }

    #[test]
    fn cube_and_fourth_power_of_a_trinomial() {
        let v = vars();
        let s = &v.x + &v.y + 1.0;
        let cubed = pow(&s, 3.0).expand().unwrap();
        let expected_cubed = pow(&v.x, 3.0)
            + pow(&v.y, 3.0)
            + 3.0 * pow(&v.x, 2.0) * &v.y
            + 3.0 * &v.x * pow(&v.y, 2.0)
            + 3.0 * pow(&v.x, 2.0)
            + 3.0 * pow(&v.y, 2.0)
            + 6.0 * &v.x * &v.y
            + 3.0 * &v.x
            + 3.0 * &v.y
            + 1.0;
        assert_eq!(cubed, expected_cubed);
        let fourth = pow(&s, 4.0).expand().unwrap();
        assert_eq!(fourth, (cubed * &s).expand().unwrap());
    }

    #[test]
    fn product_of_three_sums() {
        let v = vars();
        let e = (7.0 + &v.x) * (5.0 + &v.y) * (6.0 + &v.z);
        let expected = 210.0
            + 30.0 * &v.x
            + 42.0 * &v.y
            + 35.0 * &v.z
            + 6.0 * &v.x * &v.y
            + 5.0 * &v.x * &v.z
            + 7.0 * &v.y * &v.z
            + &v.x * &v.y * &v.z;
        assert_eq!(e.expand().unwrap(), expected);
    }

    #[test]
    fn product_of_two_binomials() {
        let v = vars();
        let e = (&v.x + 3.0 * &v.y) * (2.0 * &v.x + 5.0 * &v.y);
        assert_eq!(
            e.expand().unwrap(),
            2.0 * pow(&v.x, 2.0) + 11.0 * &v.x * &v.y + 15.0 * pow(&v.y, 2.0)
        );
    }

    #[test]
    fn division_by_a_constant_distributes() {
        let v = vars();
        let e = (2.0 * &v.x + 4.0 * &v.x * &v.y + 6.0) / 2.0;
        assert_eq!(
            e.expand().unwrap(),
            &v.x + 2.0 * &v.x * &v.y + 3.0
        );
    }

    #[test]
    fn constant_divisors_fold_through_quotients() {
        let v = vars();
        let e = 6.0 * &v.x * &v.y / &v.z / 3.0;
        assert_eq!(e, 2.0 * &v.x * &v.y / &v.z);
        assert!(e.expand().unwrap().is_division());
        let f = 36.0 * &v.x * &v.y / &v.x / -3.0;
        assert_eq!(f, -12.0 * &v.x * &v.y / &v.x);
    }

    #[test]
    fn expanded_expression_returns_the_same_handle() {
        let v = vars();
        let e = (3.0 + 2.0 * pow(&v.x, 2.0) + &v.x * &v.y).expand().unwrap();
        assert!(e.is_expanded());
        let again = e.expand().unwrap();
        assert!(again.ptr_eq(&e));
    }

    #[test]
    fn leaves_are_born_expanded() {
        let v = vars();
        assert!(v.x.is_expanded());
        assert!(Expression::<f64>::from(5.0).is_expanded());
        assert!(v.x.expand().unwrap().ptr_eq(&v.x));
    }

    #[test]
    fn symbolic_powers_stay_symbolic() {
        let v = vars();
        let e = pow(&(&v.x + &v.y), 2.0) * (&v.x).pow(&v.z);
        let expanded = e.expand().unwrap();
        assert!(expanded.is_expanded());
        assert_expand_preserves_evaluation(&v, &e);
    }

    #[test]
    fn construction_marks_simple_forms_expanded() {
        let v = vars();
        let no_ops = [
            3.0 * &v.x,
            &v.x + &v.y,
            3.0 * &v.x * &v.y,
            3.0 * pow(&v.x, 2.0) * &v.y,
            3.0 * pow(&v.x, 2.0) / 10.0 * &v.y,
            v.x.pow(&v.y),
            pow(&v.x, -1.0),
            3.0 * Expression::from(3.0).pow(&v.y),
        ];
        for e in &no_ops {
            assert!(e.is_expanded(), "{e} should be expanded at construction");
            assert!(e.expand().unwrap().ptr_eq(e), "{e} should expand to itself");
        }
    }

    #[test]
    fn sum_bases_with_non_expandable_exponents_are_rebuilt() {
        let v = vars();
        let s = &v.x + &v.y;
        let cases = [
            pow(&s, -1.0),
            pow(&s, 0.5),
            pow(&s, 2.5),
            s.pow(&(&v.x - &v.y)),
        ];
        for e in &cases {
            assert!(!e.is_expanded(), "{e} should start unexpanded");
            let expanded = e.expand().unwrap();
            assert_eq!(&expanded, e);
            assert!(expanded.is_expanded());
        }
    }

    #[test]
    fn expansion_preserves_evaluation() {
        let v = vars();
        let cases = [
            (&v.x + 1.0) * (&v.x - 1.0),
            pow(&(&v.x + &v.y), 2.0),
            pow(&(&v.x + &v.y + 1.0), 3.0),
            (7.0 + &v.x) * (5.0 + &v.y) * (6.0 + &v.z),
            (&v.x + 3.0 * &v.y) * (2.0 * &v.x + 5.0 * &v.y),
            (2.0 * &v.x + 4.0 * &v.x * &v.y + 6.0) / 2.0,
            pow(&(2.0 * &v.x * pow(&v.y, 2.0)), 2.0),
            5.0 * (3.0 + 2.0 * &v.y) + 30.0 * (7.0 + &v.x),
        ];
        for e in &cases {
            assert_expand_preserves_evaluation(&v, e);
        }
    }

    #[test]
    fn expanding_nan_fails() {
        let e = Expression::<f64>::nan();
        assert_eq!(
            e.expand(),
            Err(Error::NanExpression {
                operation: "expand"
            })
        );
    }

    #[test]
    fn repeated_expansion_is_idempotent() {
        let v = vars();
        let e = pow(&(&v.x + &v.y), 3.0);
        let once = e.expand().unwrap();
        let twice = once.expand().unwrap();
        assert!(twice.ptr_eq(&once));
        assert_eq!(once, e.expand().unwrap());
    }
}
