//! Partial differentiation over the node kinds that admit a closed rule in
//! the canonical form: constants, variables, sums and quotients. Products
//! and powers are declined rather than silently mishandled, because their
//! bases and exponents can both carry the differentiation variable.

use crate::error::Error;
use crate::scalar::Scalar;
use crate::variable::Variable;

use super::node::ExpressionNode;
use super::{AddFactory, Expression};

impl<T: Scalar> Expression<T> {
    /// The partial derivative with respect to `x`.
    ///
    /// Supported node kinds are constants, variables, sums (termwise, with
    /// coefficients carried through) and quotients (quotient rule). A
    /// product or power node fails with
    /// [`Error::DifferentiateUnimplemented`]; the NaN expression fails with
    /// [`Error::NanExpression`].
    pub fn differentiate(&self, x: &Variable) -> Result<Expression<T>, Error> {
        match self.node() {
            ExpressionNode::Constant(_) => Ok(Expression::zero()),
            ExpressionNode::Var(var) => Ok(if var == x {
                Expression::one()
            } else {
                Expression::zero()
            }),
            ExpressionNode::Add { terms, .. } => {
                let mut builder = AddFactory::new();
                for (term, coeff) in terms {
                    builder.add(&(Expression::new(coeff.clone()) * term.differentiate(x)?));
                }
                Ok(builder.build())
            }
            ExpressionNode::Div {
                numerator,
                denominator,
            } => {
                let dn = numerator.differentiate(x)?;
                let dd = denominator.differentiate(x)?;
                Ok((dn * denominator - numerator.clone() * dd)
                    / (denominator.clone() * denominator))
            }
            ExpressionNode::Mul { .. } | ExpressionNode::Pow { .. } => {
                Err(Error::DifferentiateUnimplemented { kind: self.kind() })
            }
            ExpressionNode::NaN => Err(Error::NanExpression {
                operation: "differentiate",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionKind;
    use pretty_assertions::assert_eq;

    fn xy() -> (Variable, Variable) {
        (Variable::new("x"), Variable::new("y"))
    }

    #[test]
    fn constants_and_variables() {
        let (var_x, var_y) = xy();
        let x = Expression::<f64>::from(&var_x);
        assert_eq!(
            Expression::<f64>::from(5.0).differentiate(&var_x).unwrap(),
            Expression::zero()
        );
        assert_eq!(x.differentiate(&var_x).unwrap(), Expression::one());
        assert_eq!(x.differentiate(&var_y).unwrap(), Expression::zero());
    }

    #[test]
    fn sums_differentiate_termwise() {
        let (var_x, var_y) = xy();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let e = 3.0 * &x - 2.0 * &y + 7.0;
        assert_eq!(e.differentiate(&var_x).unwrap(), Expression::from(3.0));
        assert_eq!(e.differentiate(&var_y).unwrap(), Expression::from(-2.0));
    }

    #[test]
    fn quotient_rule() {
        let (var_x, var_y) = xy();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        let e = &x / &y;
        assert_eq!(e.differentiate(&var_x).unwrap(), &y / (&y * &y));
        assert_eq!(
            e.differentiate(&var_y).unwrap(),
            (-&x) / (&y * &y)
        );
    }

    #[test]
    fn products_and_powers_are_declined() {
        let (var_x, var_y) = xy();
        let x = Expression::<f64>::from(&var_x);
        let y = Expression::<f64>::from(&var_y);
        assert_eq!(
            (&x * &y).differentiate(&var_x),
            Err(Error::DifferentiateUnimplemented {
                kind: ExpressionKind::Mul
            })
        );
        assert_eq!(
            x.pow(&y).differentiate(&var_x),
            Err(Error::DifferentiateUnimplemented {
                kind: ExpressionKind::Pow
            })
        );
    }

    #[test]
    fn nan_is_declined() {
        let (var_x, _) = xy();
        assert_eq!(
            Expression::<f64>::nan().differentiate(&var_x),
            Err(Error::NanExpression {
                operation: "differentiate"
            })
        );
    }
}
