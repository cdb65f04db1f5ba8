//! Human-readable rendering of expression trees.

use std::fmt;

use crate::scalar::Scalar;

use super::node::ExpressionNode;
use super::Expression;

impl<T: Scalar> fmt::Display for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            ExpressionNode::Constant(v) => write!(f, "{v}"),
            ExpressionNode::Var(var) => write!(f, "{var}"),
            ExpressionNode::NaN => write!(f, "NaN"),
            ExpressionNode::Add { constant, terms } => {
                write!(f, "(")?;
                let mut first = true;
                if !constant.is_zero() {
                    write!(f, "{constant}")?;
                    first = false;
                }
                for (term, coeff) in terms {
                    let negative = *coeff < T::zero();
                    let magnitude = if negative { -coeff.clone() } else { coeff.clone() };
                    match (first, negative) {
                        (true, true) => write!(f, "- ")?,
                        (true, false) => {}
                        (false, true) => write!(f, " - ")?,
                        (false, false) => write!(f, " + ")?,
                    }
                    first = false;
                    if magnitude.is_one() {
                        write!(f, "{term}")?;
                    } else {
                        write!(f, "{magnitude} * {term}")?;
                    }
                }
                write!(f, ")")
            }
            ExpressionNode::Mul { constant, factors } => {
                write!(f, "(")?;
                let mut first = true;
                if !constant.is_one() {
                    write!(f, "{constant}")?;
                    first = false;
                }
                for (base, exponent) in factors {
                    if !first {
                        write!(f, " * ")?;
                    }
                    first = false;
                    if exponent.value().is_some_and(Scalar::is_one) {
                        write!(f, "{base}")?;
                    } else {
                        write!(f, "{base}^{exponent}")?;
                    }
                }
                write!(f, ")")
            }
            ExpressionNode::Pow { base, exponent } => write!(f, "({base} ^ {exponent})"),
            ExpressionNode::Div {
                numerator,
                denominator,
            } => write!(f, "({numerator} / {denominator})"),
        }
    }
}
