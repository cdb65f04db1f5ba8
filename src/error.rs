//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

use crate::expression::ExpressionKind;

/// Everything that can go wrong while building, evaluating, substituting,
/// differentiating or expanding an expression.
///
/// All of these abort the requested operation; none are recoverable at the
/// point of detection. Note that the *eager* constant-folding division path
/// never produces [`Error::DivisionByZero`]: a literal `c / 0` folds to the
/// NaN expression at construction time, and the error is only raised when a
/// division *cell* is evaluated with a zero denominator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A dummy (default-constructed) variable was used where a real variable
    /// is required, e.g. as an [`Environment`](crate::Environment) key.
    #[error("cannot bind the dummy variable")]
    DummyVariable,

    /// An environment binding maps a variable to NaN.
    #[error("cannot bind variable `{0}` to NaN")]
    NanValue(String),

    /// Evaluation reached a variable that the environment does not bind.
    #[error("variable `{0}` is not bound in the environment")]
    UnboundVariable(String),

    /// A NaN expression was reached on a live evaluation, substitution,
    /// differentiation or expansion path.
    #[error("cannot {operation} NaN expression")]
    NanExpression {
        /// The operation that reached the NaN node.
        operation: &'static str,
    },

    /// The denominator of a division evaluated to exactly zero while the
    /// numerator did not.
    #[error("division by zero evaluating `{0}`")]
    DivisionByZero(String),

    /// Both the numerator and the denominator of a division evaluated to
    /// exactly zero.
    #[error("indeterminate form 0/0 evaluating `{0}`")]
    Indeterminate(String),

    /// A finite negative base raised to a finite non-integer exponent; the
    /// result would not be real.
    #[error("negative base `{base}` raised to non-integer exponent `{exponent}`")]
    PowDomain {
        /// The evaluated base.
        base: String,
        /// The evaluated exponent.
        exponent: String,
    },

    /// The numeric result of a power is not representable in the scalar type,
    /// e.g. `2^(1/2)` over exact rationals or `2^(-1)` over integers.
    #[error("`{base}^{exponent}` is not representable in the scalar type")]
    PowUnrepresentable {
        /// The evaluated base.
        base: String,
        /// The evaluated exponent.
        exponent: String,
    },

    /// Differentiation is only implemented for constants, variables, sums and
    /// quotients; multiplication and power nodes report this error.
    #[error("differentiation of {kind} expressions is not implemented")]
    DifferentiateUnimplemented {
        /// The kind of node that cannot be differentiated.
        kind: ExpressionKind,
    },
}
