#![doc = include_str!("../README.md")]

pub mod environment;
pub mod error;
pub mod expression;
pub mod scalar;
pub mod variable;
pub mod variables;

pub use environment::Environment;
pub use error::Error;
pub use expression::{
    AddFactory, Expression, ExpressionKind, MulFactory, Substitution,
};
pub use scalar::Scalar;
pub use variable::{Variable, VariableType};
pub use variables::Variables;
