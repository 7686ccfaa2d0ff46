//! Configuration errors raised when an effect is constructed.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EffectError {
    #[error("particle pool capacity must be non-zero")]
    EmptyPool,
    #[error("{name} must be positive and finite (got {value})")]
    NonPositive { name: &'static str, value: f32 },
    #[error("height band {min}..{max} is empty")]
    EmptyBand { min: f32, max: f32 },
    #[error("fade steps must satisfy 0 < fall ({fall}) < rise ({rise})")]
    FadeSteps { rise: f32, fall: f32 },
    #[error("shader hook `{0}` is not declared by this stage")]
    UnknownHook(String),
    #[error("shader hook `{0}` is declared but never filled")]
    UnfilledHook(String),
    #[error("shader hook `{0}` filled more than once")]
    DuplicateHook(String),
}

pub type Result<T> = std::result::Result<T, EffectError>;

/// Reject zero, negative, NaN and infinite values.
pub(crate) fn positive(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EffectError::NonPositive { name, value })
    }
}
