//! Error variants for the delta encoder/decoder so callers can surface
//! friendly failures.

use thiserror::Error;

/// Delta encoder/decoder error kinds exposed to callers.
#[derive(Error, Debug)]
pub enum DeltaError {
    /// Failure while building delta instructions.
    #[error("Delta encoder error: {0}")]
    EncodeError(String),

    /// Failure while applying delta instructions.
    #[error("Delta apply error: {0}")]
    ApplyError(String),
}
