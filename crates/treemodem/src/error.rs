//! The error type shared by both decoder engines.
//!
//! Decoding has exactly one failure mode from the caller's point of view:
//! the stream is malformed. A [`DecoderError`] carries a human-readable
//! message describing what was expected; after any error the decoder is
//! poisoned and must be discarded. Encoder failures are sink write failures
//! and surface as plain [`std::io::Error`]s instead.

use thiserror::Error;

/// Error raised when a marshaled stream cannot be decoded.
///
/// Covers truncated input, invalid type or length codes, id mismatches
/// against expected elements, and unresolvable address-space references.
/// A decoder that has returned a `DecoderError` is left in an unspecified
/// state; callers must drop it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecoderError {
    message: String,
}

impl DecoderError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for DecoderError {
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("read from input stream failed: {err}"))
    }
}

/// Convenience alias used throughout the crate for decode results.
pub type Result<T> = core::result::Result<T, DecoderError>;
