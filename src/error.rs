//! use csrtool::error::CsrToolError;

use thiserror::Error;

/// Represents errors that can occur while generating a key pair and CSR.
///
/// Every failure of the engine is one of these four kinds. The bridge turns
/// them into the `error` field of the response, so none of them ever reaches
/// a caller as a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrToolError {
    /// Malformed or missing input field. The user can correct it.
    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// The secure random source or the key generator failed.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The private key does not match the declared signature algorithm.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// A well-formed structure could not be encoded.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),
}

impl CsrToolError {
    /// Whether the error points at a defect in the engine rather than at
    /// the request or the platform.
    pub fn is_engine_defect(&self) -> bool {
        matches!(
            self,
            CsrToolError::SigningError(_) | CsrToolError::EncodingError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CsrToolError>;

impl From<der::Error> for CsrToolError {
    /// Converts a `der::Error` into a `CsrToolError`.
    fn from(err: der::Error) -> Self {
        CsrToolError::EncodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CsrToolError {
    fn from(err: pkcs8::Error) -> Self {
        CsrToolError::EncodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CsrToolError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CsrToolError::EncodingError(err.to_string())
    }
}

impl From<serde_json::Error> for CsrToolError {
    fn from(err: serde_json::Error) -> Self {
        CsrToolError::ValidationError(err.to_string())
    }
}
