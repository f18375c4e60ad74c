use thiserror::Error;

use crate::types::RetentionClass;

pub type NpadResult<T> = Result<T, NpadError>;

#[derive(Debug, Error)]
pub enum NpadError {
    #[error("input too large: {size} bytes exceeds {limit} bytes allowed for class {class}")]
    InputTooLarge {
        class: RetentionClass,
        size: usize,
        limit: usize,
    },

    #[error("undefined retention class: {0}")]
    InvalidRetentionClass(u8),

    #[error("invalid paste name: {0}")]
    InvalidName(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid capability token: {0}")]
    InvalidToken(String),

    #[error("paste not found")]
    NotFound,

    #[error("authentication failed: ciphertext does not match key material")]
    AuthenticationFailure,

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NpadError {
    /// Errors an outside caller must not be able to tell apart.
    ///
    /// A missing paste, a malformed token and a failed AEAD open all render
    /// as "not found" so the token scheme cannot be probed.
    pub fn is_concealed_not_found(&self) -> bool {
        matches!(
            self,
            NpadError::NotFound | NpadError::InvalidToken(_) | NpadError::AuthenticationFailure
        )
    }
}
