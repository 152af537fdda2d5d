//! Error types for AuthChain

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Size mismatch: {field} must fit in {expected} bytes, got {actual}")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Transaction too large: {0} bytes")]
    TransactionTooLarge(usize),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid transaction type: {0:#04x}")]
    InvalidTransactionType(u8),
    #[error("Chain linkage mismatch: expected prev_hash {expected}, got {actual}")]
    ChainLinkageMismatch { expected: String, actual: String },
    #[error("Validator is not authorized: {0}")]
    UnauthorizedValidator(String),
    #[error("Validator holds {balance} permissions and cannot delegate {requested}")]
    InsufficientDelegationAuthority { balance: u32, requested: u32 },
    #[error("Delegate holds {balance} permissions and cannot receive {amount} more")]
    DelegationOverflow { balance: u32, amount: u32 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Decode(err.to_string())
    }
}

impl From<hex::FromHexError> for ChainError {
    fn from(err: hex::FromHexError) -> Self {
        ChainError::Decode(format!("Invalid hex: {}", err))
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
