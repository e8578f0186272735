//! Error types for the autosend service

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the autosend service
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Wallet / target list errors
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Wallet store error: {0}")]
    Wallet(String),

    #[error("Target list error: {0}")]
    Targets(String),

    // RPC transport errors
    #[error("RPC connection failed: {0}")]
    RpcConnection(String),

    #[error("RPC timeout: {0}")]
    RpcTimeout(String),

    // RPC-level rejections
    #[error("RPC rejected request ({status}): {body}")]
    RpcRejected { status: u16, body: String },

    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RpcConnection(_) | Error::RpcTimeout(_) => true,
            // Gateway hiccups in front of the node
            Error::RpcRejected { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Check if the remote service answered but refused the request
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::RpcRejected { .. } | Error::TransactionRejected(_)
        )
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::RpcTimeout(e.to_string())
        } else if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else {
            Error::RpcConnection(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
