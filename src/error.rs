//! Error types for the wallet daemon.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type used throughout the wallet daemon.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Stable error kinds surfaced by the daemon's RPC and CLI front ends.
#[derive(Debug, Error)]
pub enum WalletError {
    /// A mutating operation was attempted while the wallet is locked.
    #[error("wallet is locked")]
    Locked,

    /// Passphrase did not authenticate against the stored ciphertext.
    #[error("wallet decryption failed: wrong passphrase")]
    Decryption,

    /// The qaddress does not name an item in this wallet.
    #[error("unknown signer address: {0}")]
    UnknownSigner(String),

    /// Caller-supplied OTS index is behind the wallet's cursor.
    #[error("ots index conflict: supplied {supplied} < cursor {cursor}")]
    OtsIndexConflict {
        /// Index the caller supplied.
        supplied: u32,
        /// Current on-disk cursor.
        cursor: u32,
    },

    /// The key's OTS index space (2^h) is exhausted.
    #[error("ots index exhausted: cursor {cursor} >= 2^{height}")]
    OtsExhausted {
        /// Current cursor.
        cursor: u32,
        /// Tree height.
        height: u8,
    },

    /// Extended seed failed length or descriptor validation.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Descriptor named a hash function or tree height this engine doesn't
    /// implement.
    #[error("unsupported descriptor: {0}")]
    UnsupportedDescriptor(String),

    /// A qaddress failed prefix/length/checksum validation.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// Outbound node call failed at the transport level.
    #[error("node unavailable: {0}")]
    NodeUnavailable(String),

    /// The node rejected a submitted transaction.
    #[error("node rejected transaction: {0}")]
    NodeRejected(String),

    /// A transaction variant failed its field-level validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The on-disk wallet file failed to parse as a known schema.
    #[error("wallet file is corrupt: {0}")]
    CorruptWallet(String),

    /// Wrapped filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapped outbound HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WalletError {
    /// Stable numeric discriminant mirroring the original RPC's
    /// `status`/`error_message` envelope; 0 is reserved for success and is
    /// never produced here.
    pub fn status_code(&self) -> u32 {
        1
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    status: u32,
    error_message: String,
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            status: self.status_code(),
            error_message: self.to_string(),
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}
