// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.
//!
//! Nothing in the cart layer is fatal: callers log these and fall back to
//! operating on local state.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cart API error: HTTP {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    #[error("Cart API request failed: {0}")]
    RemoteTransport(String),

    #[error("Cart API returned an unreadable body: {0}")]
    RemoteDecode(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether a remote call that failed with this error is worth retrying.
    ///
    /// Transport failures, rate limiting (429) and server errors (5xx) are
    /// transient. Everything else will fail the same way next time.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::RemoteTransport(_) => true,
            AppError::RemoteStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether the remote API rejected the session token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
