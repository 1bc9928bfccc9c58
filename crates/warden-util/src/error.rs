//! Error types for wardend

use thiserror::Error;

/// Core error type for wardend operations
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(u32),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
