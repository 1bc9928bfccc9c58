//! Command types for the wardend protocol

use serde::{Deserialize, Serialize};
use crate::{API_VERSION, BlockedDomain, ServiceState, SessionRecord, ViewRef};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidDomain,
    InvalidDuration,
    NoActiveSession,
    DomainNotFound,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    /// Get current daemon state
    GetState,

    /// Start a blocking session for the given domains and duration
    StartSession {
        domains: Vec<String>,
        duration_minutes: u32,
    },

    /// Deactivate the most recent active session
    StopSession,

    /// List all persisted sessions
    ListSessions,

    /// List the blocked-domain pick list
    ListDomains,

    /// Add a domain to the pick list
    AddDomain { domain: String },

    /// Remove a domain from the pick list (matched after normalization)
    RemoveDomain { domain: String },

    /// Replace the enforced rule set with one rule per site, bypassing
    /// session resolution. An empty list means "block nothing".
    #[serde(rename = "updateRules")]
    UpdateRules { sites: Vec<String> },

    /// Subscribe to broadcast events on this connection
    SubscribeEvents,

    /// Bridge clients report their currently open views
    ReportViews { views: Vec<ViewRef> },
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// Generic acknowledgement
    Ack { status: String },

    /// Current daemon state
    State(ServiceState),

    /// The newly started session
    SessionStarted(SessionRecord),

    /// All persisted sessions
    Sessions(Vec<SessionRecord>),

    /// The pick list
    Domains(Vec<BlockedDomain>),
}
