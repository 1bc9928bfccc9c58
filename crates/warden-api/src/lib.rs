//! Protocol types for wardend IPC
//!
//! This crate defines the wire contract between wardend and its clients:
//! - Persisted data model (session records, blocked-domain pick list)
//! - Enforcement rule objects pushed to the browser bridge
//! - Request/response commands and broadcast events

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Protocol version; bumped on incompatible changes
pub const API_VERSION: u32 = 1;
