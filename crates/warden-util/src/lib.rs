//! Shared utilities for wardend
//!
//! This crate provides:
//! - ID types (SessionId, ClientId, ViewId)
//! - Hostname normalization and matching helpers
//! - Error types
//! - Default paths for socket and data directories

mod domain;
mod error;
mod ids;
mod paths;

pub use domain::*;
pub use error::*;
pub use ids::*;
pub use paths::*;
