//! Reconciliation engine for wardend
//!
//! This crate is the heart of wardend, containing:
//! - Active-session resolution (which domains to enforce, when to wake up)
//! - Wholesale rule-set synchronization
//! - The single expiry timer slot and its rescheduling
//! - Redirection of open views away from domains that stopped being blocked
//! - The level-triggered reconciliation dispatcher tying them together
//!
//! The engine never applies incremental deltas: every trigger recomputes the
//! desired state from the persisted session collection, so missed or
//! reordered triggers self-heal on the next one.

mod engine;
mod redirect;
mod resolver;
mod sync;

pub use engine::*;
pub use redirect::*;
pub use resolver::*;
pub use sync::*;
