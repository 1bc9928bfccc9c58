//! Host collaborator trait interfaces for wardend
//!
//! The engine treats rule enforcement, open-view enumeration/navigation, and
//! the single expiry timer slot as external collaborators. This crate defines
//! those interfaces and provides mock implementations for tests; it contains
//! no platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
