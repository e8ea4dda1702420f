//! Shared plumbing for the Diogenes desktop shell.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking used by every layer
//! - **client-core**: server supervision, handshake, on-disk stores, sessions
//! - **diogenes**: Tauri application wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
pub use error::io_kind::is_not_found;

#[cfg(test)]
mod tests;
