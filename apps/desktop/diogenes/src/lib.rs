// Library exports for testing
// The binary (main.rs) imports these as well

pub mod commands;
pub mod error;
pub mod logger;
pub mod window;

use client_core::session::AppSession;

use std::sync::Arc;

/// Managed Tauri state: the one session of this run.
pub type Session = Arc<AppSession<window::DiogenesWindow>>;

#[cfg(test)]
mod tests;
