//! CLI Module Organization
//!
//! - args: CLI argument structures
//! - commands: command execution logic

pub mod args;
pub mod commands;

// Re-export commonly used items for convenience
pub use args::*;
pub use commands::*;
