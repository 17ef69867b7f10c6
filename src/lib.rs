//! Sudogate — remote approval gate for privileged commands.
//!
//! This library exposes the core components of sudogate for integration
//! testing and programmatic use. The binary entrypoint is in `main.rs`.

pub mod access;
pub mod arbiter;
pub mod channel;
pub mod config;
pub mod executor;
pub mod request;
