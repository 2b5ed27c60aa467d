//! mongostat daemon library
//!
//! This module provides the pieces the `mongostatd` binary wires together:
//! - Layered configuration
//! - Interval scheduler for collection cycles
//! - `/metrics` and `/health` HTTP endpoints
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod server;

#[cfg(test)]
mod test_support;

pub use config::{CollectMode, DaemonConfig};
pub use error::{ApiError, DaemonError};
pub use scheduler::Scheduler;
pub use server::Server;
