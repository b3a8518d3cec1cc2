//! sdp-core - Core library for ServiceDesk Plus bulk administration
//!
//! This crate provides the pieces behind the `sdp` CLI:
//!
//! - **auth**: Basic or technician-key authentication
//! - **client**: REST API v3 client (CMDB, users, technicians, lookups)
//! - **config**: Typed JSON configuration with load-time validation
//! - **operations**: CI updates and user-to-technician conversions
//! - **runner**: Sequential bulk runner with per-item accounting

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod operations;
pub mod runner;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export commonly used types
pub use client::SdpClient;
pub use config::Config;
pub use error::{Error, Result};
pub use runner::{BatchReport, BatchRunner, OperationResult, RunObserver, TracingObserver};
