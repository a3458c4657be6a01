//! HTTP API for the evaluation service
//!
//! Provides:
//! - The evaluation endpoint, the one write path into the log
//! - Full log read-back for audit consumers
//! - Flagged-case filtering and CSV export
//! - Health check

pub mod server;

pub use server::{ApiServer, ApiServerConfig};
