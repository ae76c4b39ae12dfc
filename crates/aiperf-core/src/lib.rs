//! AIPerf Core - data model, configuration, error, and lifecycle types
//!
//! This crate provides the foundational types and abstractions shared by every
//! AIPerf service:
//!
//! - **models**: the wire-level entities (`Conversation`, `CreditDrop`, `RequestRecord`, ...)
//! - **enums**: shared enumerations (`ServiceState`, `MessageType`, `CreditPhase`, ...)
//! - **error**: the `AIPerfError` taxonomy
//! - **config**: `UserConfig` / `ServiceConfig` loading and validation
//! - **hooks**: the lifecycle hook registry used by every service
//! - **providers**: trait interfaces for dataset, tokenizer, and inference-client collaborators
//! - **time**: monotonic/wall-clock conversion helpers

pub mod config;
pub mod enums;
pub mod error;
pub mod hooks;
pub mod models;
pub mod providers;
pub mod time;

pub use enums::*;
pub use error::{AIPerfError, AIPerfResult};
pub use models::*;

/// AIPerf core crate version.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
