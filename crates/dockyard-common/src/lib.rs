//! dockyard-common — Shared configuration and error types for the Dockyard workspace.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{BatchConfig, NullPlacement, ReceptorConfig};
pub use error::{DockyardError, Result};
