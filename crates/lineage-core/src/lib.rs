//! Shared types, error taxonomy and configuration for the lineage
//! tracing workspace.

pub mod api;
pub mod config;
pub mod error;
pub mod types;

pub use api::*;
pub use config::*;
pub use error::*;
pub use types::*;
