//! Shared configuration and error types for the alter ego relay.

pub mod config;
pub mod error;

pub use config::{AlterEgoConfig, RunMode};
pub use error::{AlterEgoError, Result};
