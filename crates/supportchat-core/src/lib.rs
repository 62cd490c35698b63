//! SupportChat core crate - shared domain types, errors, and configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::SupportConfig;
pub use error::{Result, SupportError};
pub use types::*;
