//! Consentd Core — error taxonomy and configuration.

pub mod config;
pub mod error;

pub use config::{CompliancePolicy, ConsentdConfig, DataPaths};
pub use error::{Error, Result};
