//! Econ Common - shared configuration, errors, and logging for econ-watch.
//!
//! This crate provides:
//! - Configuration types and modular loading
//! - Error types and handling utilities
//! - Logging setup
//! - Shared-secret comparison and string helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod security;
pub mod util;

pub use config::{
    Config, FredConfig, NetworkConfig, ObservabilityConfig, ScheduleConfig, SecretsConfig,
    TelegramConfig,
};
pub use error::{Error, Result};
