//! Configuration system for strata.
//!
//! Provides runtime-configurable traversal, cache, and view settings that persist
//! to disk as RON files. Supports CLI overrides via clap, hot-reload detection,
//! and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CacheConfig, Config, DebugConfig, TraversalConfig, ViewConfig, default_config_dir};
pub use error::ConfigError;
