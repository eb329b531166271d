//! Configuration management for Rally Tools
//!
//! Rally Tools has a single configuration layer: the global user configuration in
//! `~/.rally/config.toml`, which maps environment names to API credentials and holds
//! user-wide defaults. Runtime-only switches (such as `--no-protect`) are passed on the
//! command line and never persisted.
//!
//! # Modules
//!
//! - `global` - [`GlobalConfig`] loading, saving and lookup

mod global;

pub use global::{ApiConfig, GlobalConfig};
