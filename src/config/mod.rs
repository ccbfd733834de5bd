//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/laporan/config.toml)
//! 3. Project config (.laporan/config.toml)
//! 4. Environment variables (LAPORAN_*)
//! 5. CLI arguments (highest priority)
//!
//! The merged [`Config`] is frozen into a [`PipelineSettings`] value before a
//! run starts; pipeline stages never read configuration anywhere else.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
