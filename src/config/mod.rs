//! Configuration management
//!
//! Node settings loaded from a TOML file, overridden by environment
//! variables and then by command-line flags.

pub mod settings;

pub use settings::NodeConfig;
