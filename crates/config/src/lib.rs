//! TOML-deserializable node configuration.

pub mod config;

pub use config::{Config, DataDirConfig, NetworkConfig, PulseTimingOverrides, RpcConfig};
