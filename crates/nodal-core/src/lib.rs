//! Configuration and secret handling for the nodal CLI.

pub mod config;
pub mod vault;

pub use config::Config;
