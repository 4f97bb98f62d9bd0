//! Configuration loading, CLI overrides, validation and secrets.
//!
//! Non-secret settings come from an optional json/jsonc/yaml/toml file and
//! command-line overrides. Secrets (the Claude key pool, admin password and
//! voice credentials) are only ever read from the environment, see
//! [`Secrets`].

mod cli;
mod defaults;
mod loader;
mod secrets;
mod types;
mod validate;

pub use cli::{CliOverrides, apply_overrides};
pub use loader::{ConfigError, load_config, load_config_or_default};
pub use secrets::Secrets;
pub use types::*;
pub use validate::validate_config;
