//! # keyrelay
//!
//! Hands out Claude API keys from a fixed pool, relays chat messages with a
//! usage estimate, and reports aggregate usage to administrators.
//!
//! ## Crates
//!
//! - [`keyrelay_core`] - Shared constants and defaults
//! - [`keyrelay_config`] - Configuration loading, secrets and validation
//! - [`keyrelay_store`] - User registry, usage log, client keys and reports
//! - [`keyrelay_server`] - HTTP service and upstream clients

pub use keyrelay_config as config;
pub use keyrelay_core as core;
pub use keyrelay_server as server;
pub use keyrelay_store as store;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use keyrelay_config::{Config, Secrets, load_config, validate_config};
    pub use keyrelay_server::{AppState, CancellationToken, ServerError, run_with_shutdown};
    pub use keyrelay_store::{JsonFileStore, KeyPool, KeyStore, MemoryStore, UserStore};
}
