//! Key pool, user registry and usage accounting for keyrelay.
//!
//! This crate provides:
//!
//! - [`KeyPool`] - the ordered upstream credentials a user can be bound to
//! - [`UserRecord`] / [`UsageEvent`] - per-user assignment and usage data
//! - [`UserStore`] - data-access trait with an atomic [`assign`](UserStore::assign)
//! - [`JsonFileStore`] - the `users.json` / `usage.json` registry
//! - [`MemoryStore`] - an in-process registry for tests and embedding
//! - [`KeyStore`] / [`MemoryKeyStore`] - client keys checked by `/verify-key`
//! - [`normalize_email`] - the email rules applied before any lookup
//! - [`report`] - admin report aggregation over a registry snapshot
//!
//! # Example
//!
//! ```
//! use keyrelay_store::{KeyPool, MemoryStore, UserStore};
//!
//! # async fn example() -> Result<(), keyrelay_store::StoreError> {
//! let pool = KeyPool::new(["sk-ant-a", "sk-ant-b"]);
//! let store = MemoryStore::new();
//!
//! let first = store.assign("a@x.com", pool.len(), None).await?;
//! assert!(first.is_new);
//! assert_eq!(pool.get(first.record.api_key_index), Some("sk-ant-a"));
//! # Ok(())
//! # }
//! ```

mod assign;
mod clients;
mod email;
mod error;
mod json;
mod memory;
mod pool;
mod record;
mod traits;

pub mod cli;
pub mod report;

pub use assign::select_key_index;
pub use clients::{ClientKey, KeyStore, MemoryKeyStore, generate_client_key};
pub use email::{EmailError, is_valid_email, normalize_email};
pub use error::StoreError;
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use pool::KeyPool;
pub use record::{Assignment, Registry, UsageEvent, UsageLog, UserRecord};
pub use traits::UserStore;

pub use cli::UsersArgs;
