//! keyrelay HTTP service.
//!
//! Binds widget users to keys from a pool of upstream credentials, relays
//! their chat messages with a cost estimate, and reports usage to admins.
//!
//! | Route                      | Purpose                                |
//! |----------------------------|----------------------------------------|
//! | `POST /assign-api-key`     | bind a user email to a pool key        |
//! | `POST /claude-chat`        | relay one message, record usage        |
//! | `POST /conversation`       | client-key chat charged to its quota   |
//! | `GET /admin-data`          | aggregated usage report                |
//! | `GET /verify-key`          | check a client key (`x-api-key`)       |
//! | `/generate-api-key`        | admin CRUD over client keys            |
//! | `GET /get-agent-id`        | default voice agent id                 |
//! | `GET /elevenlabs-signed-url` | signed voice conversation URL        |
//! | `GET /health`              | liveness                               |

pub mod cli;
mod error;
mod handlers;
pub mod services;
mod server;
mod state;
pub mod upstream;

pub use cli::ServerArgs;
pub use error::{ApiError, ErrorPolicy, ServerError};
pub use server::{DEFAULT_SHUTDOWN_TIMEOUT, router, run_with_shutdown, serve};
pub use state::AppState;
pub use tokio_util::sync::CancellationToken;
