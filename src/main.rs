//! Unified keyrelay CLI.
//!
//! - `keyrelay server` - Run the HTTP service
//! - `keyrelay users` - Inspect the user registry and usage log offline
//!
//! The server subcommand is also available as the standalone
//! `keyrelay-server` binary.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// keyrelay unified CLI.
#[derive(Parser)]
#[command(
    name = "keyrelay",
    version,
    about = "API-key pool assignment and chat relay for a conversational widget",
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service.
    #[command(name = "server", alias = "serve")]
    Server(Box<keyrelay_server::ServerArgs>),

    /// Inspect and maintain the user registry.
    #[command(name = "users")]
    Users(keyrelay_store::UsersArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Server(args) => keyrelay_server::cli::run(*args).await,
        Commands::Users(args) => keyrelay_store::cli::run(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
