//! `keyrelay users`: inspect and edit the user registry from a shell.
//!
//! Reads the same config file as the server, so the key pool (`[keys]`),
//! the data directory and the report settings always agree with it.
//!
//! ```bash
//! # List every user and the key they are bound to
//! keyrelay users list -c keyrelay.toml
//!
//! # Bind a user to a key from the configured pool
//! keyrelay users assign -c keyrelay.toml someone@example.com
//!
//! # Print the admin report as JSON, reading another data directory
//! keyrelay users report -c keyrelay.toml -d ./data -f json
//! ```

use std::path::PathBuf;

use clap::{Args, Subcommand};
use keyrelay_config::{Config, Secrets, load_config_or_default, validate_config};
use tabled::{Table, Tabled};
use time::OffsetDateTime;

use crate::email::normalize_email;
use crate::json::JsonFileStore;
use crate::pool::KeyPool;
use crate::record::UserRecord;
use crate::report::{Report, build_report, round_to};
use crate::traits::UserStore;

/// User registry management arguments.
#[derive(Args, Debug, Clone)]
pub struct UsersArgs {
    /// Server config file (json/jsonc/yaml/toml). Defaults apply when omitted.
    #[arg(short, long, env = "KEYRELAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding users.json and usage.json. Overrides `[storage]`.
    #[arg(short, long, env = "KEYRELAY_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: UsersCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum UsersCommands {
    /// List all users.
    List {
        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show one user.
    Show {
        email: String,
    },

    /// Assign a key to a user, creating the record if needed.
    Assign {
        email: String,
    },

    /// Print the admin report.
    Report {
        /// Output format (table, json).
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Mask emails as in the HTTP report.
        #[arg(long)]
        anonymize: bool,
    },
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Assigned")]
    assigned: String,
    #[tabled(rename = "Messages")]
    messages: u64,
    #[tabled(rename = "Cost (USD)")]
    cost: String,
}

impl UserRow {
    fn new(email: &str, record: &UserRecord) -> Self {
        Self {
            email: email.to_string(),
            key: format!("Key {}", record.api_key_index + 1),
            assigned: record.assigned_date.date().to_string(),
            messages: record.total_messages,
            cost: format!("{:.6}", record.total_cost),
        }
    }
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Users")]
    users: usize,
    #[tabled(rename = "Messages")]
    messages: u64,
    #[tabled(rename = "Cost (USD)")]
    cost: f64,
    #[tabled(rename = "Load %")]
    load: f64,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config named by `args` and apply the CLI's data dir override.
fn resolve_config(args: &UsersArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = load_config_or_default(args.config.as_deref())?;
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    validate_config(&config)?;
    Ok(config)
}

/// Run the users CLI.
pub async fn run(args: UsersArgs) -> CliResult {
    let config = resolve_config(&args)?;
    let store = JsonFileStore::from_config(&config.storage);

    match args.command {
        UsersCommands::List { format } => list_users(&store, &format).await,
        UsersCommands::Show { email } => show_user(&store, &email).await,
        UsersCommands::Assign { email } => {
            let pool = KeyPool::new(Secrets::from_env(&config.keys).claude_keys);
            assign_user(&store, &email, &pool).await
        }
        UsersCommands::Report { format, anonymize } => {
            let pool_size = Secrets::from_env(&config.keys).claude_keys.len();
            print_report(&store, &config, pool_size, &format, anonymize).await
        }
    }
}

async fn list_users(store: &JsonFileStore, format: &str) -> CliResult {
    let users = store.users().await?;
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    let rows: Vec<UserRow> = users.iter().map(|(e, r)| UserRow::new(e, r)).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

async fn show_user(store: &JsonFileStore, email: &str) -> CliResult {
    let email = normalize_email(Some(email))?;
    match store.get(&email).await? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        None => Err(format!("user not found: {email}").into()),
    }
}

async fn assign_user(store: &JsonFileStore, email: &str, pool: &KeyPool) -> CliResult {
    let email = normalize_email(Some(email))?;
    let out = store.assign(&email, pool.len(), Some("keyrelay-cli")).await?;
    println!(
        "{email}: Key {} ({})",
        out.record.api_key_index + 1,
        if out.is_new { "new user" } else { "existing user" }
    );
    Ok(())
}

async fn print_report(
    store: &JsonFileStore,
    config: &Config,
    pool_size: usize,
    format: &str,
    anonymize: bool,
) -> CliResult {
    let users = store.users().await?;
    let usage = store.usage().await?;
    let mut report = build_report(
        &users,
        &usage,
        pool_size,
        OffsetDateTime::now_utc(),
        config.admin.recent_activity_limit,
    );
    if anonymize {
        report = report.anonymized();
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report_table(&report);
    }
    Ok(())
}

fn print_report_table(report: &Report) {
    let s = &report.stats;
    println!(
        "users: {} ({} active)  messages: {}  cost: ${}  keys: {}",
        s.total_users, s.active_users, s.total_messages, s.total_cost, s.total_api_keys
    );
    println!(
        "avg messages/user: {}  avg cost/user: ${}  new in last 7 days: {}",
        s.avg_messages_per_user,
        s.avg_cost_per_user,
        report.analytics.user_growth.new_users_last_7_days
    );

    let rows: Vec<BucketRow> = report
        .key_distribution
        .iter()
        .zip(&report.analytics.key_efficiency)
        .map(|(b, e)| BucketRow {
            key: b.key_name.clone(),
            users: b.user_count,
            messages: b.total_messages,
            cost: round_to(b.total_cost, 3),
            load: e.load_balance,
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }
}
