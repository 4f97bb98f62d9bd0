//! Default configuration values.
//!
//! Centralized default constants for use across all crates.

// ============================================================================
// Server Defaults
// ============================================================================

/// Default HTTP listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8888";
/// Default upstream request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default directory holding the registry files.
pub const DEFAULT_DATA_DIR: &str = "data";
/// Default user registry file name.
pub const DEFAULT_USERS_FILE: &str = "users.json";
/// Default usage log file name.
pub const DEFAULT_USAGE_FILE: &str = "usage.json";
/// Number of leading characters of a user message kept in the usage log.
pub const USAGE_MESSAGE_PREVIEW_CHARS: usize = 100;

// ============================================================================
// Key Pool Defaults
// ============================================================================

/// Environment variable prefix for pool keys (`CLAUDE_API_KEY_1`, ...).
pub const DEFAULT_KEY_ENV_PREFIX: &str = "CLAUDE_API_KEY_";
/// Highest numbered pool key variable that is read.
pub const DEFAULT_MAX_KEYS: usize = 15;
/// Keys not starting with this prefix are skipped.
pub const DEFAULT_KEY_REQUIRED_PREFIX: &str = "sk-ant-";

// ============================================================================
// Upstream (Anthropic) Defaults
// ============================================================================

/// Default Anthropic API base URL.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.anthropic.com";
/// Default model used for relayed chats.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
/// Default `max_tokens` for relayed chats.
pub const DEFAULT_MAX_TOKENS: u32 = 4000;
/// Value of the `anthropic-version` header.
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// Cost Estimation
// ============================================================================

/// Characters per token used by the length heuristic.
pub const CHARS_PER_TOKEN: f64 = 4.0;
/// USD per 1000 input tokens.
pub const INPUT_PRICE_PER_1K: f64 = 0.003;
/// USD per 1000 output tokens.
pub const OUTPUT_PRICE_PER_1K: f64 = 0.015;

// ============================================================================
// Voice (ElevenLabs) Defaults
// ============================================================================

/// Default ElevenLabs API base URL.
pub const DEFAULT_VOICE_BASE_URL: &str = "https://api.elevenlabs.io";

// ============================================================================
// Admin Reporting Defaults
// ============================================================================

/// Default admin report cache lifetime in seconds.
pub const DEFAULT_ADMIN_CACHE_TTL_SECS: u64 = 30;
/// Default number of usage events in `recentActivity`.
pub const DEFAULT_RECENT_ACTIVITY_LIMIT: usize = 20;
/// Number of users listed in the cost leaderboard.
pub const TOP_USERS_LIMIT: usize = 5;
/// Window for the "new users" growth figure, in days.
pub const NEW_USER_WINDOW_DAYS: i64 = 7;

// ============================================================================
// Client Key Defaults
// ============================================================================

/// Default usage limit for a newly generated client key.
pub const DEFAULT_CLIENT_LIMIT: u64 = 1000;
/// Default price per minute for a newly generated client key.
pub const DEFAULT_CLIENT_PRICE_PER_MINUTE: f64 = 1.5;
/// Maximum length of the company slug embedded in client keys.
pub const CLIENT_KEY_SLUG_MAX: usize = 10;

// ============================================================================
// Logging Defaults
// ============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
