//! User registry and usage log records.
//!
//! At rest both files are plain JSON objects keyed by (normalized) email:
//! `users.json` maps email → [`UserRecord`], `usage.json` maps
//! email → `[UsageEvent, ...]`.

use std::collections::BTreeMap;

use keyrelay_core::USAGE_MESSAGE_PREVIEW_CHARS;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The user registry, keyed by email.
pub type Registry = BTreeMap<String, UserRecord>;

/// The usage log, keyed by email, events in append order.
pub type UsageLog = BTreeMap<String, Vec<UsageEvent>>;

/// Per-user assignment and usage counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Index into the key pool.
    pub api_key_index: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub assigned_date: OffsetDateTime,
    #[serde(default)]
    pub total_messages: u64,
    /// Estimated USD spent so far.
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl UserRecord {
    /// Fresh record with zeroed counters.
    pub fn new(api_key_index: usize, assigned_date: OffsetDateTime, user_agent: Option<&str>) -> Self {
        Self {
            api_key_index,
            assigned_date,
            total_messages: 0,
            total_cost: 0.0,
            user_agent: user_agent.map(str::to_string),
        }
    }

    /// Count one relayed message and its estimated cost.
    #[inline]
    pub fn add_usage(&mut self, cost: f64) {
        self.total_messages += 1;
        self.total_cost += cost;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.total_messages > 0
    }
}

/// One relayed chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Leading part of the user message.
    #[serde(default)]
    pub message: String,
    pub message_length: usize,
    pub response_length: usize,
    pub cost: f64,
}

impl UsageEvent {
    /// Build an event for `message`/`response`, keeping only a preview of the message.
    pub fn new(timestamp: OffsetDateTime, message: &str, response: &str, cost: f64) -> Self {
        Self {
            timestamp,
            message: message.chars().take(USAGE_MESSAGE_PREVIEW_CHARS).collect(),
            message_length: message.chars().count(),
            response_length: response.chars().count(),
            cost,
        }
    }
}

/// Outcome of [`UserStore::assign`](crate::UserStore::assign).
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub record: UserRecord,
    /// A record was created by this call.
    pub is_new: bool,
    /// An existing record pointed past the end of the pool and was re-bound.
    pub reassigned: bool,
}
