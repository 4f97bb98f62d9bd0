//! Admin report aggregation.
//!
//! [`build_report`] is a pure function over a registry and usage snapshot;
//! it never touches storage. Emails are returned as stored, call
//! [`Report::anonymized`] before handing the report to a browser.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use keyrelay_core::{NEW_USER_WINDOW_DAYS, TOP_USERS_LIMIT};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::record::{Registry, UsageLog, UserRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub stats: Stats,
    pub users: BTreeMap<String, UserRecord>,
    /// One bucket per pool index, in index order, serialized as an array.
    pub key_distribution: Vec<KeyBucket>,
    pub recent_activity: Vec<Activity>,
    pub analytics: Analytics,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: usize,
    pub total_messages: u64,
    pub total_cost: f64,
    /// Users with at least one message.
    pub active_users: usize,
    pub avg_messages_per_user: f64,
    pub avg_cost_per_user: f64,
    pub total_api_keys: usize,
}

/// Users bound to one pool index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBucket {
    /// `Key <index + 1>`.
    pub key_name: String,
    pub key_index: usize,
    pub users: Vec<String>,
    pub user_count: usize,
    pub total_messages: u64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub user: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub message: String,
    pub response_length: usize,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub user_growth: UserGrowth,
    pub key_efficiency: Vec<KeyEfficiency>,
    pub cost_analysis: CostAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGrowth {
    pub total_users: usize,
    pub new_users_last_7_days: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEfficiency {
    pub key_name: String,
    /// Messages per assigned user.
    pub efficiency: f64,
    /// Percentage of all users on this key.
    pub load_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostAnalysis {
    pub avg_cost_per_message: f64,
    pub top_users: Vec<TopUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub email: String,
    pub total_cost: f64,
    pub total_messages: u64,
}

/// Round half away from zero to `places` decimals.
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Mask an email as `ab***@domain`.
///
/// Everything between the first two characters and the last `@` is
/// replaced. Inputs with fewer than two characters before the `@`, or no
/// `@` at all, are returned unchanged.
pub fn anonymize_email(email: &str) -> String {
    let Some(at) = email.rfind('@') else {
        return email.to_string();
    };
    let mut head = email[..at].chars();
    match (head.next(), head.next()) {
        (Some(a), Some(b)) => format!("{a}{b}***{}", &email[at..]),
        _ => email.to_string(),
    }
}

/// Aggregate a registry snapshot.
pub fn build_report(
    users: &Registry,
    usage: &UsageLog,
    pool_size: usize,
    now: OffsetDateTime,
    recent_limit: usize,
) -> Report {
    let stats = stats(users, pool_size);
    let key_distribution = key_distribution(users, pool_size);
    let recent_activity = recent_activity(usage, recent_limit);
    let analytics = analytics(users, &stats, &key_distribution, now);

    Report {
        stats,
        users: users.clone(),
        key_distribution,
        recent_activity,
        analytics,
        last_updated: now,
    }
}

fn stats(users: &Registry, pool_size: usize) -> Stats {
    let active_users = users.values().filter(|u| u.is_active()).count();
    let total_messages: u64 = users.values().map(|u| u.total_messages).sum();
    let total_cost: f64 = users.values().map(|u| u.total_cost).sum();
    let divisor = active_users.max(1) as f64;

    Stats {
        total_users: users.len(),
        total_messages,
        total_cost: round_to(total_cost, 3),
        active_users,
        avg_messages_per_user: round_to(total_messages as f64 / divisor, 2),
        avg_cost_per_user: round_to(total_cost / divisor, 3),
        total_api_keys: pool_size,
    }
}

fn key_distribution(users: &Registry, pool_size: usize) -> Vec<KeyBucket> {
    let mut buckets: Vec<KeyBucket> = (0..pool_size)
        .map(|i| KeyBucket {
            key_name: format!("Key {}", i + 1),
            key_index: i,
            users: Vec::new(),
            user_count: 0,
            total_messages: 0,
            total_cost: 0.0,
        })
        .collect();

    for (email, user) in users {
        if let Some(bucket) = buckets.get_mut(user.api_key_index) {
            bucket.users.push(email.clone());
            bucket.user_count += 1;
            bucket.total_messages += user.total_messages;
            bucket.total_cost += user.total_cost;
        }
    }
    for bucket in &mut buckets {
        bucket.total_cost = round_to(bucket.total_cost, 3);
    }
    buckets
}

fn recent_activity(usage: &UsageLog, limit: usize) -> Vec<Activity> {
    let mut all: Vec<Activity> = usage
        .iter()
        .flat_map(|(email, events)| {
            events.iter().map(move |e| Activity {
                user: email.clone(),
                timestamp: e.timestamp,
                message: e.message.clone(),
                response_length: e.response_length,
                cost: e.cost,
            })
        })
        .collect();
    all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    all.truncate(limit);
    all
}

fn analytics(
    users: &Registry,
    stats: &Stats,
    buckets: &[KeyBucket],
    now: OffsetDateTime,
) -> Analytics {
    let window_start = now - Duration::days(NEW_USER_WINDOW_DAYS);
    let new_users = users
        .values()
        .filter(|u| u.assigned_date > window_start)
        .count();

    let total_users = stats.total_users.max(1) as f64;
    let key_efficiency = buckets
        .iter()
        .map(|b| KeyEfficiency {
            key_name: b.key_name.clone(),
            efficiency: if b.user_count > 0 {
                round_to(b.total_messages as f64 / b.user_count as f64, 2)
            } else {
                0.0
            },
            load_balance: round_to(b.user_count as f64 / total_users * 100.0, 2),
        })
        .collect();

    let mut spenders: Vec<(&String, &UserRecord)> =
        users.iter().filter(|(_, u)| u.total_cost > 0.0).collect();
    spenders.sort_by(|a, b| {
        b.1.total_cost
            .partial_cmp(&a.1.total_cost)
            .unwrap_or(Ordering::Equal)
    });
    let top_users = spenders
        .into_iter()
        .take(TOP_USERS_LIMIT)
        .map(|(email, u)| TopUser {
            email: email.clone(),
            total_cost: round_to(u.total_cost, 3),
            total_messages: u.total_messages,
        })
        .collect();

    let avg_cost_per_message = if stats.total_messages > 0 {
        round_to(stats.total_cost / stats.total_messages as f64, 3)
    } else {
        0.0
    };

    Analytics {
        user_growth: UserGrowth {
            total_users: stats.total_users,
            new_users_last_7_days: new_users,
        },
        key_efficiency,
        cost_analysis: CostAnalysis {
            avg_cost_per_message,
            top_users,
        },
    }
}

impl Report {
    /// Copy of the report with every email masked by [`anonymize_email`].
    ///
    /// Masked user keys that collide get a ` (n)` suffix so no record is
    /// dropped.
    pub fn anonymized(&self) -> Report {
        let mut users = BTreeMap::new();
        for (email, record) in &self.users {
            let masked = anonymize_email(email);
            let mut key = masked.clone();
            let mut n = 2;
            while users.contains_key(&key) {
                key = format!("{masked} ({n})");
                n += 1;
            }
            users.insert(key, record.clone());
        }

        let mut out = self.clone();
        out.users = users;
        for bucket in &mut out.key_distribution {
            for user in &mut bucket.users {
                *user = anonymize_email(user);
            }
        }
        for activity in &mut out.recent_activity {
            activity.user = anonymize_email(&activity.user);
        }
        for top in &mut out.analytics.cost_analysis.top_users {
            top.email = anonymize_email(&top.email);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::record::UsageEvent;

    const NOW: OffsetDateTime = datetime!(2025-07-10 12:00 UTC);

    fn user(index: usize, days_ago: i64, messages: u64, cost: f64) -> UserRecord {
        UserRecord {
            api_key_index: index,
            assigned_date: NOW - Duration::days(days_ago),
            total_messages: messages,
            total_cost: cost,
            user_agent: None,
        }
    }

    fn sample() -> (Registry, UsageLog) {
        let mut users = Registry::new();
        users.insert("alice@x.com".into(), user(0, 1, 4, 0.0123));
        users.insert("bob@y.org".into(), user(1, 30, 2, 0.5));
        users.insert("carol@z.net".into(), user(0, 2, 0, 0.0));
        users.insert("stale@x.com".into(), user(9, 2, 1, 0.001));

        let mut usage = UsageLog::new();
        usage.insert(
            "alice@x.com".into(),
            vec![
                UsageEvent::new(NOW - Duration::hours(3), "first", "r", 0.001),
                UsageEvent::new(NOW - Duration::hours(1), "third", "rr", 0.002),
            ],
        );
        usage.insert(
            "bob@y.org".into(),
            vec![UsageEvent::new(NOW - Duration::hours(2), "second", "rrr", 0.003)],
        );
        (users, usage)
    }

    #[test]
    fn test_empty_report() {
        let report = build_report(&Registry::new(), &UsageLog::new(), 2, NOW, 20);
        assert_eq!(report.stats.total_users, 0);
        assert_eq!(report.stats.total_messages, 0);
        assert_eq!(report.stats.total_cost, 0.0);
        assert_eq!(report.stats.avg_cost_per_user, 0.0);
        assert_eq!(report.stats.total_api_keys, 2);
        assert!(report.users.is_empty());
        assert!(report.recent_activity.is_empty());
        assert_eq!(report.key_distribution.len(), 2);
        assert!(report.key_distribution.iter().all(|b| b.users.is_empty()));
        assert!(report.analytics.cost_analysis.top_users.is_empty());
        assert_eq!(report.analytics.cost_analysis.avg_cost_per_message, 0.0);
    }

    #[test]
    fn test_stats() {
        let (users, usage) = sample();
        let stats = build_report(&users, &usage, 2, NOW, 20).stats;
        assert_eq!(stats.total_users, 4);
        assert_eq!(stats.active_users, 3);
        assert_eq!(stats.total_messages, 7);
        assert_eq!(stats.total_cost, 0.513);
        assert_eq!(stats.avg_messages_per_user, 2.33);
        assert_eq!(stats.avg_cost_per_user, 0.171);
    }

    #[test]
    fn test_key_distribution_ignores_out_of_range() {
        let (users, usage) = sample();
        let buckets = build_report(&users, &usage, 2, NOW, 20).key_distribution;
        assert_eq!(buckets[0].key_name, "Key 1");
        assert_eq!(buckets[0].users, vec!["alice@x.com", "carol@z.net"]);
        assert_eq!(buckets[0].total_messages, 4);
        assert_eq!(buckets[0].total_cost, 0.012);
        assert_eq!(buckets[1].users, vec!["bob@y.org"]);
        let listed: usize = buckets.iter().map(|b| b.user_count).sum();
        assert_eq!(listed, 3);
    }

    #[test]
    fn test_recent_activity_sorted_and_limited() {
        let (users, usage) = sample();
        let recent = build_report(&users, &usage, 2, NOW, 20).recent_activity;
        let messages: Vec<&str> = recent.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, ["third", "second", "first"]);

        let limited = build_report(&users, &usage, 2, NOW, 2).recent_activity;
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].user, "alice@x.com");
    }

    #[test]
    fn test_analytics() {
        let (users, usage) = sample();
        let analytics = build_report(&users, &usage, 2, NOW, 20).analytics;
        assert_eq!(analytics.user_growth.new_users_last_7_days, 3);
        assert_eq!(analytics.key_efficiency[0].efficiency, 2.0);
        assert_eq!(analytics.key_efficiency[0].load_balance, 50.0);
        assert_eq!(analytics.key_efficiency[1].load_balance, 25.0);
        assert_eq!(analytics.cost_analysis.avg_cost_per_message, 0.073);

        let top: Vec<&str> = analytics
            .cost_analysis
            .top_users
            .iter()
            .map(|t| t.email.as_str())
            .collect();
        assert_eq!(top, ["bob@y.org", "alice@x.com", "stale@x.com"]);
    }

    #[test]
    fn test_anonymize_email() {
        assert_eq!(anonymize_email("alice@x.com"), "al***@x.com");
        assert_eq!(anonymize_email("ab@x.com"), "ab***@x.com");
        assert_eq!(anonymize_email("a@x.com"), "a@x.com");
        assert_eq!(anonymize_email("no-at-sign"), "no-at-sign");
        assert_eq!(anonymize_email("a@b@c.io"), "a@***@c.io");
    }

    #[test]
    fn test_anonymized_report_masks_everywhere() {
        let (mut users, usage) = sample();
        users.insert("alfred@x.com".into(), user(1, 1, 0, 0.0));
        let report = build_report(&users, &usage, 2, NOW, 20).anonymized();

        assert_eq!(report.users.len(), 5);
        assert!(report.users.contains_key("al***@x.com"));
        assert!(report.users.contains_key("al***@x.com (2)"));
        assert!(report.recent_activity.iter().all(|a| a.user.contains("***")));
        assert_eq!(report.key_distribution[1].users[0], "al***@x.com");
        assert_eq!(report.analytics.cost_analysis.top_users[0].email, "bo***@y.org");
    }

    #[test]
    fn test_report_wire_format() {
        let (users, usage) = sample();
        let json = serde_json::to_value(build_report(&users, &usage, 2, NOW, 20)).unwrap();
        assert_eq!(json["stats"]["totalUsers"], 4);
        let buckets = json["keyDistribution"].as_array().unwrap();
        assert_eq!(buckets.len(), 2);
        for (i, bucket) in buckets.iter().enumerate() {
            assert_eq!(bucket["keyIndex"], i);
            assert_eq!(bucket["keyName"], format!("Key {}", i + 1));
        }
        assert_eq!(json["analytics"]["userGrowth"]["newUsersLast7Days"], 3);
        assert_eq!(json["lastUpdated"], "2025-07-10T12:00:00Z");
        assert!(json["recentActivity"].is_array());
    }
}
