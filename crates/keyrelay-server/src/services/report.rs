//! Admin report with a short-lived in-process cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keyrelay_store::UserStore;
use keyrelay_store::report::{Report, build_report};
use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{ApiError, ErrorPolicy};

struct Cached {
    at: Instant,
    report: Arc<Report>,
}

pub struct ReportService {
    store: Arc<dyn UserStore>,
    pool_size: usize,
    recent_limit: usize,
    ttl: Duration,
    cache: Mutex<Option<Cached>>,
    errors: ErrorPolicy,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn UserStore>,
        pool_size: usize,
        recent_limit: usize,
        ttl: Duration,
        errors: ErrorPolicy,
    ) -> Self {
        Self {
            store,
            pool_size,
            recent_limit,
            ttl,
            cache: Mutex::new(None),
            errors,
        }
    }

    /// Current report with raw emails, and whether it came from the cache.
    pub async fn report(&self) -> Result<(Arc<Report>, bool), ApiError> {
        if let Some(report) = self.cached() {
            debug!("admin report served from cache");
            return Ok((report, true));
        }

        let users = self.store.users().await.map_err(|e| self.errors.store(e))?;
        let usage = self.store.usage().await.map_err(|e| self.errors.store(e))?;
        let report = Arc::new(build_report(
            &users,
            &usage,
            self.pool_size,
            OffsetDateTime::now_utc(),
            self.recent_limit,
        ));

        if !self.ttl.is_zero() {
            *self.cache.lock() = Some(Cached {
                at: Instant::now(),
                report: report.clone(),
            });
        }
        Ok((report, false))
    }

    fn cached(&self) -> Option<Arc<Report>> {
        let cache = self.cache.lock();
        cache
            .as_ref()
            .filter(|c| c.at.elapsed() < self.ttl)
            .map(|c| c.report.clone())
    }
}
