// orgscan-core/src/application/watchdog.rs

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::domain::error::DomainError;
use crate::domain::quota::{ApiUsage, QuotaSnapshot, QuotaZone};
use crate::infrastructure::config::WatchdogConfig;

/// Gate in front of every platform call. It never retries anything: it only
/// refuses to start a call while a fresh reading says the daily quota is
/// nearly spent.
#[derive(Debug)]
pub struct QuotaWatchdog {
    snapshot: Mutex<QuotaSnapshot>,
    freshness: Duration,
}

impl Default for QuotaWatchdog {
    fn default() -> Self {
        Self::with_snapshot(QuotaSnapshot::default(), Duration::seconds(60))
    }
}

impl QuotaWatchdog {
    pub fn from_config(config: &WatchdogConfig) -> Self {
        Self::with_snapshot(
            QuotaSnapshot::with_thresholds(config.warn_threshold, config.critical_threshold),
            Duration::seconds(config.freshness_seconds as i64),
        )
    }

    pub fn with_snapshot(snapshot: QuotaSnapshot, freshness: Duration) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            freshness,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QuotaSnapshot> {
        self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> QuotaSnapshot {
        self.lock().clone()
    }

    pub fn before_call(&self) -> Result<(), DomainError> {
        self.check_at(Utc::now())
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        let snapshot = self.lock();
        if snapshot.is_blocking(now, self.freshness) {
            return Err(DomainError::QuotaExceeded {
                used_ratio: snapshot.used_ratio,
                threshold: snapshot.critical_threshold,
            });
        }
        Ok(())
    }

    /// Records the usage reported with a response. The call that crosses the
    /// critical threshold has already happened and is let through; only the
    /// next `before_call` fails.
    pub fn after_call(&self, usage: Option<ApiUsage>) {
        let Some(usage) = usage else {
            return;
        };
        let now = Utc::now();
        let zone = {
            let mut snapshot = self.lock();
            snapshot.record(usage, now);
            snapshot.zone()
        };
        match zone {
            QuotaZone::Green => debug!(used = usage.used, max = usage.max, "API usage"),
            QuotaZone::Yellow => warn!(used = usage.used, max = usage.max, "API usage in yellow zone"),
            QuotaZone::Red => {}
        }
        if let Err(e) = self.check_at(now) {
            warn!(error = %e, "Further platform calls will be refused");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_red_reading_blocks() {
        let snapshot = QuotaSnapshot {
            used_ratio: 0.95,
            measured_at: Some(Utc::now() - Duration::seconds(10)),
            ..QuotaSnapshot::default()
        };
        let watchdog = QuotaWatchdog::with_snapshot(snapshot, Duration::seconds(60));

        let err = watchdog.before_call().unwrap_err();
        assert!(matches!(err, DomainError::QuotaExceeded { used_ratio, threshold }
            if used_ratio == 0.95 && threshold == 0.90));
    }

    #[test]
    fn test_stale_red_reading_lets_call_through() {
        let snapshot = QuotaSnapshot {
            used_ratio: 0.95,
            measured_at: Some(Utc::now() - Duration::seconds(61)),
            ..QuotaSnapshot::default()
        };
        let watchdog = QuotaWatchdog::with_snapshot(snapshot, Duration::seconds(60));
        assert!(watchdog.before_call().is_ok());
    }

    #[test]
    fn test_call_crossing_threshold_blocks_the_next_one() {
        let watchdog = QuotaWatchdog::default();
        assert!(watchdog.before_call().is_ok());

        watchdog.after_call(Some(ApiUsage { used: 4_600, max: 5_000 }));
        assert_eq!(watchdog.snapshot().zone(), QuotaZone::Red);
        assert!(watchdog.before_call().is_err());
    }

    #[test]
    fn test_missing_usage_keeps_snapshot() {
        let watchdog = QuotaWatchdog::default();
        watchdog.after_call(Some(ApiUsage { used: 3_600, max: 5_000 }));
        watchdog.after_call(None);
        let snapshot = watchdog.snapshot();
        assert_eq!(snapshot.zone(), QuotaZone::Yellow);
        assert!(snapshot.measured_at.is_some());
    }

    #[test]
    fn test_thresholds_from_config() {
        let config = WatchdogConfig {
            warn_threshold: 0.5,
            critical_threshold: 0.6,
            freshness_seconds: 30,
        };
        let watchdog = QuotaWatchdog::from_config(&config);
        watchdog.after_call(Some(ApiUsage { used: 61, max: 100 }));
        assert!(watchdog.before_call().is_err());
    }
}
