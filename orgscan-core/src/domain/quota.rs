// orgscan-core/src/domain/quota.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_WARN_THRESHOLD: f64 = 0.70;
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 0.90;

/// Usage figures as reported by the platform on each response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub used: u64,
    pub max: u64,
}

impl ApiUsage {
    pub fn ratio(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        self.used as f64 / self.max as f64
    }
}

// Zones are ordered so that `zone >= QuotaZone::Yellow` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaZone {
    Green,
    Yellow,
    Red,
}

impl QuotaZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for QuotaZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub used_ratio: f64,
    pub warn_threshold: f64,
    pub critical_threshold: f64,
    /// When the ratio was last read from a platform response. `None` until the first call.
    pub measured_at: Option<DateTime<Utc>>,
}

impl Default for QuotaSnapshot {
    fn default() -> Self {
        Self {
            used_ratio: 0.0,
            warn_threshold: DEFAULT_WARN_THRESHOLD,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            measured_at: None,
        }
    }
}

impl QuotaSnapshot {
    pub fn with_thresholds(warn_threshold: f64, critical_threshold: f64) -> Self {
        Self {
            warn_threshold,
            critical_threshold,
            ..Self::default()
        }
    }

    pub fn zone(&self) -> QuotaZone {
        if self.used_ratio >= self.critical_threshold {
            QuotaZone::Red
        } else if self.used_ratio >= self.warn_threshold {
            QuotaZone::Yellow
        } else {
            QuotaZone::Green
        }
    }

    pub fn record(&mut self, usage: ApiUsage, at: DateTime<Utc>) {
        self.used_ratio = usage.ratio();
        self.measured_at = Some(at);
    }

    /// A red measurement only blocks while it is fresh: once it ages out of the
    /// window the next call goes through and refreshes the figure.
    pub fn is_blocking(&self, now: DateTime<Utc>, freshness: chrono::Duration) -> bool {
        match self.measured_at {
            Some(at) => self.zone() == QuotaZone::Red && now - at <= freshness,
            None => false,
        }
    }
}
