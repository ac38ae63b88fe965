//! Process-wide outcome counters.
//!
//! The counter set is fixed at compile time, so every counter lives in its own
//! `AtomicU64` slot. Increments never take a lock and snapshots never block
//! incrementers.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    AuthSuccess,
    AuthFailure,
    ValidationError,
    PesuAcademyError,
    UnhandledException,
    CsrfTokenError,
    ProfileFetchError,
    ProfileParseError,
    CsrfTokenRefreshSuccess,
    CsrfTokenRefreshFailure,
}

impl Counter {
    pub const ALL: [Self; 10] = [
        Self::AuthSuccess,
        Self::AuthFailure,
        Self::ValidationError,
        Self::PesuAcademyError,
        Self::UnhandledException,
        Self::CsrfTokenError,
        Self::ProfileFetchError,
        Self::ProfileParseError,
        Self::CsrfTokenRefreshSuccess,
        Self::CsrfTokenRefreshFailure,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AuthSuccess => "auth_success_total",
            Self::AuthFailure => "auth_failure_total",
            Self::ValidationError => "validation_error_total",
            Self::PesuAcademyError => "pesu_academy_error_total",
            Self::UnhandledException => "unhandled_exception_total",
            Self::CsrfTokenError => "csrf_token_error_total",
            Self::ProfileFetchError => "profile_fetch_error_total",
            Self::ProfileParseError => "profile_parse_error_total",
            Self::CsrfTokenRefreshSuccess => "csrf_token_refresh_success_total",
            Self::CsrfTokenRefreshFailure => "csrf_token_refresh_failure_total",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|counter| counter.name() == name)
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Point-in-time copy of every counter, keyed by counter name.
pub type MetricsSnapshot = BTreeMap<&'static str, u64>;

#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: [AtomicU64; Counter::ALL.len()],
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self, counter: Counter) {
        self.counters[counter.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by name. Unknown names are ignored.
    pub fn increment(&self, name: &str) {
        if let Some(counter) = Counter::from_name(name) {
            self.incr(counter);
        }
    }

    #[must_use]
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        Counter::ALL
            .into_iter()
            .map(|counter| (counter.name(), self.get(counter)))
            .collect()
    }
}

/// Wire shape of the metrics operation.
#[derive(Serialize, Debug)]
pub struct MetricsReport {
    pub status: bool,
    pub message: String,
    pub timestamp: String,
    pub metrics: MetricsSnapshot,
}
