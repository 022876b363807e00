use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking quota-set operations.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct QuotaMetrics {
    /// Quota sets shown.
    pub shows: AtomicU64,
    /// Detail views served.
    pub details: AtomicU64,
    /// Default sets served.
    pub defaults: AtomicU64,
    /// Update requests that completed.
    pub updates: AtomicU64,
    /// Delete requests that completed.
    pub deletes: AtomicU64,
    /// Individual limit rows written.
    pub limits_written: AtomicU64,
    /// Requests refused by policy or identity failures.
    pub forbidden: AtomicU64,
    /// Requests whose target was not a child of its parent.
    pub invalid_parent: AtomicU64,
    /// Requests rejected by body parsing or limit validation.
    pub validation_failed: AtomicU64,
    /// Requests that failed in the store.
    pub store_errors: AtomicU64,
}

impl QuotaMetrics {
    pub fn increment_shows(&self) {
        self.shows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_details(&self) {
        self.details.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_defaults(&self) {
        self.defaults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updates(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_limits_written(&self) {
        self.limits_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_forbidden(&self) {
        self.forbidden.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_invalid_parent(&self) {
        self.invalid_parent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failed(&self) {
        self.validation_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_store_errors(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            shows: self.shows.load(Ordering::Relaxed),
            details: self.details.load(Ordering::Relaxed),
            defaults: self.defaults.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            limits_written: self.limits_written.load(Ordering::Relaxed),
            forbidden: self.forbidden.load(Ordering::Relaxed),
            invalid_parent: self.invalid_parent.load(Ordering::Relaxed),
            validation_failed: self.validation_failed.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`QuotaMetrics`] at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub shows: u64,
    pub details: u64,
    pub defaults: u64,
    pub updates: u64,
    pub deletes: u64,
    pub limits_written: u64,
    pub forbidden: u64,
    pub invalid_parent: u64,
    pub validation_failed: u64,
    pub store_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = QuotaMetrics::default();
        metrics.increment_shows();
        metrics.increment_shows();
        metrics.increment_forbidden();
        metrics.increment_limits_written();

        let snap = metrics.snapshot();
        assert_eq!(snap.shows, 2);
        assert_eq!(snap.forbidden, 1);
        assert_eq!(snap.limits_written, 1);
        assert_eq!(snap.updates, 0);
    }
}
