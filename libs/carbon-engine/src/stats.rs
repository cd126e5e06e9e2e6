use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide delivery counters shared by every queue worker and the
/// status exporter.
///
/// Both counters only ever grow. Each increment is atomic on its own; there
/// is no ordering between the two counters or between queues.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    ok: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of the counters, serialized as `{"ok":N,"errors":M}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub ok: u64,
    pub errors: u64,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a successful delivery. Returns the new `ok` value.
    pub fn record_ok(&self) -> u64 {
        self.ok.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a failed delivery. Returns the new `errors` value.
    pub fn record_error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ok: self.ok.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Number of delivery failures tolerated before the process terminates.
///
/// Breached only when `errors` is strictly greater than the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorThreshold {
    pub limit: u64,
}

impl ErrorThreshold {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    pub fn is_breached(&self, errors: u64) -> bool {
        errors > self.limit
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_at_zero() {
        let stats = StatsRegistry::new();
        assert_eq!(stats.snapshot(), StatsSnapshot { ok: 0, errors: 0 });
    }

    #[test]
    fn snapshot_serializes_as_object() {
        let snapshot = StatsSnapshot { ok: 3, errors: 2 };
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), r#"{"ok":3,"errors":2}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let stats = Arc::new(StatsRegistry::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let stats = stats.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..1000 {
                    if i % 2 == 0 {
                        stats.record_ok();
                    } else {
                        stats.record_error();
                    }
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(stats.snapshot(), StatsSnapshot { ok: 4000, errors: 4000 });
    }

    #[test]
    fn threshold_is_strict() {
        let threshold = ErrorThreshold::new(2);
        assert!(!threshold.is_breached(0));
        assert!(!threshold.is_breached(2));
        assert!(threshold.is_breached(3));
        assert!(ErrorThreshold::new(0).is_breached(1));
    }
}
