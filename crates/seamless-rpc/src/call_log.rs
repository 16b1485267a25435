//! Bounded log of dispatched calls for the development endpoints.

use seamless_core::rpc::{now_millis, Outcome};
use seamless_core::DispatchReport;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Entries kept before the oldest are dropped.
pub const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    /// Request id echoed in the response (`unknown` for undecodable requests).
    pub id: String,
    pub method: Option<String>,
    /// Milliseconds since the Unix epoch when the request arrived.
    pub timestamp: i64,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub average_duration_ms: u64,
}

/// Most-recent-first call log.
#[derive(Debug)]
pub struct CallLog {
    entries: Mutex<VecDeque<CallLogEntry>>,
    capacity: usize,
}

impl Default for CallLog {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_LOG_ENTRIES))),
            capacity: capacity.max(1),
        }
    }

    /// Record the outcome of one dispatched request.
    pub fn record(&self, report: &DispatchReport) {
        let duration_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX);
        let method = report.method.clone();
        let label = method.as_deref().unwrap_or("<undecoded>");

        let error = match &report.response.outcome {
            Outcome::Result(_) => {
                debug!("{} completed in {}ms", label, duration_ms);
                None
            }
            Outcome::Error(payload) => {
                warn!("{} failed in {}ms: {}", label, duration_ms, payload.message);
                Some(payload.message.clone())
            }
        };

        let entry = CallLogEntry {
            id: report.response.id.clone(),
            method,
            timestamp: now_millis() - i64::try_from(duration_ms).unwrap_or(0),
            duration_ms,
            success: error.is_none(),
            error,
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Snapshot of the log, newest first.
    pub fn entries(&self) -> Vec<CallLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> CallStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let total = entries.len();
        let successful = entries.iter().filter(|e| e.success).count();
        let total_ms: u64 = entries.iter().map(|e| e.duration_ms).sum();
        CallStats {
            total,
            successful,
            failed: total - successful,
            average_duration_ms: if total == 0 {
                0
            } else {
                (total_ms as f64 / total as f64).round() as u64
            },
        }
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seamless_core::{ResponseEnvelope, RpcError, Value};
    use std::time::Duration;

    fn report(id: &str, ok: bool, millis: u64) -> DispatchReport {
        let response = if ok {
            ResponseEnvelope::success(id, Value::Null)
        } else {
            ResponseEnvelope::failure(id, &RpcError::not_found("m.f"), false)
        };
        DispatchReport {
            method: Some("m.f".into()),
            response,
            elapsed: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let log = CallLog::with_capacity(3);
        for i in 0..5 {
            log.record(&report(&format!("r{}", i), true, 1));
        }
        let ids: Vec<String> = log.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["r4", "r3", "r2"]);
    }

    #[test]
    fn test_stats() {
        let log = CallLog::new();
        assert_eq!(log.stats(), CallStats::default());

        log.record(&report("a", true, 10));
        log.record(&report("b", false, 20));
        log.record(&report("c", true, 31));

        let stats = log.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.average_duration_ms, 20);

        let failed = &log.entries()[1];
        assert!(!failed.success);
        assert!(failed.error.as_deref().unwrap().contains("m.f"));

        log.clear();
        assert!(log.entries().is_empty());
    }
}
