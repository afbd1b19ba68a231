//! Execution metrics and the process-wide debug switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);
static LAST_METRICS: Mutex<Option<ExecutionMetrics>> = Mutex::new(None);

/// Timing and shape data for one `run_pine_script` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetrics {
    pub start_ms: u64,
    pub end_ms: u64,
    pub elapsed_ms: u64,
    pub bar_count: usize,
    pub result_count: usize,
    pub script_version: u32,
}

/// Toggle verbose logging and metrics retention for subsequent runs.
pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
    log::debug!("debug mode {}", if enabled { "enabled" } else { "disabled" });
}

pub fn debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

/// Metrics from the most recent run, if any run has completed.
pub fn last_metrics() -> Option<ExecutionMetrics> {
    LAST_METRICS.lock().ok().and_then(|g| g.clone())
}

pub(crate) fn record(metrics: ExecutionMetrics) {
    if let Ok(mut guard) = LAST_METRICS.lock() {
        *guard = Some(metrics);
    }
}

/// Wall clock in milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_serialize_camel_case() {
        let m = ExecutionMetrics {
            start_ms: 10,
            end_ms: 12,
            elapsed_ms: 2,
            bar_count: 100,
            result_count: 3,
            script_version: 6,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["elapsedMs"], 2);
        assert_eq!(json["barCount"], 100);
        assert_eq!(json["scriptVersion"], 6);
    }

    #[test]
    fn record_then_read_back() {
        let m = ExecutionMetrics {
            start_ms: 1,
            end_ms: 2,
            elapsed_ms: 1,
            bar_count: 5,
            result_count: 1,
            script_version: 5,
        };
        record(m.clone());
        assert_eq!(last_metrics(), Some(m));
    }
}
