use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::error::ErrorCode;
use crate::domain::transition::ActionKind;

const LATENCY_HISTORY: usize = 1000;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    refreshes: u64,
    approvals_committed: u64,
    rejections_committed: u64,
    rollbacks: u64,
    errors_not_found: u64,
    errors_invalid_state: u64,
    errors_conflict: u64,
    errors_validation: u64,
    errors_transport: u64,
    errors_internal: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: String,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（UIに返す用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub refreshes: u64,
    pub approvals_committed: u64,
    pub rejections_committed: u64,
    pub rollbacks: u64,
    pub error_counts: ErrorCounts,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub not_found: u64,
    pub invalid_state: u64,
    pub conflict: u64,
    pub validation: u64,
    pub transport: u64,
    pub internal: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub fetch: Option<f64>,
    pub approve: Option<f64>,
    pub reject: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_refreshes(&self) {
        self.counters.lock().refreshes += 1;
    }

    pub fn inc_committed(&self, kind: ActionKind) {
        let mut c = self.counters.lock();
        match kind {
            ActionKind::Approve => c.approvals_committed += 1,
            ActionKind::Reject => c.rejections_committed += 1,
        }
    }

    pub fn inc_rollbacks(&self) {
        self.counters.lock().rollbacks += 1;
    }

    pub fn inc_error(&self, code: ErrorCode) {
        let mut c = self.counters.lock();
        match code {
            ErrorCode::NotFound => c.errors_not_found += 1,
            ErrorCode::InvalidState => c.errors_invalid_state += 1,
            ErrorCode::Conflict => c.errors_conflict += 1,
            ErrorCode::Validation => c.errors_validation += 1,
            ErrorCode::Transport => c.errors_transport += 1,
            ErrorCode::Storage | ErrorCode::Internal => c.errors_internal += 1,
        }
    }

    pub fn record_latency(&self, phase: &str, duration_ms: u64) {
        let record = LatencyRecord {
            phase: phase.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        // 最新1000件のみ保持
        if latencies.len() > LATENCY_HISTORY {
            let excess = latencies.len() - LATENCY_HISTORY;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let avg = |phase: &str| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            refreshes: c.refreshes,
            approvals_committed: c.approvals_committed,
            rejections_committed: c.rejections_committed,
            rollbacks: c.rollbacks,
            error_counts: ErrorCounts {
                not_found: c.errors_not_found,
                invalid_state: c.errors_invalid_state,
                conflict: c.errors_conflict,
                validation: c.errors_validation,
                transport: c.errors_transport,
                internal: c.errors_internal,
            },
            avg_latency_ms: AvgLatency {
                fetch: avg("fetch"),
                approve: avg(ActionKind::Approve.as_str()),
                reject: avg(ActionKind::Reject.as_str()),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let m = Metrics::new();
        m.inc_refreshes();
        m.inc_refreshes();
        m.inc_committed(ActionKind::Approve);
        m.inc_committed(ActionKind::Reject);
        m.inc_rollbacks();
        m.inc_error(ErrorCode::Conflict);
        m.inc_error(ErrorCode::Transport);
        m.inc_error(ErrorCode::Storage);

        let s = m.summary();
        assert_eq!(s.refreshes, 2);
        assert_eq!(s.approvals_committed, 1);
        assert_eq!(s.rejections_committed, 1);
        assert_eq!(s.rollbacks, 1);
        assert_eq!(s.error_counts.conflict, 1);
        assert_eq!(s.error_counts.transport, 1);
        assert_eq!(s.error_counts.internal, 1);
    }

    #[test]
    fn test_latency_recording() {
        let m = Metrics::new();
        m.record_latency("approve", 120);
        m.record_latency("approve", 80);
        m.record_latency("fetch", 200);

        let s = m.summary();
        assert!((s.avg_latency_ms.approve.unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((s.avg_latency_ms.fetch.unwrap() - 200.0).abs() < f64::EPSILON);
        assert!(s.avg_latency_ms.reject.is_none());
        assert_eq!(s.recent_latencies.len(), 3);
    }

    #[test]
    fn test_latency_cap() {
        let m = Metrics::new();
        for i in 0..1100 {
            m.record_latency("fetch", i);
        }
        assert_eq!(m.latencies.lock().len(), LATENCY_HISTORY);
    }
}
