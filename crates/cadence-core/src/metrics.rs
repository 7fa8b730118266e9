//! Per-request latency metrics.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::Uuid;

/// Latency and volume figures for one request
#[derive(Debug, Clone, Serialize)]
pub struct StreamMetrics {
    /// Request the figures belong to
    pub request_id: Uuid,
    /// Wall-clock time the first unit was dispatched
    pub started_at: DateTime<Utc>,
    /// Time until the first non-empty segment
    pub time_to_first_byte: Option<Duration>,
    /// Time until the stream completed
    pub total_time: Option<Duration>,
    /// Non-empty segments emitted
    pub emitted_unit_count: usize,
    /// Units dropped after a synthesis failure
    pub skipped_unit_count: usize,
    /// Encoded bytes emitted
    pub bytes_emitted: usize,
    #[serde(skip)]
    clock: Instant,
}

impl StreamMetrics {
    /// Start measuring now
    #[must_use]
    pub fn start(request_id: Uuid) -> Self {
        Self {
            request_id,
            started_at: Utc::now(),
            time_to_first_byte: None,
            total_time: None,
            emitted_unit_count: 0,
            skipped_unit_count: 0,
            bytes_emitted: 0,
            clock: Instant::now(),
        }
    }

    /// Count an emitted segment; the first one fixes the TTFB
    pub fn record_segment(&mut self, bytes: usize) {
        if self.time_to_first_byte.is_none() {
            self.time_to_first_byte = Some(self.clock.elapsed());
        }
        self.emitted_unit_count += 1;
        self.bytes_emitted += bytes;
    }

    /// Count a skipped unit
    pub fn record_skip(&mut self) {
        self.skipped_unit_count += 1;
    }

    /// Stop the clock
    pub fn finish(&mut self) {
        self.total_time = Some(self.clock.elapsed());
    }
}

/// Destination for finished request metrics
pub trait MetricsSink: Send + Sync {
    /// Receive the figures for one request, called once per request
    fn report(&self, metrics: &StreamMetrics);
}

/// Logs each report as a JSON line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn report(&self, metrics: &StreamMetrics) {
        let ttfb_ms = metrics.time_to_first_byte.map(|d| d.as_secs_f64() * 1000.0);
        let total_ms = metrics.total_time.map(|d| d.as_secs_f64() * 1000.0);
        let body = serde_json::to_string(metrics).unwrap_or_default();
        info!(
            request_id = %metrics.request_id,
            ttfb_ms,
            total_ms,
            "Stream metrics {}",
            body
        );
    }
}

/// Keeps every report, for tests and diagnostics
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    reports: Mutex<Vec<StreamMetrics>>,
}

impl InMemoryMetrics {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports so far
    #[must_use]
    pub fn reports(&self) -> Vec<StreamMetrics> {
        self.reports.lock().clone()
    }

    /// Report for a request, if one was made
    #[must_use]
    pub fn get(&self, request_id: Uuid) -> Option<StreamMetrics> {
        self.reports
            .lock()
            .iter()
            .find(|m| m.request_id == request_id)
            .cloned()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn report(&self, metrics: &StreamMetrics) {
        self.reports.lock().push(metrics.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttfb_recorded_once() {
        let mut metrics = StreamMetrics::start(Uuid::new_v4());
        metrics.record_segment(10);
        let first = metrics.time_to_first_byte;
        std::thread::sleep(Duration::from_millis(5));
        metrics.record_segment(20);

        assert!(first.is_some());
        assert_eq!(metrics.time_to_first_byte, first);
        assert_eq!(metrics.emitted_unit_count, 2);
        assert_eq!(metrics.bytes_emitted, 30);
    }

    #[test]
    fn test_finish_sets_total() {
        let mut metrics = StreamMetrics::start(Uuid::new_v4());
        metrics.record_skip();
        metrics.finish();
        assert!(metrics.total_time.is_some());
        assert!(metrics.time_to_first_byte.is_none());
        assert_eq!(metrics.skipped_unit_count, 1);
    }

    #[test]
    fn test_in_memory_lookup() {
        let sink = InMemoryMetrics::new();
        let id = Uuid::new_v4();
        sink.report(&StreamMetrics::start(id));
        assert_eq!(sink.reports().len(), 1);
        assert!(sink.get(id).is_some());
        assert!(sink.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_serializes_without_clock() {
        let json = serde_json::to_value(StreamMetrics::start(Uuid::nil())).unwrap();
        assert!(json.get("clock").is_none());
        assert_eq!(json["emitted_unit_count"], 0);
        assert_eq!(json["request_id"], "00000000-0000-0000-0000-000000000000");
    }
}
