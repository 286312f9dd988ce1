use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Cross-cutting logger for pipeline events.
///
/// Shared by the capture, detection and clock loops, so every method takes
/// `&self`; implementations handle their own synchronisation.
pub trait PipelineLogger: Send + Sync {
    /// Record how long a named pipeline stage took for one cycle.
    fn timing(&self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. detections per frame).
    fn metric(&self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
///
/// Used by the desktop viewer and by tests where logger output is irrelevant.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&self, _stage: &str, _duration_ms: f64) {}
    fn metric(&self, _name: &str, _value: f64) {}
    fn info(&self, _message: &str) {}
}

/// Running totals for one stage or metric.
///
/// Fixed size, so a logger attached to an indefinite run does not grow.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aggregate {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
}

impl Aggregate {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Default)]
struct Records {
    timings: HashMap<String, Aggregate>,
    metrics: HashMap<String, Aggregate>,
}

/// CLI-oriented logger that keeps per-stage timing and metric totals and
/// prints a summary report when the pipeline shuts down.
pub struct StdoutPipelineLogger {
    records: Mutex<Records>,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.timings.is_empty() && records.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!("Pipeline summary ({elapsed_s:.1}s total):")];

        let mut stages: Vec<_> = records.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, agg) in stages {
            let count = agg.count;
            let avg_ms = agg.mean();
            let max_ms = agg.max;
            let rate = if elapsed_s > 0.0 {
                count as f64 / elapsed_s
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: {count:6} cycles  avg {avg_ms:6.1}ms  max {max_ms:6.1}ms  ({rate:5.1}/s)"
            ));
        }

        let mut metrics: Vec<_> = records.metrics.iter().collect();
        metrics.sort_by(|a, b| a.0.cmp(b.0));
        for (name, agg) in metrics {
            lines.push(format!("  {name}: avg {:.1}  max {:.1}", agg.mean(), agg.max));
        }

        Some(lines.join("\n"))
    }

    /// Returns the timing totals for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<Aggregate> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.timings.get(stage).copied()
    }

    /// Returns the totals for a given metric.
    pub fn metrics_for(&self, name: &str) -> Option<Aggregate> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.metrics.get(name).copied()
    }

    fn with_records(&self, f: impl FnOnce(&mut Records)) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut records);
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn timing(&self, stage: &str, duration_ms: f64) {
        self.with_records(|r| match r.timings.get_mut(stage) {
            Some(agg) => agg.record(duration_ms),
            None => {
                let mut agg = Aggregate::default();
                agg.record(duration_ms);
                r.timings.insert(stage.to_string(), agg);
            }
        });
    }

    fn metric(&self, name: &str, value: f64) {
        self.with_records(|r| match r.metrics.get_mut(name) {
            Some(agg) => agg.record(value),
            None => {
                let mut agg = Aggregate::default();
                agg.record(value);
                r.metrics.insert(name.to_string(), agg);
            }
        });
    }

    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
