//! Structured events emitted by the registration stages.
//!
//! Stages report what they measured (cluster sizes, boundary counts, fitted
//! scale, ...) as [`DiagnosticEvent`]s. Callers choose a sink: forward to the
//! log or collect in memory.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    pub stage: &'static str,
    pub metric: &'static str,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticEvent {
    pub fn now(stage: &'static str, metric: &'static str, value: f64) -> Self {
        DiagnosticEvent {
            stage,
            metric,
            value,
            timestamp: Utc::now(),
        }
    }
}

pub trait DiagnosticSink {
    fn emit(&mut self, event: DiagnosticEvent);

    fn record(&mut self, stage: &'static str, metric: &'static str, value: f64) {
        self.emit(DiagnosticEvent::now(stage, metric, value));
    }
}

/// Forwards every event to the `log` facade at debug level.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, event: DiagnosticEvent) {
        log::debug!(
            "[{}] {} {} = {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.stage,
            event.metric,
            event.value
        );
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<DiagnosticEvent>,
}

impl MemorySink {
    /// Latest value recorded for `stage`/`metric`.
    pub fn value(&self, stage: &str, metric: &str) -> Option<f64> {
        self.events
            .iter()
            .rev()
            .find(|e| e.stage == stage && e.metric == metric)
            .map(|e| e.value)
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }
}
