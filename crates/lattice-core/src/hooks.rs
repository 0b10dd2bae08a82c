// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Collaborator Interfaces
// ─────────────────────────────────────────────────────────────────────
//! Glyph notification and trace sinks.
//!
//! Both collaborators are injected into the lattice as `Arc<dyn …>`.
//! The null implementations are the defaults; swapping one in or out
//! never changes graph behaviour.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Receives notifications about labelled nodes.
pub trait GlyphSink: Send + Sync {
    /// A node carrying `label` was created. `context` is `node_creation:<name>`.
    fn on_node_created(&self, label: &str, context: &str);

    /// A node carrying `label` crossed its threshold. `context` is `node_firing:<name>`.
    fn on_node_fired(&self, label: &str, context: &str);
}

/// Receives one record per state-mutating lattice operation.
pub trait TraceSink: Send + Sync {
    fn record(&self, message: &str, source: &str, metadata: &Value);
}

/// Glyph sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGlyphs;

impl GlyphSink for NullGlyphs {
    fn on_node_created(&self, _label: &str, _context: &str) {}
    fn on_node_fired(&self, _label: &str, _context: &str) {}
}

/// Trace sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn record(&self, _message: &str, _source: &str, _metadata: &Value) {}
}

/// Trace sink forwarding every record to the `log` facade at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&self, message: &str, source: &str, metadata: &Value) {
        log::trace!(target: "trigger_lattice", "[{source}] {message} {metadata}");
    }
}

/// A captured trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub message: String,
    pub source: String,
    pub metadata: Value,
}

/// Trace sink that keeps every record in memory.
///
/// Thread-safe: the record list is guarded by a `parking_lot::Mutex`.
#[derive(Debug, Default)]
pub struct MemoryTrace {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemoryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Records emitted by the named operation.
    pub fn from_source(&self, source: &str) -> Vec<TraceRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.source == source)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl TraceSink for MemoryTrace {
    fn record(&self, message: &str, source: &str, metadata: &Value) {
        self.records.lock().push(TraceRecord {
            message: message.to_string(),
            source: source.to_string(),
            metadata: metadata.clone(),
        });
    }
}

type TraceFn = Box<dyn Fn(&str, &str, &Value) + Send + Sync>;

/// Trace sink delegating to a closure.
pub struct ExternalTrace {
    record_fn: TraceFn,
}

impl ExternalTrace {
    pub fn new(record_fn: impl Fn(&str, &str, &Value) + Send + Sync + 'static) -> Self {
        Self {
            record_fn: Box::new(record_fn),
        }
    }
}

impl TraceSink for ExternalTrace {
    fn record(&self, message: &str, source: &str, metadata: &Value) {
        (self.record_fn)(message, source, metadata)
    }
}

type GlyphFn = Box<dyn Fn(GlyphEvent, &str, &str) + Send + Sync>;

/// Which glyph notification fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphEvent {
    Created,
    Fired,
}

/// Glyph sink delegating both notifications to one closure.
pub struct ExternalGlyphs {
    notify_fn: GlyphFn,
}

impl ExternalGlyphs {
    pub fn new(notify_fn: impl Fn(GlyphEvent, &str, &str) + Send + Sync + 'static) -> Self {
        Self {
            notify_fn: Box::new(notify_fn),
        }
    }
}

impl GlyphSink for ExternalGlyphs {
    fn on_node_created(&self, label: &str, context: &str) {
        (self.notify_fn)(GlyphEvent::Created, label, context)
    }

    fn on_node_fired(&self, label: &str, context: &str) {
        (self.notify_fn)(GlyphEvent::Fired, label, context)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_memory_trace_collects() {
        let trace = MemoryTrace::new();
        assert!(trace.is_empty());
        trace.record("added", "add", &json!({"name": "a"}));
        trace.record("removed", "remove", &json!({}));
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.from_source("add")[0].metadata["name"], "a");
        trace.clear();
        assert!(trace.is_empty());
    }

    #[test]
    fn test_external_trace() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            ExternalTrace::new(move |m, s, _| seen.lock().push(format!("{s}:{m}")))
        };
        sink.record("hello", "test", &Value::Null);
        assert_eq!(seen.lock().as_slice(), ["test:hello".to_string()]);
    }

    #[test]
    fn test_external_glyphs_routes_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            ExternalGlyphs::new(move |e, l, c| seen.lock().push((e, l.to_string(), c.to_string())))
        };
        sink.on_node_created("🜏", "node_creation:a");
        sink.on_node_fired("🜏", "node_firing:a");
        let seen = seen.lock();
        assert_eq!(seen[0].0, GlyphEvent::Created);
        assert_eq!(seen[1].0, GlyphEvent::Fired);
        assert_eq!(seen[1].2, "node_firing:a");
    }

    #[test]
    fn test_null_sinks_are_silent() {
        NullTrace.record("x", "y", &Value::Null);
        NullGlyphs.on_node_created("x", "y");
        LogTrace.record("x", "y", &Value::Null);
    }
}
