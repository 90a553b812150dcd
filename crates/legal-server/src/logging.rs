use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast;

/// Log lines kept for replay to new `/api/logs` subscribers.
pub const RING_CAPACITY: usize = 500;

pub type LogRing = Arc<Mutex<VecDeque<String>>>;

/// Fans every event out as a JSON line (`ts`, `level`, `message`, `category`,
/// plus `fields` when the event carries any) to a broadcast channel and a
/// bounded ring.
pub struct BroadcastLayer {
    pub tx: broadcast::Sender<String>,
    pub ring: LogRing,
}

/// Splits an event into its message and the remaining structured fields.
#[derive(Default)]
struct JsonVisitor {
    message: String,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl JsonVisitor {
    fn put(&mut self, field: &tracing::field::Field, value: serde_json::Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.put(field, value.into());
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.put(field, value.into());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.put(field, rendered.into());
        }
    }
}

/// Dashboard category for an event target.
pub fn category(target: &str) -> &'static str {
    if target.contains("extract") {
        "extraction"
    } else if target.starts_with("legal_agent") {
        "completion"
    } else if target.starts_with("legal_core") {
        "pipeline"
    } else if target.starts_with("legal_server") || target.starts_with("tower_http") {
        "http"
    } else {
        "system"
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for BroadcastLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let level = match *event.metadata().level() {
            tracing::Level::ERROR => "err",
            tracing::Level::WARN => "warn",
            tracing::Level::INFO => "info",
            tracing::Level::DEBUG => "debug",
            tracing::Level::TRACE => return,
        };

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let mut line = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "level": level,
            "message": visitor.message,
            "category": category(event.metadata().target()),
        });
        if !visitor.fields.is_empty() {
            line["fields"] = serde_json::Value::Object(visitor.fields);
        }
        let json = line.to_string();

        // No subscribers is fine; the ring still records.
        let _ = self.tx.send(json.clone());
        if let Ok(mut ring) = self.ring.lock() {
            ring.push_back(json);
            if ring.len() > RING_CAPACITY {
                ring.pop_front();
            }
        }
    }
}
