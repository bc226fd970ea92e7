//! Tracing setup.
//!
//! The terminal belongs to the UI, so events are formatted into single lines and sent
//! over a channel to the log panel instead of being written to stdout.

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

/// Install the global subscriber and return the receiving end of the log channel.
///
/// `RUST_LOG` overrides the default filter (`debug` in debug builds, `info` otherwise).
pub fn init() -> Receiver<String> {
    let (tx, rx) = unbounded();
    let default_filter = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(ChannelLayer::new(tx))
        .init();
    rx
}

/// Forwards each event as `LEVEL target: message k=v ...`.
pub struct ChannelLayer {
    tx: Sender<String>,
}

impl ChannelLayer {
    pub fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl<S> Layer<S> for ChannelLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let _ = self
            .tx
            .send(visitor.into_line(&meta.level().to_string(), meta.target()));
    }
}

#[derive(Default)]
struct LineVisitor {
    message: Option<String>,
    fields: Vec<String>,
}

impl LineVisitor {
    fn into_line(self, level: &str, target: &str) -> String {
        let mut line = format!("{level:<5} {target}: {}", self.message.unwrap_or_default());
        for field in self.fields {
            line.push(' ');
            line.push_str(&field);
        }
        line
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let formatted = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(formatted);
        } else {
            self.fields.push(format!("{}={}", field.name(), formatted));
        }
    }
}
