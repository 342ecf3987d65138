#[cfg(test)]
use crate::core::dispatch::{HttpReply, HttpTransport};
#[cfg(test)]
use crate::core::retry::Sleeper;
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use serde_json::{json, Value};
#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use std::time::Duration;

/// Records requested waits instead of waiting.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Replays a fixed list of outcomes, one per request. Running past the end
/// of the script is a test bug and panics.
#[cfg(test)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpReply, String>>>,
    requests: Mutex<Vec<(String, Value)>>,
}

#[cfg(test)]
impl ScriptedTransport {
    pub fn new(script: Vec<Result<HttpReply, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<HttpReply, String> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted transport ran out of replies")
    }
}

/// A 200 reply carrying `text` at the usual candidate path.
#[cfg(test)]
pub fn ok_reply(text: &str) -> HttpReply {
    HttpReply::new(200, candidate_body(text).to_string())
}

#[cfg(test)]
pub fn candidate_body(text: &str) -> Value {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

/// `tracing` layer that keeps the `attempt` field of every WARN event.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct WarningRecorder {
    attempts: std::sync::Arc<Mutex<Vec<u64>>>,
}

#[cfg(test)]
impl WarningRecorder {
    /// Installs the recorder for the current thread until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn attempts(&self) -> Vec<u64> {
        self.attempts.lock().unwrap().clone()
    }
}

#[cfg(test)]
struct AttemptField(Option<u64>);

#[cfg(test)]
impl tracing::field::Visit for AttemptField {
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "attempt" {
            self.0 = Some(value);
        }
    }

    fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {}
}

#[cfg(test)]
impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningRecorder {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() != tracing::Level::WARN {
            return;
        }
        let mut field = AttemptField(None);
        event.record(&mut field);
        if let Some(attempt) = field.0 {
            self.attempts.lock().unwrap().push(attempt);
        }
    }
}
