//! Publicación de eventos hacia consumidores externos
//!
//! El relay del outbox es el único que llama a `EventNotifier::publish`;
//! un error aquí solo reprograma la entrega.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::cache::RedisClient;
use crate::models::event::DispatchEvent;

pub const SERVICE_NAME: &str = "ms-despacho";

/// Sobre JSON publicado: `{type, data, service, timestamp}`
pub fn envelope(event: &DispatchEvent) -> Value {
    json!({
        "type": event.kind.as_str(),
        "data": Value::Object(event.payload.clone()),
        "service": SERVICE_NAME,
        "timestamp": event.occurred_at.to_rfc3339(),
    })
}

#[async_trait::async_trait]
pub trait EventNotifier: Send + Sync {
    async fn publish(&self, event: &DispatchEvent) -> Result<()>;

    /// Nombre para logs y diagnóstico
    fn name(&self) -> &'static str;
}

/// PUBLISH sobre un canal Redis
pub struct RedisEventNotifier {
    client: RedisClient,
    channel: String,
}

impl RedisEventNotifier {
    pub fn new(client: RedisClient, channel: impl Into<String>) -> Self {
        Self {
            client,
            channel: channel.into(),
        }
    }
}

#[async_trait::async_trait]
impl EventNotifier for RedisEventNotifier {
    async fn publish(&self, event: &DispatchEvent) -> Result<()> {
        let message = serde_json::to_string(&envelope(event))?;
        let subscribers = self.client.publish(&self.channel, &message).await?;
        info!(
            event_type = event.kind.as_str(),
            subscribers, "📢 Evento publicado"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Solo registra el evento; se usa cuando no hay Redis configurado
#[derive(Default)]
pub struct LogEventNotifier;

#[async_trait::async_trait]
impl EventNotifier for LogEventNotifier {
    async fn publish(&self, event: &DispatchEvent) -> Result<()> {
        let payload = Value::Object(event.payload.clone());
        info!(
            event_type = event.kind.as_str(),
            payload = %payload,
            "📢 Evento (sin canal externo)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Guarda los eventos publicados en memoria; puede fallar a pedido
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<DispatchEvent>>,
    failures_left: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Las próximas `n` publicaciones fallan
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl EventNotifier for RecordingNotifier {
    async fn publish(&self, event: &DispatchEvent) -> Result<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(anyhow!("notifier unavailable"));
        }
        self.events
            .lock()
            .map_err(|_| anyhow!("recording notifier poisoned"))?
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
