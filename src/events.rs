//! Cart event publishing over NATS

use tracing::warn;
use crate::domain::events::CartEvent;

/// Publishes cart events when a NATS client is configured. Failures are logged
/// and swallowed; a cart write never fails because an event could not be sent.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: CartEvent) {
        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { warn!(error = %e, "failed to encode cart event"); return; }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            warn!(error = %e, subject = event.subject(), "failed to publish cart event");
        }
    }
}
