//! Domain event publishing.

use tracing::{debug, info, warn};

use crate::domain::DomainEvent;

/// Fire-and-forget sink for domain events. Publishing never fails the
/// operation that raised the events.
#[derive(Clone, Debug)]
pub enum EventPublisher {
    Nats(async_nats::Client),
    /// No broker configured; events are only logged.
    Log,
}

impl EventPublisher {
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::Log };
        match async_nats::connect(url).await {
            Ok(client) => {
                info!(%url, "connected to NATS");
                Self::Nats(client)
            }
            Err(e) => {
                warn!(%url, error = %e, "cannot reach NATS; domain events will only be logged");
                Self::Log
            }
        }
    }

    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(subject, error = %e, "cannot serialize domain event");
                    continue;
                }
            };
            match self {
                Self::Nats(client) => {
                    if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
                        warn!(subject, error = %e, "failed to publish domain event");
                    }
                }
                Self::Log => debug!(subject, payload = %String::from_utf8_lossy(&payload), "domain event"),
            }
        }
    }
}
