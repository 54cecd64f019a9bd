use async_trait::async_trait;
use lakeside_shared::models::IntegrationEvent;

use crate::repository::StoreError;

/// Outbound channel to notification and activity-log collaborators.
#[async_trait]
pub trait BookingEventSink: Send + Sync {
    async fn publish(&self, event: &IntegrationEvent) -> Result<(), StoreError>;
}

/// Sink for deployments without a broker.
pub struct LoggingEventSink;

#[async_trait]
impl BookingEventSink for LoggingEventSink {
    async fn publish(&self, event: &IntegrationEvent) -> Result<(), StoreError> {
        tracing::info!(topic = event.topic(), key = %event.key(), "Integration event (no broker configured)");
        Ok(())
    }
}
