use async_trait::async_trait;
use lakeside_core::events::BookingEventSink;
use lakeside_core::StoreError;
use lakeside_shared::models::IntegrationEvent;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish_raw(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!("Sent message to {}/{}: partition {} offset {}", topic, key, delivery.partition, delivery.offset);
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl BookingEventSink for EventProducer {
    async fn publish(&self, event: &IntegrationEvent) -> Result<(), StoreError> {
        let payload = serde_json::to_string(event).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.publish_raw(event.topic(), &event.key().to_string(), &payload)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
