//! Transport trait - the only way agents and the coordinator talk

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::messages::{DecodeError, GameMessage, Topic};

/// Errors raised by a transport
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Bus channel closed")]
    Closed,

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A raw payload delivered to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: Topic,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn decode(&self) -> Result<GameMessage, DecodeError> {
        GameMessage::decode(self.topic, &self.payload)
    }
}

/// Receiving end of a subscription to one or more topics
///
/// Dropping the subscription unsubscribes it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topics: Vec<Topic>,
    rx: mpsc::Receiver<Delivery>,
}

impl Subscription {
    pub fn new(id: u64, topics: Vec<Topic>, rx: mpsc::Receiver<Delivery>) -> Self {
        debug!(id, ?topics, "Subscription::new: called");
        Self { id, topics, rx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Wait for the next delivery; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Take a delivery if one is queued
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }
}

/// Named-topic broadcast with at-most-once delivery
#[async_trait]
pub trait Transport: Send + Sync {
    /// Broadcast an encoded payload to every subscriber of `topic`
    async fn publish_raw(&self, topic: Topic, payload: Vec<u8>) -> Result<(), BusError>;

    /// Register interest in `topics`; deliveries published after this returns are received
    async fn subscribe(&self, topics: &[Topic]) -> Result<Subscription, BusError>;

    /// Encode and broadcast a message on its own topic
    async fn publish(&self, msg: &GameMessage) -> Result<(), BusError> {
        let payload = msg.encode()?;
        self.publish_raw(msg.topic(), payload).await
    }
}
