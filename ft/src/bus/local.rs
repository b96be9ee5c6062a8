//! LocalBus - in-process broker task fanning payloads out to subscribers
//!
//! The broker owns the topic → subscriber registry and processes requests
//! from a single channel, so deliveries from one publisher keep their order.
//! Nothing orders deliveries across publishers.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::config::BusConfig;
use super::messages::Topic;
use super::transport::{BusError, Delivery, Subscription, Transport};

/// Internal requests to the broker task
#[derive(Debug)]
enum BusRequest {
    Subscribe {
        topics: Vec<Topic>,
        reply_tx: oneshot::Sender<Subscription>,
    },
    Publish {
        topic: Topic,
        payload: Vec<u8>,
    },
    GetMetrics {
        reply_tx: oneshot::Sender<BusMetrics>,
    },
    Shutdown,
}

/// Broker counters for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct BusMetrics {
    pub subscribers: usize,
    pub published: u64,
    pub delivered: u64,
    /// Deliveries lost because a subscriber inbox was full
    pub dropped_full: u64,
    /// Deliveries discarded by loss injection
    pub dropped_lossy: u64,
}

/// Cloneable handle to the broker task
#[derive(Clone)]
pub struct LocalBus {
    tx: mpsc::Sender<BusRequest>,
}

impl LocalBus {
    /// Spawn the broker task on the current runtime
    pub fn spawn(config: BusConfig, seed: Option<u64>) -> Self {
        debug!(?config, ?seed, "LocalBus::spawn: called");
        let (tx, rx) = mpsc::channel(config.channel_buffer);
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let broker = Broker {
            config,
            rx,
            registry: HashMap::new(),
            subscriptions: HashMap::new(),
            next_id: 0,
            rng,
            metrics: BusMetrics::default(),
        };
        tokio::spawn(broker.run());
        Self { tx }
    }

    /// Current broker counters
    pub async fn metrics(&self) -> Result<BusMetrics, BusError> {
        debug!("LocalBus::metrics: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BusRequest::GetMetrics { reply_tx })
            .await
            .map_err(|_| BusError::Closed)?;
        reply_rx.await.map_err(|_| BusError::Closed)
    }

    /// Stop the broker; open subscriptions then yield `None`
    pub async fn shutdown(&self) -> Result<(), BusError> {
        debug!("LocalBus::shutdown: called");
        self.tx.send(BusRequest::Shutdown).await.map_err(|_| BusError::Closed)
    }
}

#[async_trait]
impl Transport for LocalBus {
    async fn publish_raw(&self, topic: Topic, payload: Vec<u8>) -> Result<(), BusError> {
        debug!(%topic, bytes = payload.len(), "LocalBus::publish_raw: called");
        self.tx
            .send(BusRequest::Publish { topic, payload })
            .await
            .map_err(|_| BusError::Closed)
    }

    async fn subscribe(&self, topics: &[Topic]) -> Result<Subscription, BusError> {
        debug!(?topics, "LocalBus::subscribe: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(BusRequest::Subscribe {
                topics: topics.to_vec(),
                reply_tx,
            })
            .await
            .map_err(|_| BusError::Closed)?;
        reply_rx.await.map_err(|_| BusError::Closed)
    }
}

struct Broker {
    config: BusConfig,
    rx: mpsc::Receiver<BusRequest>,
    registry: HashMap<u64, mpsc::Sender<Delivery>>,
    subscriptions: HashMap<Topic, BTreeSet<u64>>,
    next_id: u64,
    rng: StdRng,
    metrics: BusMetrics,
}

impl Broker {
    async fn run(mut self) {
        info!(drop_rate = self.config.drop_rate, "Bus broker started");

        while let Some(req) = self.rx.recv().await {
            match req {
                BusRequest::Subscribe { topics, reply_tx } => {
                    let subscription = self.register(topics);
                    if reply_tx.send(subscription).is_err() {
                        debug!("Broker: subscriber went away before acknowledgement");
                    }
                }
                BusRequest::Publish { topic, payload } => {
                    self.fan_out(topic, payload);
                }
                BusRequest::GetMetrics { reply_tx } => {
                    self.metrics.subscribers = self.registry.len();
                    let _ = reply_tx.send(self.metrics.clone());
                }
                BusRequest::Shutdown => {
                    info!("Bus broker shutting down");
                    break;
                }
            }
        }

        debug!(?self.metrics, "Broker::run: exiting");
    }

    fn register(&mut self, topics: Vec<Topic>) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(self.config.inbox_buffer);
        for topic in &topics {
            self.subscriptions.entry(*topic).or_default().insert(id);
        }
        self.registry.insert(id, tx);
        debug!(id, ?topics, "Broker: registered subscriber");
        Subscription::new(id, topics, rx)
    }

    fn unregister(&mut self, id: u64) {
        debug!(id, "Broker: removing closed subscriber");
        self.registry.remove(&id);
        for subscribers in self.subscriptions.values_mut() {
            subscribers.remove(&id);
        }
    }

    fn fan_out(&mut self, topic: Topic, payload: Vec<u8>) {
        self.metrics.published += 1;
        let Some(subscribers) = self.subscriptions.get(&topic) else {
            debug!(%topic, "Broker: no subscribers");
            return;
        };

        let mut closed = Vec::new();
        for id in subscribers {
            if self.config.is_lossy() && self.rng.random_bool(self.config.drop_rate.min(1.0)) {
                debug!(%topic, id, "Broker: delivery discarded by loss injection");
                self.metrics.dropped_lossy += 1;
                continue;
            }
            let Some(tx) = self.registry.get(id) else {
                continue;
            };
            let delivery = Delivery {
                topic,
                payload: payload.clone(),
            };
            match tx.try_send(delivery) {
                Ok(()) => self.metrics.delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%topic, id, "Subscriber inbox full, dropping delivery");
                    self.metrics.dropped_full += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            self.unregister(id);
        }
    }
}
