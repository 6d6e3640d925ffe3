use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use statum::{machine, state};
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::config::MqttConfig;
use crate::store::LatestStore;
use crate::telemetry::{self, DecodeError};

const KEEP_ALIVE: Duration = Duration::from_secs(5);
const BACKOFF_MIN: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

// Subscriber errors
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("transport error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    #[error("broker rejected connection: {0}")]
    Rejected(String),

    #[error("subscribe request failed: {0}")]
    Subscribe(#[from] rumqttc::ClientError),
}

/// Running counters for one connection, logged when the connection ends.
#[derive(Clone, Debug, Default)]
pub struct SubscriberStats {
    pub messages_received: usize,
    pub decode_failures: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

// Define connection states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

#[machine]
pub struct MqttSubscriber<S: ConnectionState> {
    config: MqttConfig,
    store: Arc<LatestStore>,
    client: AsyncClient,
    eventloop: EventLoop,
    stats: SubscriberStats,
}

// Implementation of methods available in all states
impl<S: ConnectionState> MqttSubscriber<S> {
    async fn handle_publish(&mut self, publish: Publish) {
        self.stats.last_activity = Some(chrono::Local::now());
        match ingest(&self.store, &publish.payload).await {
            Ok(version) => {
                self.stats.messages_received += 1;
                debug!("Stored reading from `{}` as version {}", publish.topic, version);
            }
            Err(e) => {
                self.stats.decode_failures += 1;
                warn!("Dropping message on `{}`: {}", publish.topic, e);
            }
        }
    }
}

// Implementation for Disconnected state
impl MqttSubscriber<Disconnected> {
    /// Builds a fresh client and event loop; no network activity yet.
    pub fn create(config: MqttConfig, store: Arc<LatestStore>) -> Self {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(KEEP_ALIVE);

        let (client, eventloop) = AsyncClient::new(options, 100);

        Self::new(config, store, client, eventloop, SubscriberStats::default())
    }

    pub fn connect(self) -> MqttSubscriber<Connecting> {
        info!(
            "Connecting to MQTT broker {}:{}",
            self.config.broker_host, self.config.broker_port
        );
        self.transition()
    }
}

// Implementation for Connecting state
impl MqttSubscriber<Connecting> {
    /// Drives the event loop until the broker acknowledges the connection.
    pub async fn establish(mut self) -> Result<MqttSubscriber<Connected>, SubscriberError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("Connected to MQTT broker");
                        return Ok(self.transition());
                    }
                    return Err(SubscriberError::Rejected(format!("{:?}", ack.code)));
                }
                Ok(event) => debug!("Event before connack: {:?}", event),
                Err(e) => return Err(SubscriberError::Connection(e)),
            }
        }
    }
}

// Implementation for Connected state
impl MqttSubscriber<Connected> {
    /// Subscribes to the configured topic and waits for the acknowledgment.
    pub async fn subscribe(mut self) -> Result<MqttSubscriber<Subscribed>, SubscriberError> {
        self.client
            .subscribe(self.config.topic.clone(), QoS::AtMostOnce)
            .await?;

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    info!("Subscribed to topic `{}`", self.config.topic);
                    return Ok(self.transition());
                }
                // Retained messages can arrive before the suback; store them
                // instead of dropping them.
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_publish(publish).await;
                }
                Ok(event) => debug!("Event before suback: {:?}", event),
                Err(e) => return Err(SubscriberError::Connection(e)),
            }
        }
    }
}

// Implementation for Subscribed state
impl MqttSubscriber<Subscribed> {
    /// Pumps inbound messages into the store until the transport drops.
    ///
    /// Decode failures are logged and the message dropped; only a transport
    /// error ends the pump, returning the stats for this connection.
    pub async fn pump(mut self) -> (SubscriberStats, SubscriberError) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_publish(publish).await;
                }
                Ok(event) => trace!("Ignoring event: {:?}", event),
                Err(e) => return (self.stats.clone(), SubscriberError::Connection(e)),
            }
        }
    }
}

/// Decodes one payload and writes the result into the store.
///
/// The store is untouched when decoding fails.
pub(crate) async fn ingest(store: &LatestStore, payload: &[u8]) -> Result<u64, DecodeError> {
    let reading = telemetry::decode(payload)?;
    Ok(store.write(reading).await)
}

pub(crate) fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(BACKOFF_MAX)
}

/// Runs the subscription until the process exits.
///
/// Each pass builds a fresh state machine; connect or subscribe failures and
/// transport drops all land back here, where the next attempt is delayed by an
/// exponential backoff. The backoff resets once a subscription is established.
pub async fn run_subscription(config: MqttConfig, store: Arc<LatestStore>) {
    let mut backoff = BACKOFF_MIN;

    loop {
        let subscriber = MqttSubscriber::create(config.clone(), store.clone());

        match subscriber.connect().establish().await {
            Err(e) => warn!("Connection attempt failed: {}", e),
            Ok(connected) => match connected.subscribe().await {
                Err(e) => warn!("Subscription attempt failed: {}", e),
                Ok(subscribed) => {
                    backoff = BACKOFF_MIN;
                    let (stats, error) = subscribed.pump().await;
                    let last_activity = stats
                        .last_activity
                        .map(|t| t.format("%H:%M:%S").to_string())
                        .unwrap_or_else(|| "never".to_string());
                    warn!(
                        "Connection lost after {} messages ({} decode failures, last activity {}): {}",
                        stats.messages_received, stats.decode_failures, last_activity, error
                    );
                }
            },
        }

        info!("Reconnecting in {:?}", backoff);
        sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Reading;

    #[tokio::test]
    async fn ingest_stores_decoded_reading() {
        let store = LatestStore::new();
        let version = ingest(&store, br#"{"soil": 42, "temperature": 21.5, "humidity": 60}"#)
            .await
            .unwrap();
        assert_eq!(version, 1);
        let (reading, _) = store.read().await;
        assert_eq!(reading, Reading::new(42.0, 21.5, 60.0));
    }

    #[tokio::test]
    async fn ingest_defaults_missing_fields() {
        let store = LatestStore::new();
        ingest(&store, br#"{"soil": 10}"#).await.unwrap();
        let (reading, _) = store.read().await;
        assert_eq!(reading, Reading::new(10.0, 0.0, 0.0));
    }

    #[tokio::test]
    async fn malformed_payload_leaves_store_untouched() {
        let store = LatestStore::new();
        ingest(&store, br#"{"soil": 7}"#).await.unwrap();

        let err = ingest(&store, b"not json at all").await.unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let (reading, version) = store.read().await;
        assert_eq!(reading, Reading::new(7.0, 0.0, 0.0));
        assert_eq!(version, 1);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = BACKOFF_MIN;
        backoff = next_backoff(backoff);
        assert_eq!(backoff, Duration::from_secs(2));
        backoff = next_backoff(backoff);
        assert_eq!(backoff, Duration::from_secs(4));

        for _ in 0..10 {
            backoff = next_backoff(backoff);
        }
        assert_eq!(backoff, BACKOFF_MAX);
        assert_eq!(next_backoff(BACKOFF_MAX), BACKOFF_MAX);
    }
}
