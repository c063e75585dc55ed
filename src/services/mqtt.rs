//! MQTT client handler for the control point.
//!
//! Subscribes to command topics and publishes status updates:
//!
//! **Subscribe Topics:**
//! - `cp/turnout/set` - Move a crossover `{"turnout": "east_crossover", "normal": false}`
//! - `cp/route/set` - Set or clear a route `{"entrance": "main1_eastbound", "set": true}`,
//!   or just the entrance name as plain text to set it
//!
//! **Publish Topics:**
//! - `cp/status` - Status JSON (on change + heartbeat)
//! - `cp/timelock` - Timelock state name (retained, on change)
//!
//! Commands are queued exactly like bus commands and applied at the next
//! control cycle, so a status change shows up on the following poll rather
//! than in response to the message itself.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::config::MqttConfig as SharedMqttConfig;
use crate::traits::OutputLatch;
use crate::{CommandSource, ControlPoint, Entrance, RemoteCommand};

use super::api::{CodeRouteRequest, SetTurnoutRequest, StatusResponse};
use super::shared::SharedControlPoint;

/// How often the handler looks for status changes to publish.
const CHANGE_POLL_MS: u64 = 100;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// This struct uses `String` for runtime compatibility with the `rumqttc` library.
/// For embedded/no-alloc contexts, use [`crate::config::MqttConfig`] which uses
/// fixed-size `ShortString` types and convert with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Topic prefix (default: "cp")
    pub topic_prefix: String,
    /// Username and password, if the broker needs them
    pub credentials: Option<(String, String)>,
    /// Heartbeat interval in milliseconds
    pub heartbeat_ms: u64,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "cp-interlock".to_string(),
            topic_prefix: "cp".to_string(),
            credentials: None,
            heartbeat_ms: 5000,
            keep_alive_secs: 30,
        }
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &SharedMqttConfig) -> Self {
        let credentials = config.has_auth().then(|| {
            (
                config.username.as_str().to_string(),
                config.password.as_str().to_string(),
            )
        });
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            client_id: config.client_id.as_str().to_string(),
            topic_prefix: config.topic_prefix.as_str().to_string(),
            credentials,
            heartbeat_ms: config.heartbeat_ms as u64,
            keep_alive_secs: config.keep_alive_secs,
        }
    }

    /// Set the client ID
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the topic prefix
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Set the heartbeat interval
    pub fn heartbeat_ms(mut self, ms: u64) -> Self {
        self.heartbeat_ms = ms;
        self
    }

    fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.topic_prefix, suffix)
    }
}

// ============================================================================
// MQTT Handler
// ============================================================================

/// MQTT handler that bridges MQTT messages to the control point
pub struct MqttHandler<O: OutputLatch + Send + 'static> {
    state: Arc<SharedControlPoint<O>>,
    config: MqttRuntimeConfig,
}

impl<O: OutputLatch + Send + 'static> MqttHandler<O> {
    /// Create a new MQTT handler with its own state.
    ///
    /// A control loop still has to cycle the control point; get at it
    /// through [`state`](Self::state).
    pub fn new(control_point: ControlPoint<O>, config: MqttRuntimeConfig) -> Self {
        Self {
            state: Arc::new(SharedControlPoint::new(control_point)),
            config,
        }
    }

    /// Create a new MQTT handler with shared state.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let state = Arc::new(SharedControlPoint::new(control_point));
    ///
    /// // Web and MQTT share the same state
    /// let web_router = build_router(Arc::clone(&state), &web_config);
    /// let mqtt_handler = MqttHandler::with_shared_state(Arc::clone(&state), mqtt_config);
    /// ```
    pub fn with_shared_state(state: Arc<SharedControlPoint<O>>, config: MqttRuntimeConfig) -> Self {
        Self { state, config }
    }

    /// Get a reference to the shared state.
    pub fn state(&self) -> Arc<SharedControlPoint<O>> {
        Arc::clone(&self.state)
    }

    /// Run the MQTT handler
    ///
    /// This function blocks and handles MQTT messages until shutdown.
    pub async fn run(self) -> Result<(), MqttError> {
        let mut options =
            MqttOptions::new(&self.config.client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs as u64));
        if let Some((username, password)) = &self.config.credentials {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        let topics = [self.config.topic("turnout/set"), self.config.topic("route/set")];

        for topic in &topics {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| MqttError::Subscribe(e.to_string()))?;
        }

        log::info!(
            "MQTT connected to {}:{}",
            self.config.host,
            self.config.port
        );
        log::info!("Subscribed to: {:?}", topics);

        let (tx, mut rx) = mpsc::channel::<StatusUpdate>(32);

        // Change detection and heartbeat
        let poll_tx = tx.clone();
        let heartbeat_interval = self.config.heartbeat_ms;
        let state_for_poll = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut changes = tokio::time::interval(Duration::from_millis(CHANGE_POLL_MS));
            let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_interval));
            loop {
                let update = tokio::select! {
                    _ = changes.tick() => match state_for_poll.check_changes() {
                        Some(status) => StatusUpdate::Changed(StatusResponse::from(&status)),
                        None => continue,
                    },
                    _ = heartbeat.tick() => {
                        StatusUpdate::Heartbeat(StatusResponse::from(&state_for_poll.status()))
                    }
                };
                if poll_tx.send(update).await.is_err() {
                    break;
                }
            }
        });

        // Publisher
        let client_for_publish = client.clone();
        let config_for_publish = self.config.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let status_json = serde_json::to_string(update.status()).unwrap_or_default();

                let status_topic = config_for_publish.topic("status");
                if let Err(e) = publish(&client_for_publish, status_topic, false, status_json.as_bytes()).await {
                    log::warn!("{}", e);
                }

                if let StatusUpdate::Changed(s) = &update {
                    let timelock_topic = config_for_publish.topic("timelock");
                    let timelock = s.status.timelock.as_str().as_bytes();
                    if let Err(e) = publish(&client_for_publish, timelock_topic, true, timelock).await {
                        log::warn!("{}", e);
                    }
                }
            }
        });

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    self.handle_message(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("{}", MqttError::Connect(e.to_string()));
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    /// Decode a command message and queue it. Returns `true` if a command
    /// was queued.
    fn handle_message(&self, topic: &str, payload: &[u8]) -> bool {
        let suffix = topic
            .strip_prefix(&self.config.topic_prefix)
            .map(|s| s.trim_start_matches('/'))
            .unwrap_or(topic);

        let cmd: Option<RemoteCommand> = match suffix {
            "turnout/set" => serde_json::from_slice::<SetTurnoutRequest>(payload)
                .ok()
                .map(Into::into),
            "route/set" => {
                // Accept either JSON or a bare entrance name
                if let Ok(req) = serde_json::from_slice::<CodeRouteRequest>(payload) {
                    Some(req.into())
                } else if let Ok(text) = std::str::from_utf8(payload) {
                    Entrance::from_name(text.trim()).map(|e| CodeRouteRequest::set(e).into())
                } else {
                    None
                }
            }
            _ => return false,
        };

        let Some(cmd) = cmd else {
            log::warn!("ignoring malformed payload on {}", topic);
            return false;
        };

        let queued = self.state.submit(cmd, CommandSource::Mqtt);
        if !queued {
            log::warn!("command queue full, dropped MQTT command {:?}", cmd);
        }
        queued
    }
}

enum StatusUpdate {
    Changed(StatusResponse),
    Heartbeat(StatusResponse),
}

async fn publish(client: &AsyncClient, topic: String, retain: bool, payload: &[u8]) -> Result<(), MqttError> {
    client
        .publish(topic.as_str(), QoS::AtLeastOnce, retain, payload)
        .await
        .map_err(|e| MqttError::Publish(format!("{}: {}", topic, e)))
}

impl StatusUpdate {
    fn status(&self) -> &StatusResponse {
        match self {
            StatusUpdate::Changed(s) | StatusUpdate::Heartbeat(s) => s,
        }
    }
}

/// MQTT-related errors
#[derive(Debug)]
pub enum MqttError {
    /// Failed to connect to broker
    Connect(String),
    /// Failed to subscribe to topic
    Subscribe(String),
    /// Failed to publish message
    Publish(String),
}

impl std::fmt::Display for MqttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "MQTT connect error: {}", e),
            Self::Subscribe(e) => write!(f, "MQTT subscribe error: {}", e),
            Self::Publish(e) => write!(f, "MQTT publish error: {}", e),
        }
    }
}

impl std::error::Error for MqttError {}
