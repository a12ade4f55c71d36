//! MQTT subscriber and message dispatch.
//!
//! Owns the transport session: connects with rumqttc, re-subscribes to the
//! wildcard filter on every `ConnAck` (the library reconnects on its own),
//! and routes each inbound publish through parse → decode → ingestion.
//! Every per-message failure is logged and the message dropped; nothing in
//! here is fatal to the session.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use skywatch_core::config::MqttConfig;

use crate::error::{Error, Result};
use crate::ingestion::IngestionService;
use crate::message::{decode_message, MqttMessage};
use crate::topic::{parse_topic, SUBSCRIBE_FILTER};

/// Delay before re-polling after a transport error, so a dead broker does
/// not spin the loop.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Grace period for flushing the disconnect packet on shutdown.
const DISCONNECT_GRACE: Duration = Duration::from_millis(250);

/// MQTT ingestion worker.
pub struct MqttWorker {
    config: MqttConfig,
    service: Arc<IngestionService>,
}

/// Handle to a started worker's session task.
pub struct MqttWorkerHandle {
    client: AsyncClient,
    task: JoinHandle<()>,
}

impl MqttWorkerHandle {
    /// Disconnect from the broker and wait for the session task to finish.
    pub async fn stop(self) {
        if let Err(e) = self.client.disconnect().await {
            warn!("MQTT disconnect failed: {}", e);
        }
        // Give the event loop a bounded grace period to flush the
        // disconnect before the task is dropped with the runtime.
        let _ = tokio::time::timeout(DISCONNECT_GRACE, self.task).await;
        info!("Disconnected from MQTT broker");
    }
}

impl MqttWorker {
    pub fn new(config: MqttConfig, service: Arc<IngestionService>) -> Self {
        Self { config, service }
    }

    /// Connect and spawn the session task.
    ///
    /// The task exits when `shutdown` flips to true or the channel closes.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> Result<MqttWorkerHandle> {
        let client_id = self
            .config
            .client_id
            .clone()
            .unwrap_or_else(|| format!("skywatch_worker_{}", Uuid::new_v4()));

        let mut options = MqttOptions::new(client_id, &self.config.broker, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive));
        if let (Some(u), Some(p)) = (&self.config.username, &self.config.password) {
            options.set_credentials(u, p);
        }

        info!(
            broker = %self.config.broker,
            port = self.config.port,
            "Connecting to MQTT broker"
        );

        let (client, eventloop) = AsyncClient::new(options, 10);
        let task = tokio::spawn(run_session(
            client.clone(),
            eventloop,
            self.service,
            shutdown,
        ));

        Ok(MqttWorkerHandle { client, task })
    }
}

/// Session loop: poll the event loop until shutdown.
async fn run_session(
    client: AsyncClient,
    mut eventloop: EventLoop,
    service: Arc<IngestionService>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // New session (initial connect or reconnect): the
                    // subscription does not survive, so re-issue it.
                    info!("Connected to MQTT broker");
                    subscribe(&client).await;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    handle_publish(&service, &publish).await;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Lost connection to MQTT broker: {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
    debug!("MQTT session task stopped");
}

/// Subscribe to the wildcard filter; failure is logged and retried on the
/// next reconnect.
async fn subscribe(client: &AsyncClient) {
    match client.subscribe(SUBSCRIBE_FILTER, QoS::AtLeastOnce).await {
        Ok(()) => info!(topic = SUBSCRIBE_FILTER, "Subscribed to topic"),
        Err(e) => error!(topic = SUBSCRIBE_FILTER, "Failed to subscribe: {}", e),
    }
}

/// Route one inbound publish through the pipeline.
async fn handle_publish(service: &IngestionService, publish: &Publish) {
    let topic = publish.topic.as_str();

    let parsed = match parse_topic(topic) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(topic, "Received message on unhandled topic: {}", e);
            return;
        }
    };

    let message = match decode_message(&publish.payload, &parsed.action) {
        Ok(message) => message,
        Err(Error::UnsupportedAction(action)) => {
            // Expected traffic on actions this worker does not consume.
            debug!(action, "Unhandled action");
            return;
        }
        Err(e) => {
            error!(topic, "Failed to decode message: {}", e);
            return;
        }
    };

    match message {
        MqttMessage::Reading(reading) => {
            let input = reading.into_input(&parsed);
            if let Err(e) = service.handle_reading(input).await {
                error!(sensor_id = parsed.sensor_id, "Failed to process reading: {}", e);
            }
        }
        MqttMessage::Batch(batch) => {
            // Per-item isolation: one bad reading never blocks the rest.
            for reading in batch.readings {
                let input = reading.into_batch_input(&parsed);
                let sensor_id = input.sensor_id;
                if let Err(e) = service.handle_reading(input).await {
                    error!(sensor_id, "Failed to process batch reading: {}", e);
                }
            }
        }
        MqttMessage::CommandResponse(response) => {
            info!(
                sensor_id = parsed.sensor_id,
                command_id = response.command_id,
                status = %response.status,
                "Received command response"
            );
        }
    }
}
