// Copyright 2025 IoT Open.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! MQTT session used for publishing telemetry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, log, warn, Level};
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, Incoming, MqttOptions, Outgoing, QoS,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::API_KEY_USER;
use crate::config::LynxClientConfig;
use crate::error::PlatformError;
use crate::models::Message;

/// Pending requests the event loop buffers. Nothing drains it while the
/// session is reconnecting, so requests beyond this are dropped.
const REQUEST_CAPACITY: usize = 10;

/// How long `disconnect` waits for the DISCONNECT packet to go out.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Pause before polling again after an event loop error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub(crate) struct Broker {
    client: AsyncClient,
    /// Held here until the first successful connect hands it to the driver.
    eventloop: Mutex<Option<EventLoop>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    connected: AtomicBool,
    shutdown: CancellationToken,
    client_id: String,
    connect_timeout: Duration,
    log_connection: bool,
}

impl Broker {
    pub(crate) fn new(config: &LynxClientConfig) -> Self {
        let mut mqtt_opts = MqttOptions::new(
            &config.client_id,
            &config.broker.host,
            config.broker.port,
        );
        mqtt_opts.set_keep_alive(config.keep_alive);
        mqtt_opts.set_clean_session(true);
        mqtt_opts.set_credentials(API_KEY_USER, &config.api_key);

        let (client, eventloop) = AsyncClient::new(mqtt_opts, REQUEST_CAPACITY);

        Self {
            client,
            eventloop: Mutex::new(Some(eventloop)),
            driver: Mutex::new(None),
            connected: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            client_id: config.client_id.clone(),
            connect_timeout: config.connect_timeout,
            log_connection: config.log_connection,
        }
    }

    /// Make one connect attempt. On success the session is handed to a
    /// background driver that keeps it alive; later calls are no-ops.
    pub(crate) async fn connect(&self) -> Result<(), PlatformError> {
        let mut slot = self.eventloop.lock().await;
        let Some(eventloop) = slot.as_mut() else {
            return Ok(());
        };

        match tokio::time::timeout(self.connect_timeout, wait_for_connack(eventloop)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(PlatformError::ConnectTimeout(self.connect_timeout)),
        }

        if let Some(eventloop) = slot.take() {
            log!(
                self.level(),
                "[{}] Connected to MQTT broker",
                self.client_id
            );
            let handle = tokio::spawn(drive(
                eventloop,
                self.shutdown.clone(),
                self.client_id.clone(),
                self.level(),
            ));
            *self.driver.lock().await = Some(handle);
            self.connected.store(true, Ordering::Release);
        }
        Ok(())
    }

    pub(crate) async fn publish(
        &self,
        topic: &str,
        message: &Message,
        qos: QoS,
    ) -> Result<(), PlatformError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(PlatformError::NotConnected);
        }
        let payload = message.to_payload()?;
        // Never wait on a full queue: the reading is dropped instead.
        self.client.try_publish(topic, qos, false, payload)?;
        Ok(())
    }

    /// Send DISCONNECT and stop the driver.
    pub(crate) async fn disconnect(&self) -> Result<(), PlatformError> {
        let Some(mut driver) = self.driver.lock().await.take() else {
            return Ok(());
        };
        self.connected.store(false, Ordering::Release);

        let result = self.client.try_disconnect().map_err(PlatformError::from);
        if tokio::time::timeout(DISCONNECT_GRACE, &mut driver).await.is_err() {
            self.shutdown.cancel();
            let _ = driver.await;
        }
        info!("[{}] MQTT session closed", self.client_id);
        result
    }

    fn level(&self) -> Level {
        if self.log_connection {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Incoming::ConnAck(_)) = eventloop.poll().await? {
            return Ok(());
        }
    }
}

/// Poll the event loop until shutdown or an outgoing DISCONNECT.
/// rumqttc reconnects on the next `poll()` after an error.
async fn drive(
    mut eventloop: EventLoop,
    shutdown: CancellationToken,
    client_id: String,
    level: Level,
) {
    debug!("[{client_id}] MQTT eventloop driver started");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = eventloop.poll() => {
                match event {
                    Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                        log!(level, "[{client_id}] Reconnected to MQTT broker ({:?})", ack.code);
                    }
                    Ok(Event::Incoming(Incoming::Disconnect)) => {
                        log!(level, "[{client_id}] Broker closed the session");
                    }
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("[{client_id}] MQTT eventloop error (will reconnect): {e}");
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                        }
                    }
                }
            }
        }
    }
    debug!("[{client_id}] MQTT eventloop driver stopped");
}
