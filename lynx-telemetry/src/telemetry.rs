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

//! Periodic publishing of the synthetic temperature reading.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use lynx_client::{Message, PlatformClient, QoS};

/// One reading per minute.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

const AMPLITUDE: f64 = 20.0;
const TIME_SCALE: f64 = 1000.0;

/// Readings are fire-and-forget.
const TELEMETRY_QOS: QoS = QoS::AtMostOnce;

/// Synthetic temperature at `timestamp` (seconds since the Unix epoch).
///
/// Bounded to `[-20, 20]` with a period of `2π·1000` seconds.
pub fn synthetic_temperature(timestamp: i64) -> f64 {
    (timestamp as f64 / TIME_SCALE).sin() * AMPLITUDE
}

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Counters returned when the loop stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    pub ticks: u64,
    pub published: u64,
    pub failed: u64,
}

/// Publishes one reading per interval until cancelled.
///
/// Publishes never overlap. A failed publish is logged and its value dropped;
/// the next tick goes ahead regardless.
pub struct TelemetryLoop {
    client: Arc<dyn PlatformClient>,
    topic: String,
    interval: Duration,
    clock: fn() -> i64,
}

impl TelemetryLoop {
    pub fn new(client: Arc<dyn PlatformClient>, topic: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
            interval: DEFAULT_INTERVAL,
            clock: unix_now,
        }
    }

    /// # Panics
    ///
    /// [`run`](Self::run) panics if `interval` is zero.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Source of message timestamps.
    pub fn clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<LoopReport> {
        tokio::spawn(self.run(shutdown))
    }

    /// Run until `shutdown` is cancelled. The first reading goes out one
    /// full interval after the call.
    pub async fn run(self, shutdown: CancellationToken) -> LoopReport {
        let topic = self.topic.as_str();
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut report = LoopReport::default();
        info!(
            "[{topic}] Telemetry loop started (interval={:?})",
            self.interval
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("[{topic}] Shutdown signal received");
                    break;
                }
                _ = ticker.tick() => {
                    report.ticks += 1;
                    let timestamp = (self.clock)();
                    let message = Message::new(synthetic_temperature(timestamp), timestamp);

                    match self.client.publish(topic, &message, TELEMETRY_QOS).await {
                        Ok(()) => {
                            report.published += 1;
                            debug!("[{topic}] Published {:.3} @ {timestamp}", message.value);
                        }
                        Err(e) => {
                            report.failed += 1;
                            error!("[{topic}] Failed to publish on MQTT: {e}");
                        }
                    }
                }
            }
        }

        info!(
            "[{topic}] Telemetry loop stopped ({} ticks, {} published, {} failed)",
            report.ticks, report.published, report.failed
        );
        report
    }
}
