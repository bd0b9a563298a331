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

mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use lynx_client::{LynxClient, PlatformClient};
use lynx_telemetry::{Registrar, RetryPolicy, TelemetryLoop, TopicScheme};

use crate::settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    info!("Starting lynx-manager...");

    let path = settings::config_path();
    let settings = Settings::load(&path).context("Config")?;
    let installation_id = settings.lynx.installation_id;

    let client: Arc<dyn PlatformClient> =
        Arc::new(LynxClient::new(settings.client_config().context("Config")?)?);

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone()).context("Failed to install signal handlers")?;

    // Blocks until the broker accepts us, unless a signal arrives first.
    let retry = RetryPolicy::default();
    tokio::select! {
        result = retry.run("MQTT connect", || client.connect()) => {
            result.context("MQTT connect")?;
        }
        _ = shutdown.cancelled() => {
            info!("Shutdown requested before the broker connection was established");
            return Ok(());
        }
    }

    let registration = Registrar::new(client.as_ref(), settings.registration_config())
        .register()
        .await?;
    info!(
        "Registered device {} with function {} in installation {installation_id}",
        registration.device.id, registration.function.id
    );

    let scheme =
        TopicScheme::resolve(client.as_ref(), installation_id, settings.lynx.namespaced_topics)
            .await?;
    let topic = scheme.topic_for(&registration.function)?;

    let telemetry = TelemetryLoop::new(client.clone(), topic)
        .interval(settings.interval())
        .spawn(shutdown.clone());

    // Keep running until signal
    shutdown.cancelled().await;

    let report = telemetry.await.context("Telemetry loop")?;
    info!(
        "Published {} of {} readings before shutdown",
        report.published, report.ticks
    );

    if let Err(e) = client.disconnect().await {
        warn!("Failed to disconnect from MQTT broker: {e}");
    }
    Ok(())
}

/// Cancel `shutdown` on SIGINT, or SIGTERM on Unix. Fails if the handlers
/// cannot be installed.
fn spawn_signal_listener(shutdown: CancellationToken) -> std::io::Result<()> {
    let mut signals = ShutdownSignals::install()?;
    tokio::spawn(async move {
        signals.recv().await;
        info!("Shutdown signal received");
        shutdown.cancel();
    });
    Ok(())
}

#[cfg(unix)]
struct ShutdownSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct ShutdownSignals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) {
        self.ctrl_c.recv().await;
    }
}
