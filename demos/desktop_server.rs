//! Desktop server example for exercising the web API and MQTT integration.
//!
//! This example runs a control point against mock I/O, allowing you to:
//! - Query `/api/status` and `/api/state` at http://localhost:8080
//! - Queue turnout moves and routes with POST `/api/turnout` and `/api/route`
//! - Optionally connect to an MQTT broker
//!
//! The mock field follows the turnout outputs, so a commanded crossover
//! "moves" on the next cycle and routes across it can then be coded.
//!
//! # Usage
//!
//! Web server only:
//! ```sh
//! RUST_LOG=info cargo run --example desktop_server --features web
//! ```
//!
//! Web server + MQTT:
//! ```sh
//! RUST_LOG=info cargo run --example desktop_server --features web,mqtt
//! ```
//!
//! Then, for example:
//! ```sh
//! curl -X POST localhost:8080/api/route -d '{"entrance": "main1_eastbound"}'
//! curl localhost:8080/api/state
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cp_interlock::hal::{MockIo, MockLatch};
use cp_interlock::services::{run_server_with_state, SharedControlPoint, WebServerConfig};
use cp_interlock::{Config, ControlPoint, TickClock};

#[cfg(feature = "mqtt")]
use cp_interlock::services::{MqttHandler, MqttRuntimeConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let rt = tokio::runtime::Runtime::new().context("failed to create runtime")?;

    rt.block_on(async {
        // Central configuration - modify this for your setup
        let config = Config::default();
        // Example of customization:
        // let config = Config::default()
        //     .with_control_point(cp_interlock::ControlPointConfig::default()
        //         .with_unlock_delay_secs(10)
        //         .with_bus_address(0x05))
        //     .with_web(cp_interlock::WebConfig::default()
        //         .with_port(3000));

        log::info!("{} ({})", config.device.name, config.device.id);

        let control_point = ControlPoint::new(config.control_point.clone(), &config.bindings, MockLatch::new());
        let state = Arc::new(SharedControlPoint::new(control_point));

        spawn_control_loop(Arc::clone(&state));

        let web_config = WebServerConfig::from_config(&config.web);
        log::info!("API: http://{}/api/state", web_config.addr);

        #[cfg(feature = "mqtt")]
        {
            let mqtt_config = MqttRuntimeConfig::from_config(&config.mqtt);
            log::info!(
                "MQTT: {}:{} prefix {}",
                mqtt_config.host,
                mqtt_config.port,
                mqtt_config.topic_prefix
            );
            let handler = MqttHandler::with_shared_state(Arc::clone(&state), mqtt_config);
            tokio::spawn(async move {
                if let Err(e) = handler.run().await {
                    log::error!("{}", e);
                }
            });
        }

        run_server_with_state(state, web_config)
            .await
            .context("web server failed")
    })
}

/// Spawn the single 10 Hz control loop.
///
/// Each pass runs one interlocking cycle against the mock field, then lets
/// the field follow the turnout outputs that were just latched.
fn spawn_control_loop(state: Arc<SharedControlPoint<MockLatch>>) {
    tokio::spawn(async move {
        let mut io = MockIo::field_at_rest();
        let mut clock = TickClock::new();
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        loop {
            interval.tick().await;
            let events = clock.decisecond();
            state.with_control_point(|cp| {
                if cp.cycle(&io, events).is_err() {
                    log::error!("output latch failed");
                }
                io.follow_turnout_outputs(cp.output_frame());
                while let Some(pkt) = cp.poll_reply_packet() {
                    log::debug!("reply packet {:02x?}", pkt);
                }
                if let Some(pkt) = cp.poll_status_packet() {
                    log::debug!("status packet {:02x?}", pkt);
                }
            });
        }
    });
}
