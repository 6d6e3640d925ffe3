pub mod api;
pub mod config;
pub mod mqtt;
pub mod store;
pub mod telemetry;

use std::sync::Arc;

use color_eyre::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::BridgeConfig;
use crate::store::LatestStore;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = BridgeConfig::load()?;
    info!(
        "Starting plantbridge: broker {}:{}, topic `{}`, listening on port {}",
        config.broker_host, config.broker_port, config.topic, config.listen_port
    );

    // The store is the only state shared between the two halves of the bridge.
    let store = Arc::new(LatestStore::new());

    let mqtt_config = config.mqtt();
    let subscriber_store = store.clone();
    let _subscription = tokio::spawn(async move {
        mqtt::run_subscription(mqtt_config, subscriber_store).await;
    });

    api::serve(config.listen_port, store).await?;

    info!("Shutdown complete");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
