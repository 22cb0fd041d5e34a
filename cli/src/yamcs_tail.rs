//! Subscribes to every parameter of a Yamcs instance and prints live
//! updates until interrupted.

use anyhow::Result;
use lib_yamcs::model::TelemetryValue;
use lib_yamcs::{config, YamcsPlugin};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    lib_yamcs::logger::setup_logging(config.log_dir.as_deref(), config.log_level())?;

    let plugin = YamcsPlugin::new(&config)?;
    let children = plugin.objects.enumerate().await?;
    log::info!("Tailing {} parameters from `{}`", children.len(), config.instance());

    let mut subscriptions = Vec::with_capacity(children.len());
    for child in &children {
        let subscription = plugin
            .live
            .subscribe(
                child,
                Arc::new(|point| {
                    let value = match &point.value {
                        Some(TelemetryValue::Uint32(v)) => v.to_string(),
                        Some(TelemetryValue::Sint64(v)) => v.to_string(),
                        Some(TelemetryValue::Float(v)) => format!("{v:.3}"),
                        Some(TelemetryValue::Text(v)) => v.clone(),
                        None => "(tick)".to_string(),
                    };
                    println!(
                        "{:<30} {:<26} {}",
                        point.id,
                        point.timestamp.as_deref().unwrap_or("-"),
                        value
                    );
                }),
            )
            .await?;
        subscriptions.push(subscription);
    }

    signal::ctrl_c().await?;
    log::info!("Ctrl-C received, shutting down.");
    for subscription in &subscriptions {
        subscription.cancel();
    }
    plugin.shutdown();
    Ok(())
}
