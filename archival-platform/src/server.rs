use std::sync::Arc;

use colored::Colorize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::infrastructure::{config::build_config, telemetry, ServiceProvider};

pub async fn run() {
    let config = match build_config() {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build config".red(), e);
        }
    };

    let service_provider = match ServiceProvider::build(config).await {
        Ok(x) => Arc::new(x),
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build Service Provider".red(), e);
        }
    };
    if let Err(e) = telemetry::initialize_telemetry(&service_provider.config.telemetry) {
        return eprintln!("{}: {}", "Cannot build logger".red(), e);
    };
    info!(
        "Serving {} storage locations.",
        service_provider.config.storages.len()
    );

    let handles = service_provider
        .background_services()
        .into_iter()
        .map(|x| {
            tokio::spawn(async move {
                let task = x.clone();
                task.run().await
            })
        })
        .collect::<Vec<JoinHandle<()>>>();
    let aborts = handles.iter().map(|x| x.abort_handle()).collect::<Vec<_>>();
    tokio::select! {
        _ = futures::future::join_all(handles) => {
            info!("Background services stopped.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Stoping Services (ctrl-c handling).");
            for abort in aborts {
                abort.abort()
            }
        }
    }
}
