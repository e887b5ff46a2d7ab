//! Periodic liveness ping.
//!
//! Runs on its own interval, independent of the feed consumption path,
//! and stops when the shutdown channel fires.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::HeartbeatConfig;

pub async fn run_heartbeat(config: HeartbeatConfig, mut shutdown: watch::Receiver<bool>) {
    let Some(url) = config.url else {
        debug!("Heartbeat disabled (no URL configured)");
        return;
    };
    let client = match Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Heartbeat client construction failed, heartbeat disabled");
            return;
        }
    };

    let mut interval = tokio::time::interval(config.interval);
    // The first tick fires immediately; skip it so the ping signals a
    // full interval of liveness.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Heartbeat stopping on shutdown signal");
                break;
            }
            _ = interval.tick() => {
                match client.get(&url).send().await {
                    Ok(_) => info!("Heartbeat registered"),
                    Err(e) => warn!(error = %e, "Failed to register heartbeat"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_without_url() {
        let (_tx, rx) = watch::channel(false);
        let config = HeartbeatConfig {
            url: None,
            interval: Duration::from_secs(1),
        };
        // Returns immediately rather than looping.
        run_heartbeat(config, rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_the_loop() {
        let (tx, rx) = watch::channel(false);
        let config = HeartbeatConfig {
            url: Some("http://localhost:1/ping".to_string()),
            interval: Duration::from_secs(3600),
        };
        let task = tokio::spawn(run_heartbeat(config, rx));
        tx.send(true).unwrap();
        task.await.unwrap();
    }
}
