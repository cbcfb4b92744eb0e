//! Reachability check for the storefront under test

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Poll `base_url` until it answers without a server error
pub async fn wait_for_reachable(base_url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                info!("Storefront reachable at {} ({})", base_url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Storefront returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for storefront at {}...", base_url);
                }
                // Refused connections are expected while a local target boots
                if !e.is_connect() {
                    warn!("Reachability check error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout_duration {
            return Err(E2eError::TargetUnreachable {
                url: base_url.to_string(),
                attempts,
            });
        }
        sleep(Duration::from_millis(250)).await;
    }
}
