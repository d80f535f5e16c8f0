//! Network reachability probe run before any crawl job

use crate::config::ReachabilityConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Confirms the network path works before crawling starts
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Probes a configured URL through the crawler's own client (and proxy)
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    config: ReachabilityConfig,
}

impl HttpProbe {
    pub fn new(client: Client, config: ReachabilityConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn check(&self) -> bool {
        tracing::info!("Checking network path via {}", self.config.url);

        let response = match self
            .client
            .get(&self.config.url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Reachability check failed: {}", e);
                return false;
            }
        };

        if !self.config.require_tor {
            tracing::info!("Reachability check passed");
            return true;
        }

        match response.json::<Value>().await {
            Ok(body) if body.get("IsTor").and_then(Value::as_bool) == Some(true) => {
                let ip = body.get("IP").and_then(Value::as_str).unwrap_or("unknown");
                tracing::info!("Traffic is routed through Tor (exit IP {})", ip);
                true
            }
            Ok(_) => {
                tracing::error!("Traffic is NOT routed through Tor");
                false
            }
            Err(e) => {
                tracing::error!("Unreadable reachability response: {}", e);
                false
            }
        }
    }
}
