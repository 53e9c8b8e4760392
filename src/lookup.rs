use anyhow::{Context as _, bail};
use log::{debug, error, info};
use reqwest::StatusCode;
use serde_derive::{Deserialize, Serialize};

use crate::config;

pub const LOOKUP_PATH: &str = "grow-space/indoor-location/beacon/my";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceLocation {
    pub zone_name: String,
    pub location_x: i64,
    pub location_y: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BeaconRequest<'a> {
    beacon_uuid: &'a str,
}

#[derive(Debug, Clone)]
pub struct LookupClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl LookupClient {
    pub fn new(config: &config::LookupConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(LookupClient {
            client,
            url: format!("{}/{}", config.base_url.trim_end_matches('/'), LOOKUP_PATH),
            api_key: config.api_key.clone(),
        })
    }

    /// Resolves the zone of a beacon. Every failure is logged and reported
    /// as `None`.
    pub async fn lookup(&self, address: &str) -> Option<SpaceLocation> {
        match self.request(address).await {
            Ok(location) => {
                info!(
                    "Beacon {} is in zone {} ({}, {})",
                    address, location.zone_name, location.location_x, location.location_y
                );
                Some(location)
            }
            Err(err) => {
                error!("Beacon lookup for {} failed: {:#}", address, err);
                None
            }
        }
    }

    /// Fire-and-forget lookup; `callback` runs exactly once on the runtime.
    pub fn spawn_lookup<F>(&self, address: String, callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Option<SpaceLocation>) + Send + 'static,
    {
        let client = self.clone();
        tokio::spawn(async move {
            let location = client.lookup(&address).await;
            callback(location);
        })
    }

    async fn request(&self, address: &str) -> anyhow::Result<SpaceLocation> {
        debug!("POST {} for beacon {}", self.url, address);

        let mut request = self.client.post(&self.url).json(&BeaconRequest {
            beacon_uuid: address,
        });
        if let Some(api_key) = &self.api_key {
            request = request.header("API-Key", api_key);
        }

        let response = request.send().await.context("request failed")?;
        let status = response.status();
        if status != StatusCode::OK {
            bail!("HTTP {}", status);
        }

        let body = response.text().await.context("failed to read body")?;
        serde_json::from_str(&body).context("malformed response body")
    }
}
