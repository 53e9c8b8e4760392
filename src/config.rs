use std::time::Duration;

use serde_derive::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub lookup: LookupConfig,
    pub scan: Option<ScanConfig>,
}

impl AppConfig {
    pub fn scan(&self) -> ScanConfig {
        self.scan.clone().unwrap_or_default()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl LookupConfig {
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| "beacon-locator".to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(10))
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct ScanConfig {
    pub service_uuid_fragment: Option<String>,
    pub rssi_floor: Option<i16>,
    pub staleness_millis: Option<u64>,
    pub hold_millis: Option<u64>,
}

impl ScanConfig {
    /// Matched against the lowercase string form of each service-data UUID.
    pub fn service_uuid_fragment(&self) -> String {
        self.service_uuid_fragment
            .as_deref()
            .unwrap_or("ffe1")
            .to_lowercase()
    }

    /// Advertisements must be strictly louder than this to count.
    pub fn rssi_floor(&self) -> i16 {
        self.rssi_floor.unwrap_or(-76)
    }

    pub fn staleness_millis(&self) -> u64 {
        self.staleness_millis.unwrap_or(3000)
    }

    pub fn hold_millis(&self) -> u64 {
        self.hold_millis.unwrap_or(1000)
    }
}
