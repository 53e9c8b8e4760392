#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub address: String,
    pub rssi: i16,
    pub observed_at_millis: u64,
}

/// A newly committed best beacon. One lookup is fired per change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconChange {
    pub address: String,
    pub rssi: i16,
    pub committed_at_millis: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredBeacon {
    pub address: String,
    /// Signal strength at first sighting
    pub rssi: i16,
    pub first_seen_millis: u64,
}
