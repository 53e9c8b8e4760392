use crate::messages::DiscoveredBeacon;

/// Beacons seen during a discovery scan, in first-seen order. Later
/// sightings of a known address are ignored.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    beacons: Vec<DiscoveredBeacon>,
}

impl DeviceRegistry {
    /// Returns true if the address was not known yet.
    pub fn add(&mut self, address: &str, rssi: i16, now: u64) -> bool {
        if self.beacons.iter().any(|b| b.address == address) {
            return false;
        }
        self.beacons.push(DiscoveredBeacon {
            address: address.to_string(),
            rssi,
            first_seen_millis: now,
        });
        true
    }

    pub fn into_beacons(self) -> Vec<DiscoveredBeacon> {
        self.beacons
    }
}
