use std::collections::HashMap;

use uuid::Uuid;

use crate::config::ScanConfig;
use crate::freshness::FreshnessTable;
use crate::messages::BeaconChange;
use crate::selector::{BestDeviceSelector, SelectionState};

#[derive(Debug, Clone)]
pub struct AdvertisementFilter {
    uuid_fragment: String,
    rssi_floor: i16,
}

impl AdvertisementFilter {
    pub fn new(config: &ScanConfig) -> Self {
        AdvertisementFilter {
            uuid_fragment: config.service_uuid_fragment(),
            rssi_floor: config.rssi_floor(),
        }
    }

    pub fn matches(&self, service_data: &HashMap<Uuid, Vec<u8>>, rssi: i16) -> bool {
        rssi > self.rssi_floor
            && service_data
                .keys()
                .any(|uuid| uuid.to_string().to_lowercase().contains(&self.uuid_fragment))
    }
}

/// Feeds accepted advertisements through the freshness table and the
/// best-device selector.
#[derive(Debug)]
pub struct BeaconTracker {
    filter: AdvertisementFilter,
    table: FreshnessTable,
    selector: BestDeviceSelector,
}

impl BeaconTracker {
    pub fn new(config: &ScanConfig) -> Self {
        BeaconTracker {
            filter: AdvertisementFilter::new(config),
            table: FreshnessTable::new(config.staleness_millis()),
            selector: BestDeviceSelector::new(config.hold_millis()),
        }
    }

    pub fn table(&self) -> &FreshnessTable {
        &self.table
    }

    pub fn selection(&self) -> &SelectionState {
        self.selector.state()
    }

    pub fn observe(
        &mut self,
        address: &str,
        rssi: Option<i16>,
        service_data: &HashMap<Uuid, Vec<u8>>,
        now: u64,
    ) -> Option<BeaconChange> {
        let rssi = rssi?;
        if !self.filter.matches(service_data, rssi) {
            return None;
        }

        self.table.update(address, rssi, now);
        self.selector.on_update(self.table.best_entry(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEACON_UUID: &str = "0000ffe1-0000-1000-8000-00805f9b34fb";
    const OTHER_UUID: &str = "0000181a-0000-1000-8000-00805f9b34fb";

    fn service_data(uuid: &str) -> HashMap<Uuid, Vec<u8>> {
        HashMap::from([(Uuid::parse_str(uuid).unwrap(), vec![0x01, 0x02])])
    }

    fn tracker() -> BeaconTracker {
        BeaconTracker::new(&ScanConfig::default())
    }

    #[test]
    fn test_filter() {
        let filter = AdvertisementFilter::new(&ScanConfig::default());
        assert!(filter.matches(&service_data(BEACON_UUID), -75));
        assert!(!filter.matches(&service_data(BEACON_UUID), -76));
        assert!(!filter.matches(&service_data(OTHER_UUID), -40));
        assert!(!filter.matches(&HashMap::new(), -40));
    }

    #[test]
    fn test_filter_fragment_is_case_insensitive() {
        let config = ScanConfig {
            service_uuid_fragment: Some("FFE1".to_string()),
            ..Default::default()
        };
        let filter = AdvertisementFilter::new(&config);
        assert!(filter.matches(&service_data(BEACON_UUID), -60));
    }

    #[test]
    fn test_rejected_advertisements_leave_table_untouched() {
        let mut tracker = tracker();
        assert!(tracker.observe("A", None, &service_data(BEACON_UUID), 0).is_none());
        assert!(tracker.observe("A", Some(-90), &service_data(BEACON_UUID), 0).is_none());
        assert!(tracker.observe("A", Some(-50), &service_data(OTHER_UUID), 0).is_none());
        assert!(tracker.table().is_empty());
    }

    #[test]
    fn test_strongest_beacon_wins_after_eviction() {
        let data = service_data(BEACON_UUID);
        let mut tracker = tracker();

        let first = tracker.observe("A", Some(-70), &data, 0).unwrap();
        assert_eq!(first.address, "A");
        // inside the hold window
        assert!(tracker.observe("B", Some(-60), &data, 0).is_none());
        assert_eq!(
            tracker.table().best_entry().map(|o| o.address.as_str()),
            Some("B")
        );

        let change = tracker.observe("C", Some(-65), &data, 3500).unwrap();
        assert_eq!(change.address, "C");
        assert_eq!(tracker.table().len(), 1);
        assert_eq!(tracker.selection().current_best_address.as_deref(), Some("C"));
    }

    #[test]
    fn test_one_change_per_commit() {
        let data = service_data(BEACON_UUID);
        let mut tracker = tracker();
        let mut changes = Vec::new();

        for step in 0..60u64 {
            let now = step * 100;
            let (address, rssi) = if step < 30 { ("A", -55) } else { ("B", -45) };
            changes.extend(tracker.observe(address, Some(rssi), &data, now));
        }

        let addresses: Vec<_> = changes.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(addresses, vec!["A", "B"]);
        assert_eq!(changes[1].committed_at_millis, 3900);
    }
}
