use std::collections::HashMap;

use log::debug;

use crate::messages::Observation;

/// Latest observation per beacon address, with entries older than the
/// staleness window evicted on every update.
#[derive(Debug)]
pub struct FreshnessTable {
    staleness_millis: u64,
    entries: HashMap<String, Observation>,
}

impl FreshnessTable {
    pub fn new(staleness_millis: u64) -> Self {
        FreshnessTable {
            staleness_millis,
            entries: HashMap::new(),
        }
    }

    pub fn update(&mut self, address: &str, rssi: i16, now: u64) {
        let staleness = self.staleness_millis;
        self.entries.retain(|addr, obs| {
            let fresh = now.saturating_sub(obs.observed_at_millis) <= staleness;
            if !fresh {
                debug!("Evicting stale beacon {}", addr);
            }
            fresh
        });

        self.entries.insert(
            address.to_string(),
            Observation {
                address: address.to_string(),
                rssi,
                observed_at_millis: now,
            },
        );
    }

    /// Strongest entry; on equal RSSI the smallest address wins.
    pub fn best_entry(&self) -> Option<&Observation> {
        self.entries.values().max_by(|a, b| {
            a.rssi
                .cmp(&b.rssi)
                .then_with(|| b.address.cmp(&a.address))
        })
    }

    pub fn get(&self, address: &str) -> Option<&Observation> {
        self.entries.get(address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_entry_empty() {
        let table = FreshnessTable::new(3000);
        assert!(table.is_empty());
        assert!(table.best_entry().is_none());
    }

    #[test]
    fn test_eviction_and_best() {
        let mut table = FreshnessTable::new(3000);
        table.update("A", -70, 0);
        table.update("B", -60, 0);
        assert_eq!(table.best_entry().map(|o| o.address.as_str()), Some("B"));

        table.update("C", -65, 3500);
        assert_eq!(table.len(), 1);
        assert!(table.get("A").is_none());
        assert!(table.get("B").is_none());
        assert_eq!(table.best_entry().map(|o| o.address.as_str()), Some("C"));
    }

    #[test]
    fn test_entry_at_window_edge_is_kept() {
        let mut table = FreshnessTable::new(3000);
        table.update("A", -70, 1000);
        table.update("B", -72, 4000);
        assert!(table.get("A").is_some());

        table.update("B", -72, 4001);
        assert!(table.get("A").is_none());
    }

    #[test]
    fn test_update_overwrites() {
        let mut table = FreshnessTable::new(3000);
        table.update("A", -70, 0);
        table.update("A", -50, 100);
        assert_eq!(table.len(), 1);
        let obs = table.get("A").unwrap();
        assert_eq!(obs.rssi, -50);
        assert_eq!(obs.observed_at_millis, 100);
    }

    #[test]
    fn test_tie_prefers_smallest_address() {
        let mut table = FreshnessTable::new(3000);
        table.update("BB", -60, 0);
        table.update("AA", -60, 0);
        table.update("CC", -60, 0);
        assert_eq!(table.best_entry().map(|o| o.address.as_str()), Some("AA"));
    }

    #[test]
    fn test_no_stale_entry_survives_update() {
        let mut table = FreshnessTable::new(3000);
        let mut now = 0;
        for i in 0..50u64 {
            now += 250 + (i % 7) * 180;
            table.update(&format!("dev{}", i % 9), -50 - (i % 20) as i16, now);
            for addr in (0..9).map(|n| format!("dev{n}")) {
                if let Some(obs) = table.get(&addr) {
                    assert!(now - obs.observed_at_millis <= 3000);
                }
            }
        }
    }
}
