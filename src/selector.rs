use log::{debug, info};

use crate::messages::{BeaconChange, Observation};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    pub current_best_address: Option<String>,
    pub current_best_rssi: i16,
    pub last_change_at_millis: Option<u64>,
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState {
            current_best_address: None,
            current_best_rssi: i16::MIN,
            last_change_at_millis: None,
        }
    }
}

/// Commits a new best beacon only once the hold time has passed since the
/// last change. While the committed beacon stays best, the hold timer is
/// refreshed; a differing best never refreshes it.
#[derive(Debug)]
pub struct BestDeviceSelector {
    hold_millis: u64,
    state: SelectionState,
}

impl BestDeviceSelector {
    pub fn new(hold_millis: u64) -> Self {
        BestDeviceSelector {
            hold_millis,
            state: SelectionState::default(),
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn on_update(&mut self, best: Option<&Observation>, now: u64) -> Option<BeaconChange> {
        let best = best?;

        if self.state.current_best_address.as_deref() == Some(best.address.as_str()) {
            self.state.last_change_at_millis = Some(now);
            return None;
        }

        let held = match self.state.last_change_at_millis {
            Some(last) => now.saturating_sub(last) >= self.hold_millis,
            None => true,
        };
        if !held {
            debug!(
                "Candidate {} ({} dBm) still inside hold window",
                best.address, best.rssi
            );
            return None;
        }

        info!(
            "Best beacon changed: {:?} -> {} ({} dBm)",
            self.state.current_best_address, best.address, best.rssi
        );
        self.state = SelectionState {
            current_best_address: Some(best.address.clone()),
            current_best_rssi: best.rssi,
            last_change_at_millis: Some(now),
        };

        Some(BeaconChange {
            address: best.address.clone(),
            rssi: best.rssi,
            committed_at_millis: now,
        })
    }
}
