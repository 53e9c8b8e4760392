use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::lookup::{LookupClient, SpaceLocation};
use crate::messages::BeaconChange;

pub struct LookupDispatcher {
    client: LookupClient,
    rx: mpsc::UnboundedReceiver<BeaconChange>,
}

impl LookupDispatcher {
    pub fn new(client: LookupClient, rx: mpsc::UnboundedReceiver<BeaconChange>) -> Self {
        LookupDispatcher { client, rx }
    }

    /// Runs until every sender is dropped. Returns the number of lookups fired.
    pub async fn run(mut self) -> usize {
        self.run_with(|change, location| match location {
            Some(location) => info!(
                "Now in zone {} at ({}, {}) via beacon {}",
                location.zone_name, location.location_x, location.location_y, change.address
            ),
            None => warn!("No location for beacon {}", change.address),
        })
        .await
    }

    pub async fn run_with<F>(&mut self, on_location: F) -> usize
    where
        F: Fn(&BeaconChange, Option<SpaceLocation>) + Clone + Send + 'static,
    {
        let mut fired = 0;
        while let Some(change) = self.rx.recv().await {
            debug!(
                "Looking up beacon {} committed at {} ms",
                change.address, change.committed_at_millis
            );
            let on_location = on_location.clone();
            self.client
                .spawn_lookup(change.address.clone(), move |location| {
                    on_location(&change, location)
                });
            fired += 1;
        }
        debug!("Beacon change channel closed");
        fired
    }
}
