use std::time::{Duration, Instant};

use anyhow::Context as _;
use btleplug::api::{Central as _, CentralEvent, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, PeripheralId};
use futures::StreamExt as _;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::config::ScanConfig;
use crate::messages::{BeaconChange, DiscoveredBeacon};
use crate::registry::DeviceRegistry;
use crate::tracker::{AdvertisementFilter, BeaconTracker};

pub struct Manager {
    adapter: Adapter,
    scan: ScanConfig,
    started: Instant,
}

impl Manager {
    pub fn new(adapter: Adapter, scan: ScanConfig) -> Self {
        Manager {
            adapter,
            scan,
            started: Instant::now(),
        }
    }

    fn now_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    async fn properties(&self, id: &PeripheralId) -> anyhow::Result<Option<PeripheralProperties>> {
        let peripheral = self.adapter.peripheral(id).await?;
        Ok(peripheral.properties().await?)
    }

    /// Tracks the best beacon until Ctrl-C or until the adapter stops
    /// producing events. Each committed change is sent on `tx`.
    pub async fn run_loop(&self, tx: mpsc::UnboundedSender<BeaconChange>) -> anyhow::Result<()> {
        let mut tracker = BeaconTracker::new(&self.scan);
        let mut events = self
            .adapter
            .events()
            .await
            .context("Failed to subscribe to adapter events")?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .context("Failed to start BLE scan")?;
        info!("BLE scan started");

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Interrupted, stopping scan");
                    break;
                }
                event = events.next() => {
                    let id = match event {
                        Some(CentralEvent::DeviceDiscovered(id))
                        | Some(CentralEvent::DeviceUpdated(id))
                        | Some(CentralEvent::ServiceDataAdvertisement { id, .. }) => id,
                        Some(_) => continue,
                        None => {
                            warn!("Adapter event stream closed");
                            break;
                        }
                    };

                    let properties = match self.properties(&id).await {
                        Ok(Some(properties)) => properties,
                        Ok(None) => continue,
                        Err(err) => {
                            debug!("Could not read properties of {:?}: {:?}", id, err);
                            continue;
                        }
                    };

                    let address = properties.address.to_string();
                    let now = self.now_millis();
                    if let Some(change) =
                        tracker.observe(&address, properties.rssi, &properties.service_data, now)
                    {
                        debug!("{} fresh beacons around", tracker.table().len());
                        if let Err(err) = tx.send(change) {
                            error!("Error announcing beacon change: {:?}", err);
                            break;
                        }
                    }
                }
            }
        }

        if let Err(err) = self.adapter.stop_scan().await {
            error!("Error stopping BLE scan: {:?}", err);
        }
        let selection = tracker.selection();
        if let Some(address) = &selection.current_best_address {
            info!(
                "Last committed beacon: {} ({} dBm)",
                address, selection.current_best_rssi
            );
        }
        info!("Exiting manager event loop");
        Ok(())
    }

    /// Scans for `duration` and returns every matching beacon seen, in
    /// first-seen order.
    pub async fn discover(&self, duration: Duration) -> anyhow::Result<Vec<DiscoveredBeacon>> {
        let filter = AdvertisementFilter::new(&self.scan);
        let mut registry = DeviceRegistry::default();
        let mut events = self
            .adapter
            .events()
            .await
            .context("Failed to subscribe to adapter events")?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .context("Failed to start BLE scan")?;
        info!("Discovering beacons for {} s", duration.as_secs());

        let deadline = tokio::time::Instant::now() + duration;
        loop {
            let id = match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(Some(CentralEvent::DeviceDiscovered(id)))
                | Ok(Some(CentralEvent::DeviceUpdated(id)))
                | Ok(Some(CentralEvent::ServiceDataAdvertisement { id, .. })) => id,
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            };

            let Ok(Some(properties)) = self.properties(&id).await else {
                continue;
            };
            let Some(rssi) = properties.rssi else {
                continue;
            };
            if !filter.matches(&properties.service_data, rssi) {
                continue;
            }

            let address = properties.address.to_string();
            if registry.add(&address, rssi, self.now_millis()) {
                info!("Discovered beacon {} ({} dBm)", address, rssi);
            }
        }

        self.adapter
            .stop_scan()
            .await
            .context("Failed to stop BLE scan")?;

        Ok(registry.into_beacons())
    }
}
