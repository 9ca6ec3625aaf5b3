//! Bluetooth manager for the BLE Service Browser
//! This module provides the main interface for bluetooth operations and owns
//! the state the UI renders: the peripheral list, the active connection and
//! the discovered GATT tree.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::BrowserConfig;
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::discovery::DiscoveryNotifier;
use crate::core::bluetooth::events::{BrowserEvent, EventBus, PlatformEvent, PlatformEventReceiver};
use crate::core::bluetooth::pairing::PairingCoordinator;
use crate::core::bluetooth::platform::BlePlatform;
use crate::core::bluetooth::registry::{PeripheralRegistry, RegistryChange};
use crate::core::bluetooth::types::{
    CharacteristicRecord, ConnectionState, PeripheralId, PeripheralRecord, PeripheralUpdate,
    ServiceRecord, SubscriptionKind, WriteKind,
};
use crate::error::{BrowserError, Result};
use crate::utils::extract_mac_address;

/// Manages Bluetooth operations
pub struct BluetoothManager {
    platform: Arc<dyn BlePlatform>,
    config: BrowserConfig,
    /// Peripherals found in the current scan cycle
    registry: PeripheralRegistry,
    connection_manager: ConnectionManager,
    discovery: DiscoveryNotifier,
    pairing: Arc<PairingCoordinator>,
    events: EventBus,
    scanning: bool,
    /// Number of the most recently started scan cycle
    scan_cycle: u64,
}

impl BluetoothManager {
    /// Creates a new BluetoothManager around an injected platform backend
    pub fn new(platform: Arc<dyn BlePlatform>, config: BrowserConfig, events: EventBus) -> Self {
        Self {
            registry: PeripheralRegistry::new(config.dedup_policy()),
            connection_manager: ConnectionManager::new(platform.clone()),
            discovery: DiscoveryNotifier::new(platform.clone()),
            pairing: Arc::new(PairingCoordinator::new(events.clone())),
            platform,
            config,
            events,
            scanning: false,
            scan_cycle: 0,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The pairing coordinator, for answering ceremonies without the manager lock.
    pub fn pairing(&self) -> Arc<PairingCoordinator> {
        self.pairing.clone()
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BrowserConfig) {
        self.registry.set_policy(config.dedup_policy());
        self.config = config;
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn peripherals(&self) -> &[PeripheralRecord] {
        self.registry.records()
    }

    pub fn peripheral(&self, id: &PeripheralId) -> Option<&PeripheralRecord> {
        self.registry.get(id)
    }

    pub fn active_peripheral(&self) -> Option<&PeripheralId> {
        self.connection_manager.active()
    }

    pub fn services(&self) -> &[ServiceRecord] {
        self.discovery.services()
    }

    pub fn characteristic(&self, service: &Uuid, characteristic: &Uuid) -> Option<&CharacteristicRecord> {
        self.discovery.characteristic(service, characteristic)
    }

    /// Starts a new scan cycle.
    ///
    /// Cancels the active connection, clears the peripheral list and asks the
    /// platform to scan for the configured duration.
    pub async fn start_scan(&mut self) -> Result<()> {
        if let Some(active) = self.connection_manager.active().cloned() {
            let connected = self
                .registry
                .get(&active)
                .is_some_and(|r| r.state != ConnectionState::Disconnected);
            if connected {
                info!("Cancelling connection to {} before scanning", active);
                if let Err(e) = self.platform.disconnect(&active).await {
                    warn!("Failed to cancel connection to {}: {}", active, e);
                }
            }
        }

        self.registry.clear();
        self.events.emit(BrowserEvent::RegistryCleared);

        self.scan_cycle += 1;
        if let Err(e) = self
            .platform
            .start_scan(self.config.scan_duration(), self.scan_cycle)
            .await
        {
            error!("Cannot start scan: {}", e);
            return Err(BrowserError::AdapterUnavailable(e.to_string()));
        }

        self.scanning = true;
        self.events.emit(BrowserEvent::ScanStarted);
        info!(
            "Device scan started for {} seconds.",
            self.config.scan_duration_secs
        );
        Ok(())
    }

    pub async fn stop_scan(&mut self) -> Result<()> {
        info!("Stopping Bluetooth scan.");
        self.platform.stop_scan().await?;
        Ok(())
    }

    /// Connects to a listed peripheral and makes it the active one.
    pub async fn connect(&mut self, id: &PeripheralId) -> Result<()> {
        let issued = self
            .connection_manager
            .connect(&mut self.registry, &self.events, id)
            .await?;

        if !issued && self.discovery.peripheral() != Some(id) {
            self.discovery.discover_services(id).await?;
        }
        Ok(())
    }

    pub async fn disconnect(&mut self, id: &PeripheralId) -> Result<()> {
        self.connection_manager.disconnect(&self.registry, id).await
    }

    /// Starts pairing; prompts and the outcome arrive as events.
    pub async fn pair(&mut self, id: &PeripheralId) -> Result<()> {
        self.connection_manager
            .pair(&self.registry, id, self.pairing.clone())
            .await
    }

    /// Re-runs service discovery on the active peripheral.
    pub async fn discover_services(&mut self) -> Result<()> {
        let id = self
            .connection_manager
            .active()
            .cloned()
            .ok_or(BrowserError::NoActivePeripheral)?;
        self.discovery.discover_services(&id).await
    }

    pub async fn discover_characteristics(&mut self, service: Uuid) -> Result<()> {
        self.discovery.discover_characteristics(service).await
    }

    pub async fn read_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        self.discovery.read_characteristic(service, characteristic).await
    }

    /// Writes a hex payload typed by the user.
    pub async fn write_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &str,
        kind: WriteKind,
    ) -> Result<()> {
        self.discovery
            .write_characteristic(service, characteristic, payload, kind)
            .await
    }

    pub async fn set_notify(&self, service: Uuid, characteristic: Uuid, enabled: bool) -> Result<()> {
        self.discovery
            .set_subscription(service, characteristic, SubscriptionKind::Notify, enabled)
            .await
    }

    pub async fn set_indicate(&self, service: Uuid, characteristic: Uuid, enabled: bool) -> Result<()> {
        self.discovery
            .set_subscription(service, characteristic, SubscriptionKind::Indicate, enabled)
            .await
    }

    /// Applies one platform callback to the browser state.
    pub async fn apply(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Discovered { id, name, rssi } => {
                if let (Some(min), Some(signal)) = (self.config.min_rssi, rssi) {
                    if signal < min {
                        debug!("Ignoring {} with weak signal {}", id, signal);
                        return;
                    }
                }
                let change = self.registry.on_discovered(id.clone(), name, rssi);
                if let Some(address) = extract_mac_address(id.as_str()) {
                    self.registry.on_updated(
                        &id,
                        PeripheralUpdate {
                            address: Some(address),
                            ..Default::default()
                        },
                    );
                }
                self.publish(change);
            }
            PlatformEvent::Updated { id, update } => {
                if let Some(change) = self.registry.on_updated(&id, update) {
                    self.publish(change);
                }
            }
            PlatformEvent::Removed { id } => {
                if let Some((RegistryChange::Removed(index), _)) = self.registry.on_removed(&id) {
                    debug!("Peripheral {} removed", id);
                    self.events.emit(BrowserEvent::PeripheralRemoved { index, id });
                }
            }
            PlatformEvent::ScanCompleted { cycle } => {
                if cycle != self.scan_cycle {
                    debug!("Ignoring completion of superseded scan cycle {}", cycle);
                    return;
                }
                self.scanning = false;
                info!("Stopped scanning");
                info!("Known peripherals = {}", self.registry.len());
                for record in self.registry.records() {
                    debug!(
                        "Peripheral {} - Name: {}, RSSI: {:?}, State: {:?}",
                        record.id,
                        record.display_name(),
                        record.rssi,
                        record.state
                    );
                }
                self.events.emit(BrowserEvent::ScanCompleted {
                    count: self.registry.len(),
                });
            }
            PlatformEvent::Connected { id } => {
                if self
                    .connection_manager
                    .on_connected(&mut self.registry, &self.events, &id)
                {
                    if let Err(e) = self.discovery.discover_services(&id).await {
                        error!("Service discovery request for {} failed: {}", id, e);
                    }
                }
            }
            PlatformEvent::ConnectFailed { id, reason } => {
                self.connection_manager
                    .on_connect_failed(&mut self.registry, &self.events, &id, &reason);
            }
            PlatformEvent::Disconnected { id } => {
                self.connection_manager
                    .on_disconnected(&mut self.registry, &self.events, &id);
                self.discovery.on_disconnected(&self.events, &id);
            }
            PlatformEvent::PairingCompleted { id, result } => {
                let paired = match result {
                    Ok(()) => {
                        info!("Paired with {}", id);
                        true
                    }
                    Err(e) => {
                        warn!("Pairing with {} failed: {}", id, e);
                        false
                    }
                };
                let update = PeripheralUpdate {
                    is_paired: Some(paired),
                    ..Default::default()
                };
                if let Some(change) = self.registry.on_updated(&id, update) {
                    self.publish(change);
                }
                self.events.emit(BrowserEvent::PairingCompleted { id, paired });
            }
            PlatformEvent::ServicesDiscovered { id, result } => {
                self.discovery.on_services_discovered(&self.events, &id, result);
            }
            PlatformEvent::CharacteristicsDiscovered { id, service, result } => {
                self.discovery
                    .on_characteristics_discovered(&self.events, &id, service, result);
            }
            PlatformEvent::ValueUpdated {
                id,
                service,
                characteristic,
                result,
            } => {
                self.discovery
                    .on_value_updated(&self.events, &id, service, characteristic, result);
            }
            PlatformEvent::WriteCompleted {
                id,
                service,
                characteristic,
                result,
            } => {
                self.discovery
                    .on_write_completed(&self.events, &id, service, characteristic, result);
            }
            PlatformEvent::NotifyStateChanged {
                id,
                service,
                characteristic,
                enabled,
            } => {
                self.discovery.on_notify_state_changed(
                    &self.events,
                    &id,
                    service,
                    characteristic,
                    enabled,
                );
            }
        }
    }

    /// Applies platform events one at a time until the channel closes or
    /// `cancel` fires. This is the only place browser state is mutated by
    /// platform callbacks.
    pub async fn run_event_loop(
        manager: Arc<Mutex<BluetoothManager>>,
        mut receiver: PlatformEventReceiver,
        cancel: CancellationToken,
    ) {
        info!("Platform event loop started.");
        loop {
            tokio::select! {
                event = receiver.recv() => match event {
                    Some(event) => manager.lock().await.apply(event).await,
                    None => break,
                },
                _ = cancel.cancelled() => break,
            }
        }
        info!("Platform event loop ended.");
    }

    fn publish(&self, change: RegistryChange) {
        let event = match change {
            RegistryChange::Added(index) => self
                .registry
                .get_at(index)
                .cloned()
                .map(|peripheral| BrowserEvent::PeripheralAdded { index, peripheral }),
            RegistryChange::Updated(index) | RegistryChange::Replaced { index, .. } => self
                .registry
                .get_at(index)
                .cloned()
                .map(|peripheral| BrowserEvent::PeripheralUpdated { index, peripheral }),
            RegistryChange::Removed(_) => None,
        };
        if let Some(event) = event {
            self.events.emit(event);
        }
    }
}
