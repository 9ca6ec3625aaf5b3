//! Service and characteristic discovery for the active peripheral.
//!
//! Discovery results and characteristic values are kept here and published
//! to subscribers as they arrive. Read, write and subscribe requests are
//! forwarded to the platform as-is; there is no timeout or retry on top.

use std::sync::Arc;

use log::{debug, error, info};
use uuid::Uuid;

use crate::core::bluetooth::events::{BrowserEvent, EventBus};
use crate::core::bluetooth::payload::parse_hex_payload;
use crate::core::bluetooth::platform::BlePlatform;
use crate::core::bluetooth::types::{
    CharacteristicRecord, DiscoveredCharacteristic, PeripheralId,
    ServiceRecord, SubscriptionKind, WriteKind,
};
use crate::core::bluetooth::uuids::display_uuid;
use crate::error::{BrowserError, Result};

pub struct DiscoveryNotifier {
    platform: Arc<dyn BlePlatform>,
    /// Peripheral whose services are being browsed
    peripheral: Option<PeripheralId>,
    services: Vec<ServiceRecord>,
}

impl DiscoveryNotifier {
    pub fn new(platform: Arc<dyn BlePlatform>) -> Self {
        Self {
            platform,
            peripheral: None,
            services: Vec::new(),
        }
    }

    pub fn peripheral(&self) -> Option<&PeripheralId> {
        self.peripheral.as_ref()
    }

    /// Services in the order the platform reported them.
    pub fn services(&self) -> &[ServiceRecord] {
        &self.services
    }

    pub fn service(&self, uuid: &Uuid) -> Option<&ServiceRecord> {
        self.services.iter().find(|s| &s.uuid == uuid)
    }

    pub fn characteristic(&self, service: &Uuid, characteristic: &Uuid) -> Option<&CharacteristicRecord> {
        self.service(service)?.characteristic(characteristic)
    }

    /// Forgets every service of the current peripheral.
    pub fn clear(&mut self) {
        self.peripheral = None;
        self.services.clear();
    }

    /// Drops the GATT tree if `id` is the browsed peripheral, whichever
    /// peripheral is active now.
    pub fn on_disconnected(&mut self, events: &EventBus, id: &PeripheralId) {
        if !self.is_current(id) {
            return;
        }
        info!("Services of {} cleared", id);
        self.clear();
        events.emit(BrowserEvent::ServicesCleared { id: id.clone() });
    }

    pub async fn discover_services(&mut self, id: &PeripheralId) -> Result<()> {
        info!("Discovering services of {}", id);
        self.peripheral = Some(id.clone());
        self.services.clear();
        self.platform.discover_services(id).await?;
        Ok(())
    }

    pub fn on_services_discovered(
        &mut self,
        events: &EventBus,
        id: &PeripheralId,
        result: std::result::Result<Vec<Uuid>, String>,
    ) {
        if !self.is_current(id) {
            debug!("Ignoring services of {}, no longer browsed", id);
            return;
        }

        self.services = match result {
            Ok(uuids) => {
                info!("Found {} services on {}", uuids.len(), id);
                uuids
                    .into_iter()
                    .map(|uuid| ServiceRecord::new(id.clone(), uuid))
                    .collect()
            }
            Err(e) => {
                error!("Service discovery on {} was unsuccessful: {}", id, e);
                Vec::new()
            }
        };

        events.emit(BrowserEvent::ServicesDiscovered {
            id: id.clone(),
            services: self.services.clone(),
        });
    }

    pub async fn discover_characteristics(&mut self, service: Uuid) -> Result<()> {
        let id = self.peripheral.clone().ok_or(BrowserError::NoActivePeripheral)?;
        if self.service(&service).is_none() {
            return Err(BrowserError::ServiceNotFound(service));
        }
        info!("Discovering characteristics of service {}", display_uuid(&service));
        self.platform.discover_characteristics(&id, service).await?;
        Ok(())
    }

    pub fn on_characteristics_discovered(
        &mut self,
        events: &EventBus,
        id: &PeripheralId,
        service: Uuid,
        result: std::result::Result<Vec<DiscoveredCharacteristic>, String>,
    ) {
        if !self.is_current(id) {
            debug!("Ignoring characteristics of {}, no longer browsed", id);
            return;
        }
        let Some(record) = self.services.iter_mut().find(|s| s.uuid == service) else {
            debug!("Ignoring characteristics of unknown service {}", service);
            return;
        };

        record.characteristics = match result {
            Ok(found) => {
                info!(
                    "Characteristics of service {} found: {}",
                    display_uuid(&service),
                    found.len()
                );
                found
                    .into_iter()
                    .map(|c| CharacteristicRecord::new(service, c))
                    .collect()
            }
            Err(e) => {
                error!("Characteristic discovery unsuccessful: {}", e);
                Vec::new()
            }
        };

        events.emit(BrowserEvent::CharacteristicsDiscovered {
            id: id.clone(),
            service,
            characteristics: record.characteristics.clone(),
        });
    }

    pub async fn read_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        let (id, record) = self.target(service, characteristic)?;
        Self::require(record, record.properties.actions().read, "read")?;
        self.platform.read(id, service, characteristic).await?;
        Ok(())
    }

    /// Writes a user-entered hex payload. Malformed input never reaches the platform.
    pub async fn write_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
        payload: &str,
        kind: WriteKind,
    ) -> Result<()> {
        let value = parse_hex_payload(payload)?;
        let (id, record) = self.target(service, characteristic)?;
        let actions = record.properties.actions();
        match kind {
            WriteKind::WithResponse => Self::require(record, actions.write, "write")?,
            WriteKind::WithoutResponse => Self::require(
                record,
                actions.write_without_response,
                "write without response",
            )?,
        }
        debug!("Writing {} bytes to {}", value.len(), characteristic);
        self.platform
            .write(id, service, characteristic, value, kind)
            .await?;
        Ok(())
    }

    pub async fn set_subscription(
        &self,
        service: Uuid,
        characteristic: Uuid,
        kind: SubscriptionKind,
        enabled: bool,
    ) -> Result<()> {
        let (id, record) = self.target(service, characteristic)?;
        let actions = record.properties.actions();
        match kind {
            SubscriptionKind::Notify => Self::require(record, actions.notify, "notify")?,
            SubscriptionKind::Indicate => Self::require(record, actions.indicate, "indicate")?,
        }
        self.platform
            .set_notify(id, service, characteristic, enabled)
            .await?;
        Ok(())
    }

    /// A read completed or a notification arrived.
    pub fn on_value_updated(
        &mut self,
        events: &EventBus,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        result: std::result::Result<Vec<u8>, String>,
    ) {
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                error!("Reading {} failed: {}", characteristic, e);
                return;
            }
        };
        if let Some(record) = self.record_mut(id, service, characteristic) {
            debug!("Value of {} updated: {:?}", characteristic, value);
            record.value = Some(value);
            let record = record.clone();
            events.emit(BrowserEvent::ValueUpdated {
                id: id.clone(),
                characteristic: record,
            });
        }
    }

    pub fn on_write_completed(
        &self,
        events: &EventBus,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        result: std::result::Result<(), String>,
    ) {
        if let Err(e) = &result {
            error!("Writing {} failed: {}", characteristic, e);
        }
        events.emit(BrowserEvent::WriteCompleted {
            id: id.clone(),
            service,
            characteristic,
            success: result.is_ok(),
        });
    }

    pub fn on_notify_state_changed(
        &mut self,
        events: &EventBus,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        enabled: bool,
    ) {
        if let Some(record) = self.record_mut(id, service, characteristic) {
            record.notifying = enabled;
            let record = record.clone();
            events.emit(BrowserEvent::NotifyStateChanged {
                id: id.clone(),
                characteristic: record,
            });
        }
    }

    fn is_current(&self, id: &PeripheralId) -> bool {
        self.peripheral.as_ref() == Some(id)
    }

    fn target(&self, service: Uuid, characteristic: Uuid) -> Result<(&PeripheralId, &CharacteristicRecord)> {
        let id = self.peripheral.as_ref().ok_or(BrowserError::NoActivePeripheral)?;
        let service = self
            .service(&service)
            .ok_or(BrowserError::ServiceNotFound(service))?;
        let record = service
            .characteristic(&characteristic)
            .ok_or(BrowserError::CharacteristicNotFound(characteristic))?;
        Ok((id, record))
    }

    fn record_mut(
        &mut self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Option<&mut CharacteristicRecord> {
        if !self.is_current(id) {
            return None;
        }
        self.services
            .iter_mut()
            .find(|s| s.uuid == service)?
            .characteristic_mut(&characteristic)
    }

    fn require(record: &CharacteristicRecord, allowed: bool, action: &'static str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(BrowserError::NotSupported {
                characteristic: record.uuid,
                action,
            })
        }
    }
}
