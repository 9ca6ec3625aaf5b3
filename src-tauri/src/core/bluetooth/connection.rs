//! Bluetooth connection handling
//! This module tracks the single active peripheral and its connection state.

use std::sync::Arc;

use log::{info, warn};

use crate::core::bluetooth::events::{BrowserEvent, EventBus};
use crate::core::bluetooth::pairing::PairingCoordinator;
use crate::core::bluetooth::platform::BlePlatform;
use crate::core::bluetooth::registry::PeripheralRegistry;
use crate::core::bluetooth::types::{ConnectionState, PeripheralId};
use crate::error::{BrowserError, Result};

/// Connection manager for the active peripheral
///
/// Connecting to another peripheral supersedes tracking of the previous one;
/// its OS connection is left as it is. Failures are terminal, there is no retry.
pub struct ConnectionManager {
    platform: Arc<dyn BlePlatform>,
    active: Option<PeripheralId>,
}

impl ConnectionManager {
    pub fn new(platform: Arc<dyn BlePlatform>) -> Self {
        Self {
            platform,
            active: None,
        }
    }

    /// The peripheral currently targeted by connect/discovery.
    pub fn active(&self) -> Option<&PeripheralId> {
        self.active.as_ref()
    }

    pub fn is_active(&self, id: &PeripheralId) -> bool {
        self.active.as_ref() == Some(id)
    }

    /// Issues a connect unless the peripheral is already connected.
    ///
    /// Returns `false` when nothing had to be done.
    pub async fn connect(
        &mut self,
        registry: &mut PeripheralRegistry,
        events: &EventBus,
        id: &PeripheralId,
    ) -> Result<bool> {
        let record = registry
            .get(id)
            .ok_or_else(|| BrowserError::UnknownPeripheral(id.to_string()))?;

        if record.state == ConnectionState::Connected {
            info!("Peripheral {} already connected.", id);
            self.active = Some(id.clone());
            return Ok(false);
        }

        if let Some(previous) = self.active.replace(id.clone()) {
            if &previous != id {
                info!("Active peripheral changes from {} to {}", previous, id);
            }
        }

        info!("Connecting to peripheral {} ({})", id, record.display_name());
        Self::set_state(registry, events, id, ConnectionState::Connecting);

        if let Err(e) = self.platform.connect(id).await {
            warn!("Connect request for {} failed: {}", id, e);
            Self::set_state(registry, events, id, ConnectionState::Failed);
            return Err(BrowserError::Platform(e));
        }
        Ok(true)
    }

    /// Issues a disconnect; the state changes when the platform confirms.
    pub async fn disconnect(&mut self, registry: &PeripheralRegistry, id: &PeripheralId) -> Result<()> {
        if registry.get(id).is_none() {
            return Err(BrowserError::UnknownPeripheral(id.to_string()));
        }
        info!("Disconnecting from peripheral {}", id);
        self.platform.disconnect(id).await?;
        Ok(())
    }

    /// Starts the pairing ceremony; its outcome arrives as an event.
    pub async fn pair(
        &self,
        registry: &PeripheralRegistry,
        id: &PeripheralId,
        pairing: Arc<PairingCoordinator>,
    ) -> Result<()> {
        if registry.get(id).is_none() {
            return Err(BrowserError::UnknownPeripheral(id.to_string()));
        }
        info!("Pairing with peripheral {}", id);
        pairing.begin();
        self.platform.pair(id, pairing).await?;
        Ok(())
    }

    /// Handles the platform's connected callback. Returns true for the active peripheral.
    pub fn on_connected(&mut self, registry: &mut PeripheralRegistry, events: &EventBus, id: &PeripheralId) -> bool {
        info!("Connection to peripheral {} successful", id);
        Self::set_state(registry, events, id, ConnectionState::Connected);
        self.is_active(id)
    }

    pub fn on_connect_failed(
        &mut self,
        registry: &mut PeripheralRegistry,
        events: &EventBus,
        id: &PeripheralId,
        reason: &str,
    ) {
        warn!("Failed to connect to peripheral {}: {}", id, reason);
        Self::set_state(registry, events, id, ConnectionState::Failed);
    }

    /// Handles the platform's disconnected callback.
    pub fn on_disconnected(&mut self, registry: &mut PeripheralRegistry, events: &EventBus, id: &PeripheralId) {
        info!("Peripheral {} got disconnected", id);
        Self::set_state(registry, events, id, ConnectionState::Disconnected);
    }

    fn set_state(registry: &mut PeripheralRegistry, events: &EventBus, id: &PeripheralId, state: ConnectionState) {
        if registry.set_state(id, state).is_some() {
            events.emit(BrowserEvent::ConnectionStateChanged {
                id: id.clone(),
                state,
                label: state.label(),
            });
        }
    }
}
