//! Messages crossing the boundary between the platform Bluetooth stack and
//! the presentation context.
//!
//! Platform callbacks become [`PlatformEvent`]s on an mpsc channel. The
//! manager applies them in order and republishes the outcome as
//! [`BrowserEvent`]s on a broadcast channel for the UI.

use log::debug;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::core::bluetooth::constants::BROWSER_EVENT_CAPACITY;
use crate::core::bluetooth::pairing::PairingPrompt;
use crate::core::bluetooth::types::{
    CharacteristicRecord, ConnectionState, DiscoveredCharacteristic, PeripheralId,
    PeripheralRecord, PeripheralUpdate, ServiceRecord,
};

/// Callback delivered by the platform backend.
///
/// Failures carry the platform's message; they end in a terminal state or a
/// log line, never in a typed error.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    Discovered {
        id: PeripheralId,
        name: Option<String>,
        rssi: Option<i16>,
    },
    Updated {
        id: PeripheralId,
        update: PeripheralUpdate,
    },
    Removed {
        id: PeripheralId,
    },
    /// The scan started as `cycle` has ended.
    ScanCompleted {
        cycle: u64,
    },
    Connected {
        id: PeripheralId,
    },
    ConnectFailed {
        id: PeripheralId,
        reason: String,
    },
    Disconnected {
        id: PeripheralId,
    },
    PairingCompleted {
        id: PeripheralId,
        result: Result<(), String>,
    },
    ServicesDiscovered {
        id: PeripheralId,
        result: Result<Vec<Uuid>, String>,
    },
    CharacteristicsDiscovered {
        id: PeripheralId,
        service: Uuid,
        result: Result<Vec<DiscoveredCharacteristic>, String>,
    },
    /// A read completed or a notification arrived.
    ValueUpdated {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        result: Result<Vec<u8>, String>,
    },
    WriteCompleted {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        result: Result<(), String>,
    },
    NotifyStateChanged {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        enabled: bool,
    },
}

pub type PlatformEventSender = mpsc::UnboundedSender<PlatformEvent>;
pub type PlatformEventReceiver = mpsc::UnboundedReceiver<PlatformEvent>;

/// Creates the channel platform backends report through.
pub fn platform_channel() -> (PlatformEventSender, PlatformEventReceiver) {
    mpsc::unbounded_channel()
}

/// Notification published to UI subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowserEvent {
    ScanStarted,
    ScanCompleted {
        count: usize,
    },
    RegistryCleared,
    PeripheralAdded {
        index: usize,
        peripheral: PeripheralRecord,
    },
    PeripheralUpdated {
        index: usize,
        peripheral: PeripheralRecord,
    },
    PeripheralRemoved {
        index: usize,
        id: PeripheralId,
    },
    ConnectionStateChanged {
        id: PeripheralId,
        state: ConnectionState,
        label: &'static str,
    },
    PairingPrompt(PairingPrompt),
    PairingCompleted {
        id: PeripheralId,
        paired: bool,
    },
    ServicesDiscovered {
        id: PeripheralId,
        services: Vec<ServiceRecord>,
    },
    /// The browsed peripheral disconnected; its GATT tree is gone.
    ServicesCleared {
        id: PeripheralId,
    },
    CharacteristicsDiscovered {
        id: PeripheralId,
        service: Uuid,
        characteristics: Vec<CharacteristicRecord>,
    },
    ValueUpdated {
        id: PeripheralId,
        characteristic: CharacteristicRecord,
    },
    WriteCompleted {
        id: PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        success: bool,
    },
    NotifyStateChanged {
        id: PeripheralId,
        characteristic: CharacteristicRecord,
    },
}

/// Fan-out of [`BrowserEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BrowserEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROWSER_EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BrowserEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event; having no subscriber is not an error.
    pub fn emit(&self, event: BrowserEvent) {
        if self.sender.send(event).is_err() {
            debug!("Browser event dropped, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
