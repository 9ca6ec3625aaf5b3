//! Bluetooth functionality for the BLE Service Browser
//! This module handles scanning, connecting, pairing and GATT browsing.
//! The platform stack sits behind [`BlePlatform`]; everything else is
//! platform-independent state driven by [`PlatformEvent`]s.

#[cfg(feature = "bluest")]
mod bluest_platform;
pub mod connection;
pub mod constants;
pub mod discovery;
pub mod events;
mod manager;
pub mod pairing;
pub mod payload;
pub mod platform;
pub mod registry;
pub mod types;
pub mod uuids;

// Re-export types that should be publicly accessible
#[cfg(feature = "bluest")]
pub use bluest_platform::BluestPlatform;
pub use constants::*; // Re-export all constants
pub use events::{platform_channel, BrowserEvent, EventBus, PlatformEvent};
pub use manager::BluetoothManager;
pub use pairing::{PairingCoordinator, PairingKind, PairingPrompt};
pub use platform::BlePlatform;
pub use registry::{DedupPolicy, PeripheralRegistry};
pub use types::{
    CharacteristicProperties, CharacteristicRecord, ConnectionState, PeripheralId,
    PeripheralRecord, ServiceRecord, SubscriptionKind, WriteKind,
};
