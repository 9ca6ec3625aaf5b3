//! Defines shared data structures for the Bluetooth module.

use std::fmt;

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use uuid::Uuid;

use crate::core::bluetooth::payload::format_value;
use crate::core::bluetooth::uuids;

/// Platform-assigned identifier of a peripheral, stable per peripheral instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PeripheralId(String);

impl PeripheralId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeripheralId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Connection state of a peripheral as seen by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    /// Label shown next to the peripheral in the detail view.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connected => "Connected",
            Self::Connecting => "Connecting",
            Self::Disconnected | Self::Failed => "Not Connected",
        }
    }
}

/// Represents a discovered Bluetooth peripheral
///
/// Serialised with its display name and state label for list rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PeripheralRecord {
    /// Platform-specific unique identifier for the device
    pub id: PeripheralId,
    /// The advertised name of the device, if any
    pub name: Option<String>,
    /// The MAC address, when the platform exposes one in its identifier
    pub address: Option<String>,
    /// The most recent signal strength (RSSI) reading
    pub rssi: Option<i16>,
    /// Whether the device is paired with this host
    pub is_paired: bool,
    pub state: ConnectionState,
}

impl PeripheralRecord {
    pub fn new(id: PeripheralId, name: Option<String>, rssi: Option<i16>) -> Self {
        Self {
            id,
            name,
            address: None,
            rssi,
            is_paired: false,
            state: ConnectionState::Disconnected,
        }
    }

    /// Name for list rendering, `"Unknown"` when nothing was advertised.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or(crate::core::bluetooth::constants::UNKNOWN_DEVICE_NAME)
    }
}

impl Serialize for PeripheralRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("PeripheralRecord", 8)?;
        record.serialize_field("id", &self.id)?;
        record.serialize_field("name", &self.name)?;
        record.serialize_field("displayName", self.display_name())?;
        record.serialize_field("address", &self.address)?;
        record.serialize_field("rssi", &self.rssi)?;
        record.serialize_field("isPaired", &self.is_paired)?;
        record.serialize_field("state", &self.state)?;
        record.serialize_field("stateLabel", self.state.label())?;
        record.end()
    }
}

/// Partial update merged into an existing [`PeripheralRecord`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeripheralUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub rssi: Option<i16>,
    pub is_paired: Option<bool>,
}

impl PeripheralUpdate {
    pub fn apply_to(self, record: &mut PeripheralRecord) {
        if let Some(name) = self.name {
            record.name = Some(name);
        }
        if let Some(address) = self.address {
            record.address = Some(address);
        }
        if let Some(rssi) = self.rssi {
            record.rssi = Some(rssi);
        }
        if let Some(is_paired) = self.is_paired {
            record.is_paired = is_paired;
        }
    }
}

/// GATT characteristic property bits (Bluetooth Core Vol 3, Part G, 3.3.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct CharacteristicProperties(u8);

impl CharacteristicProperties {
    pub const BROADCAST: u8 = 0x01;
    pub const READ: u8 = 0x02;
    pub const WRITE_WITHOUT_RESPONSE: u8 = 0x04;
    pub const WRITE: u8 = 0x08;
    pub const NOTIFY: u8 = 0x10;
    pub const INDICATE: u8 = 0x20;
    pub const AUTHENTICATED_SIGNED_WRITES: u8 = 0x40;
    pub const EXTENDED_PROPERTIES: u8 = 0x80;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Which user actions the characteristic allows.
    pub fn actions(&self) -> ActionAvailability {
        ActionAvailability {
            read: self.contains(Self::READ),
            write: self.contains(Self::WRITE),
            write_without_response: self.contains(Self::WRITE_WITHOUT_RESPONSE),
            notify: self.contains(Self::NOTIFY),
            indicate: self.contains(Self::INDICATE),
        }
    }

    /// One-line summary, e.g. `B:0 R:1 w:0 W:0 N:0 I:0 A:0 E:0`.
    pub fn summary(&self) -> String {
        let bit = |flag| u8::from(self.contains(flag));
        format!(
            "B:{} R:{} w:{} W:{} N:{} I:{} A:{} E:{}",
            bit(Self::BROADCAST),
            bit(Self::READ),
            bit(Self::WRITE_WITHOUT_RESPONSE),
            bit(Self::WRITE),
            bit(Self::NOTIFY),
            bit(Self::INDICATE),
            bit(Self::AUTHENTICATED_SIGNED_WRITES),
            bit(Self::EXTENDED_PROPERTIES),
        )
    }
}

/// Enabled/disabled state of the characteristic actions in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionAvailability {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
    pub indicate: bool,
}

/// How a value is written to a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WriteKind {
    WithResponse,
    WithoutResponse,
}

/// Value-change subscription flavour. Both are delivered as notifications
/// by the platform; the distinction only gates the action on properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionKind {
    Notify,
    Indicate,
}

/// Characteristic as reported by the platform during discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredCharacteristic {
    pub uuid: Uuid,
    pub properties: CharacteristicProperties,
}

/// A discovered GATT characteristic and its last known value.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicRecord {
    pub uuid: Uuid,
    pub name: &'static str,
    /// UUID of the owning service
    pub service: Uuid,
    pub properties: CharacteristicProperties,
    pub value: Option<Vec<u8>>,
    pub notifying: bool,
}

impl CharacteristicRecord {
    pub fn new(service: Uuid, discovered: DiscoveredCharacteristic) -> Self {
        Self {
            uuid: discovered.uuid,
            name: uuids::name_for(&discovered.uuid),
            service,
            properties: discovered.properties,
            value: None,
            notifying: false,
        }
    }

    /// Value for the detail view: `0x…`, `Not Readable`, or empty.
    pub fn value_display(&self) -> String {
        match &self.value {
            Some(value) => format_value(value),
            None if !self.properties.contains(CharacteristicProperties::READ) => {
                "Not Readable".to_string()
            }
            None => String::new(),
        }
    }
}

impl Serialize for CharacteristicRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("CharacteristicRecord", 9)?;
        record.serialize_field("uuid", &self.uuid)?;
        record.serialize_field("name", self.name)?;
        record.serialize_field("service", &self.service)?;
        record.serialize_field("properties", &self.properties)?;
        record.serialize_field("propertySummary", &self.properties.summary())?;
        record.serialize_field("actions", &self.properties.actions())?;
        record.serialize_field("value", &self.value)?;
        record.serialize_field("valueDisplay", &self.value_display())?;
        record.serialize_field("notifying", &self.notifying)?;
        record.end()
    }
}

/// A discovered GATT service of the active peripheral.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub uuid: Uuid,
    pub name: &'static str,
    /// Peripheral the service was discovered on; the record does not own it
    pub peripheral: PeripheralId,
    /// Empty until characteristics are discovered for this service
    pub characteristics: Vec<CharacteristicRecord>,
}

impl ServiceRecord {
    pub fn new(peripheral: PeripheralId, uuid: Uuid) -> Self {
        Self {
            uuid,
            name: uuids::name_for(&uuid),
            peripheral,
            characteristics: Vec::new(),
        }
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&CharacteristicRecord> {
        self.characteristics.iter().find(|c| &c.uuid == uuid)
    }

    pub fn characteristic_mut(&mut self, uuid: &Uuid) -> Option<&mut CharacteristicRecord> {
        self.characteristics.iter_mut().find(|c| &c.uuid == uuid)
    }
}
