//! Constants used throughout the application
//! This module contains the constant values shared by the Bluetooth layer,
//! such as the Bluetooth base UUID, scan timing and channel sizes.

use uuid::Uuid;

use crate::core::bluetooth::uuids::expand_short_uuid;

/// The Bluetooth base UUID, `0000xxxx-0000-1000-8000-00805f9b34fb`.
pub const BLUETOOTH_BASE_UUID: Uuid = Uuid::from_u128(0x00000000_0000_1000_8000_00805f9b34fb);

/// Name returned for 16-bit UUIDs that are not in the GATT table
pub const CUSTOM_PROFILE_NAME: &str = "Custom Profile";

/// Name shown for peripherals that do not advertise one
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown";

/// Standard Bluetooth Service UUIDs
pub const UUID_GENERIC_ACCESS_SERVICE: Uuid = expand_short_uuid(0x1800);
pub const UUID_BATTERY_SERVICE: Uuid = expand_short_uuid(0x180F);

/// Standard Bluetooth Characteristic UUIDs
pub const UUID_BATTERY_LEVEL: Uuid = expand_short_uuid(0x2A19);

/// Scan duration in seconds
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 2;

/// Capacity of the broadcast channel carrying browser events to subscribers
pub const BROWSER_EVENT_CAPACITY: usize = 256;

/// Largest passkey a pairing ceremony accepts (six decimal digits)
pub const MAX_PASSKEY: u32 = 999_999;
