//! Well-known GATT UUID names.
//!
//! Services and characteristics defined by the Bluetooth SIG are identified by
//! 16-bit UUIDs embedded in the Bluetooth base UUID. Everything else is a
//! vendor ("custom") profile.

use uuid::Uuid;

use crate::core::bluetooth::constants::{BLUETOOTH_BASE_UUID, CUSTOM_PROFILE_NAME};

/// Returns the GATT name for a 16-bit UUID, or `"Custom Profile"`.
pub fn gatt_name(short: u16) -> &'static str {
    match short {
        0x1800 => "Generic Access",
        0x1801 => "Generic Attribute",
        0x1802 => "Immediate Alert",
        0x1803 => "Link Loss",
        0x1804 => "Tx Power",
        0x1805 => "Current Time Service",
        0x1806 => "Reference Time Update Service",
        0x1807 => "Next DST Change Service",
        0x1808 => "Glucose",
        0x1809 => "Health Thermometer",
        0x180A => "Device Information",
        0x180B => "Network Availability Service",
        0x180C => "Watchdog",
        0x180D => "Heart Rate",
        0x180E => "Phone Alert Status Service",
        0x180F => "Battery Service",
        0x1810 => "Blood Pressure",
        0x1811 => "Alert Notification Service",
        0x1812 => "Human Interface Device",
        0x1813 => "Scan Parameters",
        0x1814 => "Running Speed and Cadence",
        0x1815 => "Automation IO",
        0x1816 => "Cycling Speed and Cadence",
        0x1817 => "Pulse Oximeter",
        0x1818 => "Cycling Power Service",
        0x1819 => "Location and Navigation Service",
        0x181A => "Continuous Glucose Measurement Service",
        0x2A00 => "Device Name",
        0x2A01 => "Appearance",
        0x2A02 => "Peripheral Privacy Flag",
        0x2A03 => "Reconnection Address",
        0x2A04 => "Peripheral Preferred Connection Parameters",
        0x2A05 => "Service Changed",
        0x2A06 => "Alert Level",
        0x2A07 => "Tx Power Level",
        0x2A08 => "Date Time",
        0x2A09 => "Day of Week",
        0x2A0A => "Day Date Time",
        0x2A0B => "Exact Time 100",
        0x2A0C => "Exact Time 256",
        0x2A0D => "DST Offset",
        0x2A0E => "Time Zone",
        0x2A0F => "Local Time Information",
        0x2A10 => "Secondary Time Zone",
        0x2A11 => "Time with DST",
        0x2A12 => "Time Accuracy",
        0x2A13 => "Time Source",
        0x2A14 => "Reference Time Information",
        0x2A15 => "Time Broadcast",
        0x2A16 => "Time Update Control Point",
        0x2A17 => "Time Update State",
        0x2A18 => "Glucose Measurement",
        0x2A19 => "Battery Level",
        0x2A1A => "Battery Power State",
        0x2A1B => "Battery Level State",
        0x2A1C => "Temperature Measurement",
        0x2A1D => "Temperature Type",
        0x2A1E => "Intermediate Temperature",
        0x2A1F => "Temperature in Celsius",
        0x2A20 => "Temperature in Fahrenheit",
        0x2A21 => "Measurement Interval",
        0x2A22 => "Boot Keyboard Input Report",
        0x2A23 => "System ID",
        0x2A24 => "Model Number String",
        0x2A25 => "Serial Number String",
        0x2A26 => "Firmware Revision String",
        0x2A27 => "Hardware Revision String",
        0x2A28 => "Software Revision String",
        0x2A29 => "Manufacturer Name String",
        0x2A2A => "IEEE 11073-20601 Regulatory Certification Data List",
        0x2A2B => "Current Time",
        0x2A2C => "Elevation",
        0x2A2D => "Latitude",
        0x2A2E => "Longitude",
        0x2A2F => "Position 2D",
        0x2A30 => "Position 3D",
        0x2A31 => "Scan Refresh",
        0x2A32 => "Boot Keyboard Output Report",
        0x2A33 => "Boot Mouse Input Report",
        0x2A34 => "Glucose Measurement Context",
        0x2A35 => "Blood Pressure Measurement",
        0x2A36 => "Intermediate Cuff Pressure",
        0x2A37 => "Heart Rate Measurement",
        0x2A38 => "Body Sensor Location",
        0x2A39 => "Heart Rate Control Point",
        0x2A3A => "Removable",
        0x2A3B => "Service Required",
        0x2A3C => "Scientific Temperature in Celsius",
        0x2A3D => "String",
        0x2A3E => "Network Availability",
        0x2A3F => "Alert Status",
        0x2A40 => "Ringer Control Point",
        0x2A41 => "Ringer Setting",
        0x2A42 => "Alert Category ID Bit Mask",
        0x2A43 => "Alert Category ID",
        0x2A44 => "Alert Notification Control Point",
        0x2A45 => "Unread Alert Status",
        0x2A46 => "New Alert",
        0x2A47 => "Supported New Alert Category",
        0x2A48 => "Supported Unread Alert Category",
        0x2A49 => "Blood Pressure Feature",
        0x2A4A => "HID Information",
        0x2A4B => "Report Map",
        0x2A4C => "HID Control Point",
        0x2A4D => "Report",
        0x2A4E => "Protocol Mode",
        0x2A4F => "Scan Interval Window",
        0x2A50 => "PnP ID",
        0x2A51 => "Glucose Features",
        0x2A52 => "Record Access Control Point",
        0x2A53 => "RSC Measurement",
        0x2A54 => "RSC Feature",
        0x2A55 => "SC Control Point",
        0x2A56 => "Digital Input",
        0x2A57 => "Digital Output",
        0x2A58 => "Analog Input",
        0x2A59 => "Analog Output",
        0x2A5A => "Aggregate Input",
        0x2A5B => "CSC Measurement",
        0x2A5C => "CSC Feature",
        0x2A5D => "Sensor Location",
        0x2A5E => "Pulse Oximetry Spot-check Measurement",
        0x2A5F => "Pulse Oximetry Continuous Measurement",
        0x2A60 => "Pulse Oximetry Pulsatile Event",
        0x2A61 => "Pulse Oximetry Features",
        0x2A62 => "Pulse Oximetry Control Point",
        0x2A63 => "Cycling Power Measurement Characteristic",
        0x2A64 => "Cycling Power Vector Characteristic",
        0x2A65 => "Cycling Power Feature Characteristic",
        0x2A66 => "Cycling Power Control Point Characteristic",
        0x2A67 => "Location and Speed Characteristic",
        0x2A68 => "Navigation Characteristic",
        0x2A69 => "Position Quality Characteristic",
        0x2A6A => "LN Feature Characteristic",
        0x2A6B => "LN Control Point Characteristic",
        0x2A6C => "CGM Measurement Characteristic",
        0x2A6D => "CGM Features Characteristic",
        0x2A6E => "CGM Status Characteristic",
        0x2A6F => "CGM Session Start Time Characteristic",
        0x2A70 => "Application Security Point Characteristic",
        0x2A71 => "CGM Specific Ops Control Point Characteristic",
        _ => CUSTOM_PROFILE_NAME,
    }
}

/// Returns the 16-bit form of `uuid` if it lies in the Bluetooth base range.
pub fn short_uuid(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let base = BLUETOOTH_BASE_UUID.as_u128();
    // Bits 96..128 hold the short value; everything else must match the base.
    let mask = !(0xffff_ffffu128 << 96);
    if value & mask != base & mask {
        return None;
    }
    u16::try_from(value >> 96).ok()
}

/// Expands a 16-bit UUID into the Bluetooth base UUID.
pub const fn expand_short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID.as_u128() | ((short as u128) << 96))
}

/// Resolves a UUID to a display name; vendor UUIDs are custom profiles.
pub fn name_for(uuid: &Uuid) -> &'static str {
    short_uuid(uuid).map(gatt_name).unwrap_or(CUSTOM_PROFILE_NAME)
}

/// Formats a UUID the way the browser lists it: `0x180F` for base-range
/// UUIDs, the hyphenated form otherwise.
pub fn display_uuid(uuid: &Uuid) -> String {
    match short_uuid(uuid) {
        Some(short) => format!("0x{:04X}", short),
        None => uuid.hyphenated().to_string(),
    }
}
