//! Core functionality for the BLE Service Browser

pub mod bluetooth;

// Re-export commonly used types
pub use bluetooth::BluetoothManager;
