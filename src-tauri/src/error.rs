//! Error types shared by the browser core.

use thiserror::Error;
use uuid::Uuid;

/// Errors reported by browser operations.
///
/// Connection, pairing and discovery failures are terminal *states* published
/// as events; this type only covers requests that could not be issued at all.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The adapter is powered off, unauthorized or missing.
    #[error("Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("Peripheral not found with ID: {0}")]
    UnknownPeripheral(String),

    #[error("No peripheral is currently active")]
    NoActivePeripheral,

    #[error("Service not found: {0}")]
    ServiceNotFound(Uuid),

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(Uuid),

    /// The characteristic's properties do not allow the requested action.
    #[error("Characteristic {characteristic} does not support {action}")]
    NotSupported {
        characteristic: Uuid,
        action: &'static str,
    },

    #[error("Write payload is empty")]
    EmptyPayload,

    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Platform error: {0}")]
    Platform(#[from] anyhow::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrowserError>;
