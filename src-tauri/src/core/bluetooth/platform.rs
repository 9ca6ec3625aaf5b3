//! Boundary to the operating system's Bluetooth stack.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use uuid::Uuid;

use crate::core::bluetooth::pairing::PairingCoordinator;
use crate::core::bluetooth::types::{PeripheralId, WriteKind};

/// Requests the browser issues to the platform Bluetooth stack.
///
/// Each method only *issues* the request. Completion, success or failure,
/// arrives later as a [`PlatformEvent`](crate::core::bluetooth::PlatformEvent)
/// on the channel the implementation was built with. An `Err` here means the
/// request could not be issued at all.
#[async_trait::async_trait]
pub trait BlePlatform: Send + Sync {
    /// Starts scan cycle `cycle` lasting `duration`, replacing any running
    /// scan; fails if the adapter is powered off or unavailable. The end of
    /// the cycle is reported as `ScanCompleted { cycle }`.
    async fn start_scan(&self, duration: Duration, cycle: u64) -> Result<()>;

    async fn stop_scan(&self) -> Result<()>;

    async fn connect(&self, id: &PeripheralId) -> Result<()>;

    async fn disconnect(&self, id: &PeripheralId) -> Result<()>;

    /// Runs the pairing ceremony, answering steps through `pairing`.
    async fn pair(&self, id: &PeripheralId, pairing: Arc<PairingCoordinator>) -> Result<()>;

    async fn discover_services(&self, id: &PeripheralId) -> Result<()>;

    async fn discover_characteristics(&self, id: &PeripheralId, service: Uuid) -> Result<()>;

    async fn read(&self, id: &PeripheralId, service: Uuid, characteristic: Uuid) -> Result<()>;

    async fn write(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
        kind: WriteKind,
    ) -> Result<()>;

    /// Subscribes to or unsubscribes from value changes.
    async fn set_notify(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        enabled: bool,
    ) -> Result<()>;
}
