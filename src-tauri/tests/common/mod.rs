//! Test double for the platform backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use ble_service_browser_lib::config::BrowserConfig;
use ble_service_browser_lib::core::bluetooth::events::PlatformEventSender;
use ble_service_browser_lib::core::bluetooth::pairing::{PairingCoordinator, PairingRequest, PairingResponse};
use ble_service_browser_lib::core::bluetooth::{
    BlePlatform, BluetoothManager, EventBus, PeripheralId, PlatformEvent, WriteKind,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    StartScan(Duration),
    StopScan,
    Connect(PeripheralId),
    Disconnect(PeripheralId),
    Pair(PeripheralId),
    DiscoverServices(PeripheralId),
    DiscoverCharacteristics(PeripheralId, Uuid),
    Read(PeripheralId, Uuid, Uuid),
    Write(PeripheralId, Uuid, Uuid, Vec<u8>, WriteKind),
    SetNotify(PeripheralId, Uuid, Uuid, bool),
}

/// Records every request. With a sender attached, `pair` runs a PIN-entry
/// ceremony and reports its outcome like a real stack would.
#[derive(Default)]
pub struct FakePlatform {
    calls: Mutex<Vec<Call>>,
    pub adapter_off: AtomicBool,
    pub refuse_connect: AtomicBool,
    sender: Option<PlatformEventSender>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_sender(sender: PlatformEventSender) -> Arc<Self> {
        Arc::new(Self {
            sender: Some(sender),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlePlatform for FakePlatform {
    async fn start_scan(&self, duration: Duration, _cycle: u64) -> Result<()> {
        if self.adapter_off.load(Ordering::SeqCst) {
            bail!("adapter is powered off");
        }
        self.record(Call::StartScan(duration));
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.record(Call::StopScan);
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> Result<()> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            bail!("connect refused");
        }
        self.record(Call::Connect(id.clone()));
        Ok(())
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<()> {
        self.record(Call::Disconnect(id.clone()));
        Ok(())
    }

    async fn pair(&self, id: &PeripheralId, pairing: Arc<PairingCoordinator>) -> Result<()> {
        self.record(Call::Pair(id.clone()));
        if let Some(sender) = self.sender.clone() {
            let id = id.clone();
            tokio::spawn(async move {
                let result = match pairing.handle(PairingRequest::ProvidePin).await {
                    PairingResponse::AcceptWithPin(pin) if pin == "123456" => Ok(()),
                    _ => Err("authentication failed".to_string()),
                };
                let _ = sender.send(PlatformEvent::PairingCompleted { id, result });
            });
        }
        Ok(())
    }

    async fn discover_services(&self, id: &PeripheralId) -> Result<()> {
        self.record(Call::DiscoverServices(id.clone()));
        Ok(())
    }

    async fn discover_characteristics(&self, id: &PeripheralId, service: Uuid) -> Result<()> {
        self.record(Call::DiscoverCharacteristics(id.clone(), service));
        Ok(())
    }

    async fn read(&self, id: &PeripheralId, service: Uuid, characteristic: Uuid) -> Result<()> {
        self.record(Call::Read(id.clone(), service, characteristic));
        Ok(())
    }

    async fn write(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        value: Vec<u8>,
        kind: WriteKind,
    ) -> Result<()> {
        self.record(Call::Write(id.clone(), service, characteristic, value, kind));
        Ok(())
    }

    async fn set_notify(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        enabled: bool,
    ) -> Result<()> {
        self.record(Call::SetNotify(id.clone(), service, characteristic, enabled));
        Ok(())
    }
}

pub fn manager_with(platform: Arc<FakePlatform>, config: BrowserConfig) -> BluetoothManager {
    BluetoothManager::new(platform, config, EventBus::new())
}

pub fn discovered(id: &str, name: Option<&str>, rssi: i16) -> PlatformEvent {
    PlatformEvent::Discovered {
        id: PeripheralId::from(id),
        name: name.map(str::to_string),
        rssi: Some(rssi),
    }
}
