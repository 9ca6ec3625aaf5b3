//! `BlePlatform` backed by the bluest crate (CoreBluetooth, WinRT, BlueZ).
//!
//! Every request is issued on a spawned task; its completion is reported back
//! as a [`PlatformEvent`]. Device, service and characteristic handles stay
//! here, keyed by peripheral id and UUIDs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use bluest::pairing::{IoCapability, PairingAgent, PairingRejected, Passkey};
use bluest::{Adapter, Characteristic, Device, Service};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::constants::MAX_PASSKEY;
use crate::core::bluetooth::events::{PlatformEvent, PlatformEventSender};
use crate::core::bluetooth::pairing::{PairingCoordinator, PairingRequest, PairingResponse};
use crate::core::bluetooth::platform::BlePlatform;
use crate::core::bluetooth::types::{
    CharacteristicProperties, DiscoveredCharacteristic, PeripheralId, PeripheralUpdate, WriteKind,
};

type CharacteristicKey = (PeripheralId, Uuid, Uuid);

struct ScanTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct BluestPlatform {
    adapter: Adapter,
    events: PlatformEventSender,
    devices: Arc<Mutex<HashMap<PeripheralId, Device>>>,
    services: Arc<Mutex<HashMap<(PeripheralId, Uuid), Service>>>,
    characteristics: Arc<Mutex<HashMap<CharacteristicKey, Characteristic>>>,
    subscriptions: Mutex<HashMap<CharacteristicKey, CancellationToken>>,
    scan_task: Mutex<Option<ScanTask>>,
}

impl BluestPlatform {
    /// Opens the default adapter. Availability is checked when a scan starts.
    pub async fn new(events: PlatformEventSender) -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;
        info!("Bluetooth adapter opened.");
        Ok(Self {
            adapter,
            events,
            devices: Arc::new(Mutex::new(HashMap::new())),
            services: Arc::new(Mutex::new(HashMap::new())),
            characteristics: Arc::new(Mutex::new(HashMap::new())),
            subscriptions: Mutex::new(HashMap::new()),
            scan_task: Mutex::new(None),
        })
    }

    fn device(&self, id: &PeripheralId) -> Result<Device> {
        lock(&self.devices)
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("Device not found with ID: {}", id))
    }

    fn characteristic(&self, id: &PeripheralId, service: Uuid, characteristic: Uuid) -> Result<Characteristic> {
        lock(&self.characteristics)
            .get(&(id.clone(), service, characteristic))
            .cloned()
            .ok_or_else(|| anyhow!("Characteristic not found: {}", characteristic))
    }

    async fn internal_scan_task(
        adapter: Adapter,
        devices: Arc<Mutex<HashMap<PeripheralId, Device>>>,
        events: PlatformEventSender,
        cancel_token: CancellationToken,
        duration: Duration,
        cycle: u64,
    ) {
        // Already-connected peripherals do not advertise; list them first.
        match adapter.connected_devices().await {
            Ok(connected) => {
                for device in connected {
                    Self::report_device(&devices, &events, device, None, None).await;
                }
            }
            Err(e) => debug!("Could not list connected devices: {}", e),
        }

        info!("Starting bluetooth scan");
        let mut scan_stream = match adapter.scan(&[]).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to start bluetooth scan: {}", e);
                let _ = events.send(PlatformEvent::ScanCompleted { cycle });
                return;
            }
        };

        let window = tokio::time::sleep(duration);
        tokio::pin!(window);

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered) => {
                            debug!("Found device - Device: {:?}, RSSI: {:?}", discovered.device, discovered.rssi);
                            Self::report_device(
                                &devices,
                                &events,
                                discovered.device,
                                discovered.rssi,
                                discovered.adv_data.local_name,
                            ).await;
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = &mut window => {
                    info!("Scan window elapsed.");
                    break;
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }

        let _ = events.send(PlatformEvent::ScanCompleted { cycle });
    }

    async fn report_device(
        devices: &Arc<Mutex<HashMap<PeripheralId, Device>>>,
        events: &PlatformEventSender,
        device: Device,
        rssi: Option<i16>,
        local_name: Option<String>,
    ) {
        let id = PeripheralId::new(device.id().to_string());
        let name = device.name().ok().or(local_name);
        let is_paired = device.is_paired().await.ok();

        lock(devices).insert(id.clone(), device);

        let _ = events.send(PlatformEvent::Discovered {
            id: id.clone(),
            name,
            rssi,
        });
        if is_paired.is_some() {
            let _ = events.send(PlatformEvent::Updated {
                id,
                update: PeripheralUpdate {
                    is_paired,
                    ..Default::default()
                },
            });
        }
    }
}

#[async_trait::async_trait]
impl BlePlatform for BluestPlatform {
    async fn start_scan(&self, duration: Duration, cycle: u64) -> Result<()> {
        if !self.adapter.is_available().await? {
            bail!("Bluetooth adapter is powered off or unauthorized");
        }
        self.stop_scan().await?;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(Self::internal_scan_task(
            self.adapter.clone(),
            self.devices.clone(),
            self.events.clone(),
            cancel_token.clone(),
            duration,
            cycle,
        ));

        *lock(&self.scan_task) = Some(ScanTask {
            cancel_token,
            handle,
        });
        info!("Device scan task for cycle {} started.", cycle);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        let task = lock(&self.scan_task).take();
        let Some(task) = task else {
            debug!("No active scan task handle found to wait for.");
            return Ok(());
        };

        task.cancel_token.cancel();
        info!("Waiting for scan task to finish...");
        if let Err(e) = task.handle.await {
            if e.is_cancelled() {
                info!("Scan task was cancelled successfully.");
            } else {
                error!("Scan task finished with an unexpected join error: {:?}", e);
            }
        }
        Ok(())
    }

    async fn connect(&self, id: &PeripheralId) -> Result<()> {
        let device = self.device(id)?;
        let adapter = self.adapter.clone();
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            if device.is_connected().await {
                let _ = events.send(PlatformEvent::Connected { id });
                return;
            }
            info!("Initiating connection to {}...", id);
            let event = match adapter.connect_device(&device).await {
                Ok(()) => PlatformEvent::Connected { id },
                Err(e) => PlatformEvent::ConnectFailed {
                    id,
                    reason: e.to_string(),
                },
            };
            let _ = events.send(event);
        });
        Ok(())
    }

    async fn disconnect(&self, id: &PeripheralId) -> Result<()> {
        let device = self.device(id)?;
        let adapter = self.adapter.clone();
        let events = self.events.clone();
        let id = id.clone();

        // Subscriptions die with the link.
        lock(&self.subscriptions).retain(|(peripheral, _, _), token| {
            if peripheral == &id {
                token.cancel();
                false
            } else {
                true
            }
        });

        tokio::spawn(async move {
            if let Err(e) = adapter.disconnect_device(&device).await {
                warn!("Disconnecting from {} failed: {}", id, e);
            }
            let _ = events.send(PlatformEvent::Disconnected { id });
        });
        Ok(())
    }

    async fn pair(&self, id: &PeripheralId, pairing: Arc<PairingCoordinator>) -> Result<()> {
        let device = self.device(id)?;
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            let agent = CoordinatorAgent { pairing };
            let result = device
                .pair_with_agent(&agent)
                .await
                .map_err(|e| e.to_string());
            let _ = events.send(PlatformEvent::PairingCompleted { id, result });
        });
        Ok(())
    }

    async fn discover_services(&self, id: &PeripheralId) -> Result<()> {
        let device = self.device(id)?;
        let services = self.services.clone();
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            let result = match device.discover_services().await {
                Ok(found) => {
                    let mut cache = lock(&services);
                    cache.retain(|(peripheral, _), _| peripheral != &id);
                    let uuids = found
                        .into_iter()
                        .map(|service| {
                            let uuid = service.uuid();
                            cache.insert((id.clone(), uuid), service);
                            uuid
                        })
                        .collect();
                    Ok(uuids)
                }
                Err(e) => Err(e.to_string()),
            };
            let _ = events.send(PlatformEvent::ServicesDiscovered { id, result });
        });
        Ok(())
    }

    async fn discover_characteristics(&self, id: &PeripheralId, service: Uuid) -> Result<()> {
        let handle = lock(&self.services)
            .get(&(id.clone(), service))
            .cloned()
            .ok_or_else(|| anyhow!("Service not found: {}", service))?;
        let characteristics = self.characteristics.clone();
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            let result = match handle.discover_characteristics().await {
                Ok(found) => {
                    let mut discovered = Vec::with_capacity(found.len());
                    for characteristic in found {
                        let properties = characteristic
                            .properties()
                            .await
                            .map(|p| CharacteristicProperties::from_bits((p.to_bits() & 0xff) as u8))
                            .unwrap_or_default();
                        let uuid = characteristic.uuid();
                        lock(&characteristics).insert((id.clone(), service, uuid), characteristic);
                        discovered.push(DiscoveredCharacteristic { uuid, properties });
                    }
                    Ok(discovered)
                }
                Err(e) => Err(e.to_string()),
            };
            let _ = events.send(PlatformEvent::CharacteristicsDiscovered {
                id,
                service,
                result,
            });
        });
        Ok(())
    }

    async fn read(&self, id: &PeripheralId, service: Uuid, characteristic: Uuid) -> Result<()> {
        let handle = self.characteristic(id, service, characteristic)?;
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            let result = handle.read().await.map_err(|e| e.to_string());
            let _ = events.send(PlatformEvent::ValueUpdated {
                id,
                service,
                characteristic,
                result,
            });
        });
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
        let handle = self.characteristic(id, service, characteristic)?;
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            let result = match kind {
                WriteKind::WithResponse => handle.write(&value).await,
                WriteKind::WithoutResponse => handle.write_without_response(&value).await,
            };
            let _ = events.send(PlatformEvent::WriteCompleted {
                id,
                service,
                characteristic,
                result: result.map_err(|e| e.to_string()),
            });
        });
        Ok(())
    }

    async fn set_notify(
        &self,
        id: &PeripheralId,
        service: Uuid,
        characteristic: Uuid,
        enabled: bool,
    ) -> Result<()> {
        let key = (id.clone(), service, characteristic);

        if !enabled {
            match lock(&self.subscriptions).remove(&key) {
                Some(token) => token.cancel(),
                None => debug!("{} has no active subscription", characteristic),
            }
            return Ok(());
        }

        let handle = self.characteristic(id, service, characteristic)?;
        let cancel_token = {
            let mut subscriptions = lock(&self.subscriptions);
            if subscriptions.contains_key(&key) {
                debug!("Already subscribed to {}", characteristic);
                return Ok(());
            }
            let token = CancellationToken::new();
            subscriptions.insert(key, token.clone());
            token
        };
        let events = self.events.clone();
        let id = id.clone();

        tokio::spawn(async move {
            Self::process_notifications(handle, id, service, events, cancel_token).await;
        });
        Ok(())
    }
}

impl BluestPlatform {
    /// Forwards notifications until cancelled or the stream ends.
    async fn process_notifications(
        handle: Characteristic,
        id: PeripheralId,
        service: Uuid,
        events: PlatformEventSender,
        cancel_token: CancellationToken,
    ) {
        let characteristic = handle.uuid();
        info!("Subscribing to notifications of {}...", characteristic);

        match handle.notify().await {
            Ok(mut notification_stream) => {
                let _ = events.send(PlatformEvent::NotifyStateChanged {
                    id: id.clone(),
                    service,
                    characteristic,
                    enabled: true,
                });
                loop {
                    tokio::select! {
                        next = notification_stream.next() => match next {
                            Some(result) => {
                                let _ = events.send(PlatformEvent::ValueUpdated {
                                    id: id.clone(),
                                    service,
                                    characteristic,
                                    result: result.map_err(|e| e.to_string()),
                                });
                            }
                            None => break,
                        },
                        _ = cancel_token.cancelled() => break,
                    }
                }
            }
            Err(e) => {
                error!("Failed to subscribe to notifications: {}", e);
            }
        }

        info!("Notification stream of {} ended", characteristic);
        let _ = events.send(PlatformEvent::NotifyStateChanged {
            id,
            service,
            characteristic,
            enabled: false,
        });
    }
}

/// Answers bluest pairing callbacks through the [`PairingCoordinator`].
struct CoordinatorAgent {
    pairing: Arc<PairingCoordinator>,
}

#[async_trait::async_trait]
impl PairingAgent for CoordinatorAgent {
    fn io_capability(&self) -> IoCapability {
        IoCapability::KeyboardDisplay
    }

    async fn confirm(&self, _device: &Device) -> Result<(), PairingRejected> {
        accepted(self.pairing.handle(PairingRequest::ConfirmOnly).await)
    }

    async fn confirm_passkey(&self, _device: &Device, passkey: Passkey) -> Result<(), PairingRejected> {
        let request = PairingRequest::ConfirmPinMatch {
            pin: passkey.to_string(),
        };
        accepted(self.pairing.handle(request).await)
    }

    async fn request_passkey(&self, _device: &Device) -> Result<Passkey, PairingRejected> {
        match self.pairing.handle(PairingRequest::ProvidePin).await {
            PairingResponse::AcceptWithPin(pin) => match pin.trim().parse::<u32>() {
                Ok(value) if value <= MAX_PASSKEY => Ok(Passkey::new(value)),
                _ => {
                    warn!("Rejecting malformed PIN");
                    Err(PairingRejected::default())
                }
            },
            _ => Err(PairingRejected::default()),
        }
    }

    fn display_passkey(&self, _device: &Device, passkey: Passkey) {
        self.pairing.display_pin(passkey.to_string());
    }
}

fn accepted(response: PairingResponse) -> Result<(), PairingRejected> {
    match response {
        PairingResponse::Accept | PairingResponse::AcceptWithPin(_) => Ok(()),
        PairingResponse::Reject => Err(PairingRejected::default()),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
