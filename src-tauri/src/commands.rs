//! Tauri commands
//! This module defines all the commands that can be invoked from the frontend.
//! Results arrive asynchronously as `browser-event` events; see
//! [`forward_browser_events`].

use log::{debug, error, warn};
use tauri::{AppHandle, Emitter, State};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::config::BrowserConfig;
use crate::core::bluetooth::{
    EventBus, PeripheralId, PeripheralRecord, ServiceRecord, WriteKind,
};
use crate::state::AppState;

/// Starts a scan cycle. Clears the peripheral list and emits
/// `scanStarted`, then `peripheralAdded` per new peripheral and finally
/// `scanCompleted`.
#[tauri::command]
pub async fn start_scan(app_state: State<'_, AppState>) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .start_scan()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn stop_scan(app_state: State<'_, AppState>) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .stop_scan()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn list_peripherals(
    app_state: State<'_, AppState>,
) -> Result<Vec<PeripheralRecord>, String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    Ok(bluetooth_manager_guard.peripherals().to_vec())
}

/// Connects to a peripheral from the current list
///
/// # Arguments
/// * `device_id` - The platform identifier of the peripheral
/// * `app_state` - The application state
#[tauri::command]
pub async fn connect_peripheral(
    device_id: String,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .connect(&PeripheralId::new(device_id))
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn disconnect_peripheral(
    device_id: String,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .disconnect(&PeripheralId::new(device_id))
        .await
        .map_err(|e| e.to_string())
}

/// Starts pairing. Prompts arrive as `pairingPrompt` events and are
/// answered with [`provide_pin`] or [`confirm_pin_match`].
#[tauri::command]
pub async fn pair_peripheral(
    device_id: String,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .pair(&PeripheralId::new(device_id))
        .await
        .map_err(|e| e.to_string())
}

/// Answers a PIN request. `None` or an empty PIN rejects the pairing.
/// Returns false when no PIN was being asked for.
#[tauri::command]
pub fn provide_pin(pin: Option<String>, app_state: State<'_, AppState>) -> bool {
    app_state.pairing.provide_pin(pin)
}

#[tauri::command]
pub fn confirm_pin_match(accept: bool, app_state: State<'_, AppState>) -> bool {
    app_state.pairing.confirm_pin_match(accept)
}

#[tauri::command]
pub async fn list_services(app_state: State<'_, AppState>) -> Result<Vec<ServiceRecord>, String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    Ok(bluetooth_manager_guard.services().to_vec())
}

#[tauri::command]
pub async fn discover_services(app_state: State<'_, AppState>) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .discover_services()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn discover_characteristics(
    service: Uuid,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let mut bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .discover_characteristics(service)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn read_characteristic(
    service: Uuid,
    characteristic: Uuid,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .read_characteristic(service, characteristic)
        .await
        .map_err(|e| e.to_string())
}

/// Writes a hex-encoded payload, e.g. `"0102ff"`.
#[tauri::command]
pub async fn write_characteristic(
    service: Uuid,
    characteristic: Uuid,
    payload: String,
    kind: WriteKind,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .write_characteristic(service, characteristic, &payload, kind)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_notify(
    service: Uuid,
    characteristic: Uuid,
    enabled: bool,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .set_notify(service, characteristic, enabled)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn set_indicate(
    service: Uuid,
    characteristic: Uuid,
    enabled: bool,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    bluetooth_manager_guard
        .set_indicate(service, characteristic, enabled)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_config(app_state: State<'_, AppState>) -> Result<BrowserConfig, String> {
    let bluetooth_manager_guard = app_state.bluetooth_manager.lock().await;
    Ok(bluetooth_manager_guard.config().clone())
}

#[tauri::command]
pub async fn save_config(
    config: BrowserConfig,
    app_state: State<'_, AppState>,
) -> Result<(), String> {
    app_state
        .save_config(config)
        .await
        .map_err(|e| e.to_string())
}

/// Re-emits every browser event to the frontend as `browser-event`.
pub fn forward_browser_events(app_handle: AppHandle, events: &EventBus) {
    let mut receiver = events.subscribe();
    tauri::async_runtime::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = app_handle.emit("browser-event", &event) {
                        error!("Failed to emit browser event: {}", e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event forwarder lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("Browser event bus closed.");
                    break;
                }
            }
        }
    });
}
