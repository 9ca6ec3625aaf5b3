//! BLE Service Browser library
//! Scans for Bluetooth Low Energy peripherals, connects and pairs with them,
//! and browses their GATT services and characteristics.

// Module declarations
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod state;
pub mod utils;

#[cfg(feature = "gui")]
pub mod commands;

#[cfg(feature = "gui")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use log::{error, info};
    use tauri::Manager;

    use crate::state::AppState;

    tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            commands::start_scan,
            commands::stop_scan,
            commands::list_peripherals,
            commands::connect_peripheral,
            commands::disconnect_peripheral,
            commands::pair_peripheral,
            commands::provide_pin,
            commands::confirm_pin_match,
            commands::list_services,
            commands::discover_services,
            commands::discover_characteristics,
            commands::read_characteristic,
            commands::write_characteristic,
            commands::set_notify,
            commands::set_indicate,
            commands::get_config,
            commands::save_config,
        ])
        .setup(|app| {
            let config_dir = app.path().app_config_dir()?;
            let app_state = tauri::async_runtime::block_on(async {
                info!("Starting AppState initialization in Tauri setup.");
                AppState::new(config_dir).await
            })
            .map_err(|e| {
                error!("Failed to initialize AppState: {}", e);
                format!("Failed to initialize AppState with BluetoothManager: {}", e)
            })?;

            let level = tauri::async_runtime::block_on(async {
                app_state.bluetooth_manager.lock().await.config().level_filter()
            });
            if logging::TauriLogger::init(app.handle().clone(), level).is_err() {
                logging::init_logging(level);
            }

            commands::forward_browser_events(app.handle().clone(), &app_state.events);
            app.manage(app_state);
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
