//! Application state management
//! This module defines and manages the global application state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::BrowserConfig;
use crate::core::bluetooth::events::PlatformEventReceiver;
use crate::core::bluetooth::{BlePlatform, EventBus, PairingCoordinator};
use crate::core::BluetoothManager;

/// Global application state
pub struct AppState {
    /// The Bluetooth manager instance
    pub bluetooth_manager: Arc<Mutex<BluetoothManager>>,
    /// Pairing answers bypass the manager lock.
    pub pairing: Arc<PairingCoordinator>,
    pub events: EventBus,
    pub config_dir: PathBuf,
    cancel_token: CancellationToken,
}

impl AppState {
    /// Builds the state around `platform` and starts applying the events it
    /// sends on `receiver`. Must be called inside a tokio runtime.
    pub fn with_platform(
        platform: Arc<dyn BlePlatform>,
        receiver: PlatformEventReceiver,
        config: BrowserConfig,
        config_dir: PathBuf,
    ) -> Self {
        let events = EventBus::new();
        let manager = BluetoothManager::new(platform, config, events.clone());
        let pairing = manager.pairing();
        let bluetooth_manager = Arc::new(Mutex::new(manager));
        let cancel_token = CancellationToken::new();

        tokio::spawn(BluetoothManager::run_event_loop(
            bluetooth_manager.clone(),
            receiver,
            cancel_token.clone(),
        ));

        Self {
            bluetooth_manager,
            pairing,
            events,
            config_dir,
            cancel_token,
        }
    }

    /// Opens the system adapter and loads the saved config.
    #[cfg(feature = "bluest")]
    pub async fn new(config_dir: PathBuf) -> Result<Self> {
        use crate::core::bluetooth::{platform_channel, BluestPlatform};

        let config = BrowserConfig::load_config(&config_dir).await?;
        info!("Initializing BluetoothManager...");
        let (sender, receiver) = platform_channel();
        let platform = BluestPlatform::new(sender).await?;
        Ok(Self::with_platform(
            Arc::new(platform),
            receiver,
            config,
            config_dir,
        ))
    }

    /// Applies `config` to the running manager and persists it.
    pub async fn save_config(&self, config: BrowserConfig) -> Result<()> {
        config.save_config(&self.config_dir).await?;
        self.bluetooth_manager.lock().await.set_config(config);
        info!("Browser config updated.");
        Ok(())
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        self.pairing.cancel();
        self.cancel_token.cancel();
    }
}
