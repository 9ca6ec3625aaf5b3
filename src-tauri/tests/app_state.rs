mod common;

use std::time::Duration;

use ble_service_browser_lib::config::BrowserConfig;
use ble_service_browser_lib::core::bluetooth::pairing::PairingKind;
use ble_service_browser_lib::core::bluetooth::{platform_channel, BrowserEvent, PeripheralId};
use ble_service_browser_lib::state::AppState;
use tokio::sync::broadcast;

use common::{discovered, FakePlatform};

async fn wait_for(
    receiver: &mut broadcast::Receiver<BrowserEvent>,
    wanted: impl Fn(&BrowserEvent) -> bool,
) -> BrowserEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = receiver.recv().await.unwrap();
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event was not published")
}

async fn paired_with_pin(pin: &str) -> (bool, bool) {
    let (sender, receiver) = platform_channel();
    let platform = FakePlatform::with_sender(sender.clone());
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_platform(
        platform,
        receiver,
        BrowserConfig::default(),
        dir.path().to_path_buf(),
    );
    let mut events = state.events.subscribe();
    let id = PeripheralId::from("AA:BB:CC:DD:EE:01");

    sender.send(discovered(id.as_str(), Some("Lock"), -40)).unwrap();
    wait_for(&mut events, |e| matches!(e, BrowserEvent::PeripheralAdded { .. })).await;

    state.bluetooth_manager.lock().await.pair(&id).await.unwrap();
    let prompt = wait_for(&mut events, |e| matches!(e, BrowserEvent::PairingPrompt(_))).await;
    let BrowserEvent::PairingPrompt(prompt) = prompt else {
        unreachable!()
    };
    assert_eq!(prompt.kind, PairingKind::ProvidePin);
    assert!(state.pairing.provide_pin(Some(pin.to_string())));

    let completed = wait_for(&mut events, |e| matches!(e, BrowserEvent::PairingCompleted { .. })).await;
    let BrowserEvent::PairingCompleted { paired, .. } = completed else {
        unreachable!()
    };
    let recorded = state
        .bluetooth_manager
        .lock()
        .await
        .peripheral(&id)
        .unwrap()
        .is_paired;
    (paired, recorded)
}

#[tokio::test]
async fn correct_pin_completes_pairing() {
    assert_eq!(paired_with_pin("123456").await, (true, true));
}

#[tokio::test]
async fn wrong_pin_fails_pairing() {
    assert_eq!(paired_with_pin("000000").await, (false, false));
}

#[tokio::test]
async fn event_loop_reports_scan_completion() {
    let (sender, receiver) = platform_channel();
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_platform(
        FakePlatform::new(),
        receiver,
        BrowserConfig::default(),
        dir.path().to_path_buf(),
    );
    let mut events = state.events.subscribe();

    state.bluetooth_manager.lock().await.start_scan().await.unwrap();
    sender.send(discovered("a", None, -40)).unwrap();
    sender.send(discovered("b", None, -40)).unwrap();
    sender
        .send(ble_service_browser_lib::core::bluetooth::PlatformEvent::ScanCompleted { cycle: 1 })
        .unwrap();

    let completed = wait_for(&mut events, |e| matches!(e, BrowserEvent::ScanCompleted { .. })).await;
    assert_eq!(completed, BrowserEvent::ScanCompleted { count: 2 });
    assert!(!state.bluetooth_manager.lock().await.is_scanning());
}

#[tokio::test]
async fn saved_config_applies_and_persists() {
    let (_sender, receiver) = platform_channel();
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::with_platform(
        FakePlatform::new(),
        receiver,
        BrowserConfig::default(),
        dir.path().to_path_buf(),
    );
    let config = BrowserConfig {
        scan_duration_secs: 8,
        min_rssi: Some(-75),
        dedup_by_name: true,
        log_level: "debug".to_string(),
    };

    state.save_config(config.clone()).await.unwrap();

    assert_eq!(state.bluetooth_manager.lock().await.config(), &config);
    assert_eq!(BrowserConfig::load_config(dir.path()).await.unwrap(), config);
}
