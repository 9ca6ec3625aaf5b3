use std::path::Path;
use std::sync::OnceLock;

use log::{error, info};
use regex::Regex;
use tokio::fs;

/// Asynchronously ensures that a directory exists, creating it if it does not.
/// This function is idempotent.
pub async fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        if let Err(e) = fs::create_dir_all(path).await {
            error!("Failed to create directory at {:?}: {}", path, e);
            return Err(e);
        }
        info!("Created directory at: {:?}", path);
    }
    Ok(())
}

/// Pulls a MAC address out of a platform device id, if it embeds one.
///
/// BlueZ and WinRT ids contain the address; CoreBluetooth ids are opaque UUIDs.
pub fn extract_mac_address(device_id: &str) -> Option<String> {
    static MAC_PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = MAC_PATTERN.get_or_init(|| {
        Regex::new(r"([0-9A-Fa-f]{2}[:_-]){5}([0-9A-Fa-f]{2})").expect("MAC pattern is valid")
    });
    re.find_iter(device_id)
        .last()
        .map(|m| m.as_str().replace(['_', '-'], ":").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_from_windows_style_id() {
        assert_eq!(
            extract_mac_address("BluetoothLE#BluetoothLE00:1a:7d:da:71:13-c4:be:84:70:4a:2f").as_deref(),
            Some("C4:BE:84:70:4A:2F")
        );
    }

    #[test]
    fn mac_from_bluez_path() {
        assert_eq!(
            extract_mac_address("/org/bluez/hci0/dev_C4_BE_84_70_4A_2F").as_deref(),
            Some("C4:BE:84:70:4A:2F")
        );
    }

    #[test]
    fn corebluetooth_ids_have_no_mac() {
        assert_eq!(
            extract_mac_address("5C1B4E58-8E2A-4F6B-9E3A-0D2C1F8B7A61"),
            None
        );
    }
}
