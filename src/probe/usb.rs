//! USB device enumeration through sysfs

use std::path::Path;
use tracing::debug;

/// List the kernel device paths of every USB device and interface
///
/// Entries under `<sysfs_root>/bus/usb/devices` are symlinks into the device tree.
/// Each one is resolved and reported relative to the sysfs root, which gives the
/// udev-style path (`/devices/platform/...`). Unreadable entries are skipped.
pub fn list_usb_device_paths(sysfs_root: &Path) -> Vec<String> {
    let root = match sysfs_root.canonicalize() {
        Ok(root) => root,
        Err(e) => {
            debug!("sysfs root {} unavailable: {}", sysfs_root.display(), e);
            return Vec::new();
        }
    };

    let entries = match std::fs::read_dir(root.join("bus/usb/devices")) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list USB devices: {}", e);
            return Vec::new();
        }
    };

    let mut paths: Vec<String> = entries
        .flatten()
        .filter_map(|entry| entry.path().canonicalize().ok())
        .filter_map(|resolved| {
            resolved
                .strip_prefix(&root)
                .ok()
                .map(|rel| format!("/{}", rel.to_string_lossy()))
        })
        .collect();

    paths.sort();
    paths
}
