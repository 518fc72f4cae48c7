//! Mount table parsing

use std::path::Path;
use tracing::debug;

use super::types::MountedDrive;

/// Mount points USB drives are auto-mounted under (`/media/usb0`, `/media/usb1`, ...)
const MOUNT_PREFIX: &str = "/media/usb";

/// Read the mount table and return the USB drives in table order
pub fn read_mounted_drives(mount_table: &Path) -> Vec<MountedDrive> {
    match std::fs::read_to_string(mount_table) {
        Ok(table) => parse_mount_table(&table),
        Err(e) => {
            debug!("Cannot read mount table {}: {}", mount_table.display(), e);
            Vec::new()
        }
    }
}

/// Extract `/dev/<node> /media/usb<N> ...` entries; anything else is skipped
pub fn parse_mount_table(table: &str) -> Vec<MountedDrive> {
    table.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<MountedDrive> {
    let mut fields = line.split(' ');
    let device = fields.next()?;
    let mount_path = fields.next()?;

    // At least one more non-empty field (filesystem type) must follow
    if !fields.any(|f| !f.is_empty()) {
        return None;
    }

    let node = device.strip_prefix("/dev/")?;
    if node.is_empty() || !node.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()) {
        return None;
    }

    let index = mount_path.strip_prefix(MOUNT_PREFIX)?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(MountedDrive::new(device, mount_path))
}
