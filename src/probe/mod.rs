//! Hardware Probe
//!
//! Read-only view of the two monitored USB ports and the USB drives currently mounted.
//! Absence of a device is a normal answer, so nothing here returns an error.

mod mounts;
mod types;
mod usb;

pub use mounts::{parse_mount_table, read_mounted_drives};
pub use types::{DeviceListing, MountedDrive, UsbPort};
pub use usb::list_usb_device_paths;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::config::{PortsConfig, ProbeConfig};

/// Live hardware inspection used by the controller on every tick
pub trait HardwareProbe: Send + Sync {
    /// Which of the two monitored ports currently have a device attached
    fn monitored_ports(&self) -> BTreeSet<UsbPort>;

    /// USB drives in the mount table, in table order
    fn mounted_drives(&self) -> Vec<MountedDrive>;
}

/// Probe backed by sysfs and the system mount table
pub struct SysfsProbe {
    ports: PortsConfig,
    sysfs_root: PathBuf,
    mount_table: PathBuf,
}

impl SysfsProbe {
    pub fn new(ports: PortsConfig, probe: &ProbeConfig) -> Self {
        Self {
            ports,
            sysfs_root: PathBuf::from(&probe.sysfs_root),
            mount_table: PathBuf::from(&probe.mount_table),
        }
    }

    /// Match enumerated device paths against the configured ports (exact identity)
    fn ports_in(&self, paths: &[String]) -> BTreeSet<UsbPort> {
        let mut attached = BTreeSet::new();
        for path in paths {
            if *path == self.ports.source {
                attached.insert(UsbPort::Source);
            } else if *path == self.ports.destination {
                attached.insert(UsbPort::Destination);
            }
        }
        attached
    }

    /// Snapshot of everything visible, for `--list-devices`
    pub fn list_devices(&self) -> DeviceListing {
        let usb_devices = list_usb_device_paths(&self.sysfs_root);
        let attached_ports = self.ports_in(&usb_devices).into_iter().collect();
        DeviceListing {
            usb_devices,
            attached_ports,
            mounted_drives: self.mounted_drives(),
        }
    }
}

impl HardwareProbe for SysfsProbe {
    fn monitored_ports(&self) -> BTreeSet<UsbPort> {
        self.ports_in(&list_usb_device_paths(&self.sysfs_root))
    }

    fn mounted_drives(&self) -> Vec<MountedDrive> {
        read_mounted_drives(&self.mount_table)
    }
}
