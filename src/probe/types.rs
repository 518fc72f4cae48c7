//! Probe data types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One of the two monitored physical USB ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsbPort {
    /// Camera or phone port
    Source,
    /// Backup drive port
    Destination,
}

impl fmt::Display for UsbPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

/// A USB drive entry from the mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountedDrive {
    /// Block device node, e.g. `/dev/sda1`
    pub device: String,
    /// Mount point, e.g. `/media/usb0`
    pub mount_path: PathBuf,
}

impl MountedDrive {
    pub fn new(device: impl Into<String>, mount_path: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            mount_path: mount_path.into(),
        }
    }
}

impl fmt::Display for MountedDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.device, self.mount_path.display())
    }
}

/// Everything the probe can see, for installation diagnostics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceListing {
    /// Kernel device paths of all USB devices
    pub usb_devices: Vec<String>,
    /// Monitored ports currently attached
    pub attached_ports: Vec<UsbPort>,
    /// USB drives currently mounted
    pub mounted_drives: Vec<MountedDrive>,
}
