use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::feedback::Cue;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Monitored USB ports
    pub ports: PortsConfig,
    /// Where hardware state is read from
    pub probe: ProbeConfig,
    /// LED and button wiring
    pub gpio: GpioConfig,
    /// Control loop timing
    pub controller: ControllerConfig,
    /// Audio cues
    pub sounds: SoundsConfig,
    /// Copy and unmount commands
    pub transfer: TransferConfig,
}

impl AppConfig {
    /// Check the configuration for values the appliance cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.controller.tick_ms == 0 {
            return Err(AppError::Config("controller.tick_ms must be greater than 0".into()));
        }

        if self.ports.source.is_empty() || self.ports.destination.is_empty() {
            return Err(AppError::Config("both USB port paths must be set".into()));
        }
        if self.ports.source == self.ports.destination {
            return Err(AppError::Config(format!(
                "source and destination port are the same: {}",
                self.ports.source
            )));
        }

        let lines = [
            self.gpio.led_source,
            self.gpio.led_destination,
            self.gpio.led_button,
            self.gpio.button,
        ];
        for (i, line) in lines.iter().enumerate() {
            if lines[i + 1..].contains(line) {
                return Err(AppError::Config(format!("GPIO line {} is used twice", line)));
            }
        }

        if self.sounds.enabled {
            for cue in Cue::all() {
                let registered = self.sounds.cues.get(cue).map(|c| c.len()).unwrap_or(0);
                if registered == 0 {
                    return Err(AppError::Config(format!(
                        "no sound clips registered for cue {}",
                        cue
                    )));
                }
            }
        }

        if self.transfer.copy_command.is_empty() || self.transfer.unmount_command.is_empty() {
            return Err(AppError::Config("transfer commands must not be empty".into()));
        }

        Ok(())
    }
}

/// Kernel device paths of the two physical USB ports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortsConfig {
    /// Port the camera or phone is plugged into
    pub source: String,
    /// Port the backup drive is plugged into
    pub destination: String,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            source: "/devices/platform/soc/20980000.usb/usb1/1-1/1-1.2/1-1.2.1/1-1.2.1:1.0"
                .to_string(),
            destination:
                "/devices/platform/soc/20980000.usb/usb1/1-1/1-1.2/1-1.2.4/1-1.2.4.1/1-1.2.4.1:1.0"
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// sysfs mount point
    pub sysfs_root: String,
    /// Mount table to scan for USB drives
    pub mount_table: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sysfs_root: "/sys".to_string(),
            mount_table: "/etc/mtab".to_string(),
        }
    }
}

/// GPIO wiring (line offsets on a single chip, BCM numbering on a Raspberry Pi)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GpioConfig {
    /// GPIO character device
    pub chip: String,
    /// LED lit while waiting for / after seeing the source device
    pub led_source: u32,
    /// LED lit while waiting for / after seeing the destination drive
    pub led_destination: u32,
    /// LED inside the push button
    pub led_button: u32,
    /// Push button input, active low with pull-up
    pub button: u32,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: "/dev/gpiochip0".to_string(),
            led_source: 2,
            led_destination: 3,
            led_button: 4,
            button: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Control loop period in milliseconds
    pub tick_ms: u64,
    /// How long the completion cue waits before it is repeated
    pub done_repeat_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 300,
            done_repeat_secs: 10,
        }
    }
}

impl ControllerConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn done_repeat(&self) -> Duration {
        Duration::from_secs(self.done_repeat_secs)
    }
}

/// Audio cue configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundsConfig {
    /// Play cues at all (disabled = log only)
    pub enabled: bool,
    /// Directory holding the clips
    pub dir: String,
    /// Player executable, invoked with the clip path as its only argument
    pub player: String,
    /// Interchangeable clips per cue category
    pub cues: BTreeMap<Cue, Vec<String>>,
}

impl Default for SoundsConfig {
    fn default() -> Self {
        let clips = |prefix: &str, count: usize| -> Vec<String> {
            (1..=count).map(|i| format!("{}_{:02}.wav", prefix, i)).collect()
        };

        let mut cues = BTreeMap::new();
        cues.insert(Cue::GreetSource, clips("one", 3));
        cues.insert(Cue::GreetDestination, clips("two", 3));
        cues.insert(Cue::AwaitButton, clips("button", 3));
        cues.insert(Cue::Complete, clips("done", 4));
        cues.insert(Cue::Busy, clips("processing", 3));
        cues.insert(Cue::Eject, clips("eject", 2));
        cues.insert(Cue::Problem, clips("problem", 3));

        Self {
            enabled: true,
            dir: "/application/sounds".to_string(),
            player: "/usr/bin/aplay".to_string(),
            cues,
        }
    }
}

/// External commands used by the transfer executor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransferConfig {
    /// Recursive copy command; source and destination directories are appended
    pub copy_command: Vec<String>,
    /// Unmount command; the device node is appended
    pub unmount_command: Vec<String>,
    /// Kill the copy after this many seconds (none = wait forever)
    pub copy_timeout_secs: Option<u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            copy_command: vec!["sudo".into(), "/usr/bin/rsync".into(), "-r".into()],
            unmount_command: vec!["sudo".into(), "umount".into()],
            copy_timeout_secs: None,
        }
    }
}

impl TransferConfig {
    pub fn copy_timeout(&self) -> Option<Duration> {
        self.copy_timeout_secs.map(Duration::from_secs)
    }
}
