//! Media Classifier
//!
//! Decides what a mounted drive is by looking at its directory layout:
//!
//! - phone: `DCIM/Camera/`
//! - camera: `DCIM/<NNN>___<NN>/` folders (e.g. `119___06`)
//! - backup drive: top-level `fotky/`, `videa/` and `originaly/`
//!
//! A drive that fits none of these is reported as unrecognized and its listing is logged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Folders the backup drive must have at its root
pub const DESTINATION_DIRS: [&str; 3] = ["fotky", "videa", "originaly"];

/// Kind of recognized source media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Android phone
    Phone,
    /// Digital camera
    Camera,
}

impl MediaKind {
    /// Directory on the source drive holding the media
    pub fn source_subpath(&self) -> &'static str {
        match self {
            Self::Phone => "DCIM/Camera",
            Self::Camera => "DCIM",
        }
    }

    /// Directory on the backup drive receiving the media
    pub fn destination_subpath(&self) -> &'static str {
        match self {
            Self::Phone => "originaly/telefon",
            Self::Camera => "originaly/fotak",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phone => write!(f, "phone"),
            Self::Camera => write!(f, "camera"),
        }
    }
}

/// Result of inspecting a source drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    Phone,
    Camera,
    Unrecognized,
}

impl SourceClass {
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            Self::Phone => Some(MediaKind::Phone),
            Self::Camera => Some(MediaKind::Camera),
            Self::Unrecognized => None,
        }
    }
}

/// Result of inspecting a destination drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationClass {
    Known,
    Unrecognized,
}

/// Classify a mounted source drive
pub fn classify_source(mount_path: &Path) -> SourceClass {
    let root = list_dir(mount_path);
    if !root.iter().any(|name| name == "DCIM") {
        warn!(
            drive = %mount_path.display(),
            listing = ?root,
            "Source drive has no DCIM directory, is it really a camera or phone?"
        );
        return SourceClass::Unrecognized;
    }

    let dcim = list_dir(&mount_path.join("DCIM"));
    if dcim.iter().any(|name| name == "Camera") {
        info!("Source drive looks like an Android phone");
        SourceClass::Phone
    } else if dcim.iter().any(|name| is_camera_folder(name)) {
        info!("Source drive looks like a camera");
        SourceClass::Camera
    } else {
        warn!(
            drive = %mount_path.display(),
            listing = ?dcim,
            "Source drive was not recognized"
        );
        SourceClass::Unrecognized
    }
}

/// Classify a mounted destination drive
pub fn classify_destination(mount_path: &Path) -> DestinationClass {
    let root = list_dir(mount_path);
    if DESTINATION_DIRS
        .iter()
        .all(|dir| root.iter().any(|name| name == dir))
    {
        info!("Destination drive looks like the backup drive");
        DestinationClass::Known
    } else {
        warn!(
            drive = %mount_path.display(),
            listing = ?root,
            "Destination drive was not recognized"
        );
        DestinationClass::Unrecognized
    }
}

/// Camera folder naming: three digits, three underscores, two digits
fn is_camera_folder(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 8
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && &bytes[3..6] == b"___"
        && bytes[6..].iter().all(u8::is_ascii_digit)
}

/// Sorted entry names of a directory; unreadable directories list as empty
fn list_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(path) {
        Ok(entries) => entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(e) => {
            warn!("Cannot list {}: {}", path.display(), e);
            Vec::new()
        }
    };
    names.sort();
    names
}
