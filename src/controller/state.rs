//! Controller states and their payloads

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::classify::MediaKind;
use crate::feedback::Led;

/// Recognized source drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSide {
    /// Block device node
    pub device: String,
    /// Mount point
    pub mount_path: PathBuf,
    /// Phone or camera layout
    pub kind: MediaKind,
}

/// Recognized backup drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSide {
    pub device: String,
    pub mount_path: PathBuf,
}

/// Fully resolved transfer: both drives known and classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub source: SourceSide,
    pub destination: DestinationSide,
}

impl TransferPlan {
    pub fn source_subpath(&self) -> &'static str {
        self.source.kind.source_subpath()
    }

    pub fn destination_subpath(&self) -> &'static str {
        self.source.kind.destination_subpath()
    }
}

/// Controller state
///
/// Data that only matters while a state is active travels inside the variant, so it
/// disappears as soon as another state is entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Idle, waiting for the camera or phone
    Empty,
    /// Source recognized, waiting for the backup drive
    SourceConnected { source: SourceSide },
    /// Both drives recognized, waiting for the button
    BothConnected { plan: TransferPlan },
    /// Unusable device or wrong plug order
    Problem,
    /// Copy and unmount in progress
    Processing { plan: TransferPlan },
    /// Transfer finished, nagging until the button is pressed
    Done {
        /// Time since the completion cue was last played
        elapsed: Duration,
        /// Replay the cue once `elapsed` exceeds this
        threshold: Duration,
    },
    /// Session over, waiting for every device to be removed
    Filled,
}

impl State {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::SourceConnected { .. } => "source-connected",
            Self::BothConnected { .. } => "both-connected",
            Self::Problem => "problem",
            Self::Processing { .. } => "processing",
            Self::Done { .. } => "done",
            Self::Filled => "filled",
        }
    }

    /// LEDs that blink while this state is active
    pub fn blink_leds(&self) -> &'static [Led] {
        match self {
            Self::Empty => &[Led::Source],
            Self::SourceConnected { .. } => &[Led::Destination],
            Self::BothConnected { .. } | Self::Done { .. } => &[Led::Button],
            Self::Problem | Self::Processing { .. } | Self::Filled => &[],
        }
    }

    /// Recognized source drive, if this state has one
    pub fn source(&self) -> Option<&SourceSide> {
        match self {
            Self::SourceConnected { source } => Some(source),
            Self::BothConnected { plan } | Self::Processing { plan } => Some(&plan.source),
            _ => None,
        }
    }

    /// Complete transfer plan, if this state has one
    pub fn plan(&self) -> Option<&TransferPlan> {
        match self {
            Self::BothConnected { plan } | Self::Processing { plan } => Some(plan),
            _ => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
