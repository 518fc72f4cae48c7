//! Feedback data types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Front panel LEDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Led {
    /// LED-1, source device progress
    Source,
    /// LED-2, destination drive progress
    Destination,
    /// LED inside the push button
    Button,
}

impl Led {
    pub const ALL: [Led; 3] = [Led::Source, Led::Destination, Led::Button];
}

impl fmt::Display for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "led-source"),
            Self::Destination => write!(f, "led-destination"),
            Self::Button => write!(f, "led-button"),
        }
    }
}

/// Audio cue categories
///
/// Each category has several interchangeable clips; one is picked at random per cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cue {
    /// Waiting for the camera or phone
    GreetSource,
    /// Waiting for the backup drive
    GreetDestination,
    /// Both connected, press the button
    AwaitButton,
    /// Copy finished
    Complete,
    /// Copy in progress
    Busy,
    /// Remove the devices
    Eject,
    /// Something is wrong with the connected devices
    Problem,
}

impl Cue {
    pub fn all() -> &'static [Cue] {
        &[
            Cue::GreetSource,
            Cue::GreetDestination,
            Cue::AwaitButton,
            Cue::Complete,
            Cue::Busy,
            Cue::Eject,
            Cue::Problem,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GreetSource => "greet-source",
            Self::GreetDestination => "greet-destination",
            Self::AwaitButton => "await-button",
            Self::Complete => "complete",
            Self::Busy => "busy",
            Self::Eject => "eject",
            Self::Problem => "problem",
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
