//! Feedback Driver
//!
//! LEDs, the push button and audio cues. No decisions are made here: the controller
//! says what to show and the driver writes it to the hardware. Hardware failures are
//! logged and swallowed so a broken LED never stops a transfer.

mod panel;
mod sound;
mod types;

pub use panel::{GpioPanel, Panel};
pub use sound::{CuePlayer, SoundBoard};
pub use types::{Cue, Led};

use std::sync::Arc;
use tracing::{debug, warn};

/// Front panel plus sound output
#[derive(Clone)]
pub struct Feedback {
    panel: Arc<dyn Panel>,
    cues: Arc<dyn CuePlayer>,
}

impl Feedback {
    pub fn new(panel: Arc<dyn Panel>, cues: Arc<dyn CuePlayer>) -> Self {
        Self { panel, cues }
    }

    /// Set the given LEDs to the given levels
    pub fn set_leds(&self, levels: &[(Led, bool)]) {
        for &(led, on) in levels {
            if let Err(e) = self.panel.set_led(led, on) {
                warn!("Failed to set {}: {}", led, e);
            }
        }
    }

    pub fn set_led(&self, led: Led, on: bool) {
        self.set_leds(&[(led, on)]);
    }

    /// Drive the given LEDs low, or all of them when `subset` is `None`
    pub fn reset_leds(&self, subset: Option<&[Led]>) {
        let leds = subset.unwrap_or(&Led::ALL[..]);
        for &led in leds {
            self.set_led(led, false);
        }
    }

    /// Start one clip of the cue category without waiting for it
    pub fn play_cue(&self, cue: Cue) {
        debug!("Cue: {}", cue);
        if let Err(e) = self.cues.play(cue) {
            warn!("Failed to play cue {}: {}", cue, e);
        }
    }

    /// Single sample of the button; read failures count as not pressed
    pub fn button_pressed(&self) -> bool {
        match self.panel.button_pressed() {
            Ok(pressed) => pressed,
            Err(e) => {
                warn!("Failed to read button: {}", e);
                false
            }
        }
    }
}
