//! Front panel GPIO
//!
//! Drives the three LEDs and reads the push button through the Linux GPIO character
//! device (/dev/gpiochipX).

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

use super::types::Led;
use crate::config::GpioConfig;
use crate::error::{AppError, Result};

const CONSUMER: &str = "photo-porter";

/// LED outputs and button input
pub trait Panel: Send + Sync {
    /// Drive one LED on or off
    fn set_led(&self, led: Led, on: bool) -> Result<()>;

    /// Whether the button is held down right now
    fn button_pressed(&self) -> Result<bool>;
}

struct PanelLines {
    led_source: LineHandle,
    led_destination: LineHandle,
    led_button: LineHandle,
    button: LineHandle,
}

impl PanelLines {
    fn led(&self, led: Led) -> &LineHandle {
        match led {
            Led::Source => &self.led_source,
            Led::Destination => &self.led_destination,
            Led::Button => &self.led_button,
        }
    }
}

/// Panel wired to GPIO lines of a single chip
pub struct GpioPanel {
    config: GpioConfig,
    lines: Mutex<Option<PanelLines>>,
}

impl GpioPanel {
    /// Request all lines; LEDs start off
    ///
    /// The button line is requested as a plain input. The pull-up has to be provided by
    /// the board (external resistor or firmware pin configuration).
    pub fn open(config: GpioConfig) -> Result<Self> {
        info!(
            "Initializing front panel on {} (LEDs {}/{}/{}, button {})",
            config.chip, config.led_source, config.led_destination, config.led_button, config.button
        );

        let mut chip = Chip::new(&config.chip)
            .map_err(|e| AppError::Gpio(format!("GPIO chip {} open failed: {}", config.chip, e)))?;

        let mut request = |pin: u32, flags: LineRequestFlags| -> Result<LineHandle> {
            let line = chip
                .get_line(pin)
                .map_err(|e| AppError::Gpio(format!("GPIO line {} failed: {}", pin, e)))?;
            line.request(flags, 0, CONSUMER)
                .map_err(|e| AppError::Gpio(format!("GPIO line {} request failed: {}", pin, e)))
        };

        let lines = PanelLines {
            led_source: request(config.led_source, LineRequestFlags::OUTPUT)?,
            led_destination: request(config.led_destination, LineRequestFlags::OUTPUT)?,
            led_button: request(config.led_button, LineRequestFlags::OUTPUT)?,
            button: request(config.button, LineRequestFlags::INPUT)?,
        };

        debug!("Front panel GPIO lines requested");
        Ok(Self {
            config,
            lines: Mutex::new(Some(lines)),
        })
    }

    /// Switch all LEDs off and release the lines
    pub fn shutdown(&self) {
        let mut guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lines) = guard.as_ref() {
            for led in Led::ALL {
                lines.led(led).set_value(0).ok();
            }
        }
        *guard = None;
        debug!("Front panel on {} released", self.config.chip);
    }
}

impl Panel for GpioPanel {
    fn set_led(&self, led: Led, on: bool) -> Result<()> {
        let guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let lines = guard
            .as_ref()
            .ok_or_else(|| AppError::Gpio("front panel released".to_string()))?;
        lines
            .led(led)
            .set_value(u8::from(on))
            .map_err(|e| AppError::Gpio(format!("{} set failed: {}", led, e)))
    }

    fn button_pressed(&self) -> Result<bool> {
        let guard = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let lines = guard
            .as_ref()
            .ok_or_else(|| AppError::Gpio("front panel released".to_string()))?;
        let value = lines
            .button
            .get_value()
            .map_err(|e| AppError::Gpio(format!("button read failed: {}", e)))?;

        // Active low: pulled up when idle, grounded when pressed
        Ok(value == 0)
    }
}

impl Drop for GpioPanel {
    fn drop(&mut self) {
        self.shutdown();
    }
}
