//! Appliance configuration
//!
//! Configuration lives in a single JSON file. Every section has defaults matching the
//! reference hardware, so an empty or missing file is a working setup.

mod schema;
mod store;

pub use schema::{
    AppConfig, ControllerConfig, GpioConfig, PortsConfig, ProbeConfig, SoundsConfig,
    TransferConfig,
};
pub use store::{load, save};
