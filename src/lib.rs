//! Photo Porter - button-driven photo and video offload appliance
//!
//! This crate provides the core functionality for Photo Porter, a small
//! single-board-computer appliance that copies photos and videos from a camera
//! or phone to a backup drive when a button is pressed.

pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod feedback;
pub mod probe;
pub mod transfer;

pub use error::{AppError, Result};
