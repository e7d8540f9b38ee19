//! # Configuration
//!
//! Environment-driven controller settings.

mod controller;

pub use controller::ControllerConfig;
