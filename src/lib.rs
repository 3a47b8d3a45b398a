//! Taringa - Smart-Buoy FX30 gateway components
//!
//! A boot launcher that runs the device boot script, and an SMS command controller
//! that answers `UPGRADE`, `REBOOT` and `ULPM` text messages and then acts on them.

pub mod actions;
pub mod boot;
pub mod command;
pub mod config;
pub mod error;
pub mod process;
pub mod shutdown;
pub mod sms;
pub mod spool;

pub use error::{Error, Result};
