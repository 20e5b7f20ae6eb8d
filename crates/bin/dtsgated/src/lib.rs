//! # dtsgated: DTS gateway daemon
//!
//! Composition root that wires DTS controllers and relay boards into the
//! device manager.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Build one controller per `[[dts]]` entry and one board per `[[relay]]`
//! - Install the device lifecycle handlers
//! - Log every output record as a JSON line and route alarms to relay boards
//! - Report device status periodically
//! - Close everything on shutdown
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

pub mod config;
pub mod device;
pub mod gateway;

pub use gateway::Gateway;
