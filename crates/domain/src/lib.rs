//! # dtsgate-domain
//!
//! Pure domain model for the dtsgate DTS telemetry gateway.
//!
//! ## Responsibilities
//! - Foundational types: composite zone ids, typed identifiers, error conventions, timestamps
//! - Define **Zones** (fiber segments with tags, relay mapping, warehouse coordinates)
//! - Decode zone **tags** (`k1=v1;k2=v2;`) and the relay / coordinate values they carry
//! - Define the vendor **alarm** and **fiber** state vocabularies
//! - Define the outbound **notifications** fanned out to downstream consumers
//! - Define the device **kind / status / lifecycle event** vocabulary
//! - Screen notification batches for all-zero hardware glitches
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod notification;
pub mod quality;
pub mod state;
pub mod tag;
pub mod zone;
