//! # dtsgate-app
//!
//! Application layer: use-cases, in-process infrastructure and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `DtsSdk` / `DtsClient`: the vendor DTS hardware SDK
//!   - `Device`: anything the device manager can run and close
//! - Provide **in-process infrastructure** that doesn't need IO:
//!   - `DedupWindow`: per-key time-window suppression
//!   - `Outlet`: bounded drop-on-full notification channels
//!   - `Scheduler`: shared periodic job runner
//! - Orchestrate domain objects:
//!   - `DtsController`: per-device connection state machine, zone sync,
//!     callback registration and the notification pipeline
//!   - `DeviceManager`: device registry and lifecycle event bus
//!
//! ## Dependency rule
//! Depends on `dtsgate-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod dedup;
pub mod device_manager;
pub mod outlet;
pub mod ports;
pub mod scheduler;
