//! # PEERMEM Mapping Subsystem
//!
//! Fault-driven, zero-copy mapping of a peer-accessible device memory
//! region.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     PEERMEM Mapping Subsystem                   │
//! │                                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                     Lifecycle Manager                     │  │
//! │  │       (resolve device → allocate region → ready)          │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                              │                                  │
//! │  ┌─────────────────┐  ┌─────┴─────┐  ┌────────────────────┐    │
//! │  │  Access Arbiter │  │  Mapping  │  │  Fault Resolver    │    │
//! │  │ (open counting) │  │  Session  │  │ (offset → frame)   │    │
//! │  └─────────────────┘  └───────────┘  └────────────────────┘    │
//! │           │                                     │               │
//! │  ┌────────┴─────────────────────────────────────┴───────────┐  │
//! │  │                     Memory Region                         │  │
//! │  │        (device-owned, physically contiguous)              │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operation
//!
//! A [`PeerMemMap`] is built once per device: the target address resolves
//! to a device handle, a fixed-size block is carved from the device's
//! peer memory pool, and the context becomes ready. Consumers then open a
//! [`MappingSession`] over a window of the region; each page they touch
//! is resolved lazily, on first access, to the backing physical frame.
//! Nothing is copied and nothing blocks: contention and bad frames fail
//! immediately with typed errors.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod arbiter;
pub mod config;
pub mod fault;
pub mod lifecycle;
pub mod region;
pub mod session;

// Re-exports
pub use arbiter::AccessArbiter;
pub use config::MapConfig;
pub use fault::FaultResolver;
pub use lifecycle::{LifecycleState, PeerMemMap};
pub use region::MemoryRegion;
pub use session::{MapWindow, MappingSession};

/// Subsystem version advertised at load time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
