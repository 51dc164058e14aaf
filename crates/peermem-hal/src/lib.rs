//! # PEERMEM Hardware Abstraction Layer
//!
//! The provider interface through which the mapping subsystem reaches
//! privileged hardware services: device resolution, peer memory capability
//! queries, region allocation, and page frame validation.
//!
//! Resolving a device, querying its peer-memory capability, and carving a
//! block out of its memory pool all require a trusted platform component.
//! The stack depends only on the [`DeviceMemoryProvider`] trait, so a
//! platform binds real hardware while tests bind [`sim::SimProvider`],
//! which backs the same contract with ordinary host bookkeeping.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod provider;
pub mod sim;

// Re-exports
pub use provider::{DeviceMemoryProvider, ProviderCaps};
pub use sim::{SimDeviceDesc, SimProvider};
