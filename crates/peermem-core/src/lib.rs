//! # PEERMEM Core
//!
//! Foundational types and error handling for the peer memory stack.
//!
//! This crate provides the type-system foundations shared by every layer:
//! strongly-typed physical addresses and page frames, PCI device addresses,
//! byte sizes with page-granularity helpers, and the unified error type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      peermem-core                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │   Types     │  │   Paging     │  │      Error         │  │
//! │  │ (PciAddr,   │  │ (PhysAddr,   │  │    Handling        │  │
//! │  │  ByteSize)  │  │  Pfn, Frame) │  │                    │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(test)]
extern crate std;

// =============================================================================
// MODULE EXPORTS
// =============================================================================

pub mod error;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result};
pub use types::*;
