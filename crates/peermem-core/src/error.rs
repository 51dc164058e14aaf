//! # PEERMEM Error Handling
//!
//! Unified error type for the peer memory stack.
//!
//! Error handling follows these principles:
//! - Errors are typed and categorized
//! - No panics in production code paths
//! - Every failure path returns a distinguishable error kind
//! - Errors are `no_std` compatible

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// PEERMEM Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// PEERMEM unified error type
///
/// Covers all error conditions across the stack, grouped by the phase in
/// which they arise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Configuration Errors (detected at startup, nothing acquired)
    // =========================================================================
    /// Device address string is malformed
    InvalidAddress,
    /// Region size is zero or not a multiple of the page size
    InvalidSize,

    // =========================================================================
    // Resource Errors (fatal to initialization, trigger rollback)
    // =========================================================================
    /// No device exists at the given address
    DeviceNotFound,
    /// Device does not expose peer-accessible memory
    PeerMemUnsupported,
    /// Device memory pool could not satisfy the request
    AllocationFailed,

    // =========================================================================
    // Contention Errors (recoverable, no state change)
    // =========================================================================
    /// All mapping slots are taken
    Busy,

    // =========================================================================
    // Mapping Errors
    // =========================================================================
    /// Requested window exceeds the region bounds
    OutOfRange,
    /// Fault resolved to a null physical address
    NullPhysAddr,
    /// Fault resolved to a frame the platform does not back with memory
    InvalidFrame,

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// Operation not permitted in the current lifecycle state
    InvalidState,
}

impl Error {
    /// Whether this error aborts only the faulting access (bus-error
    /// semantics) rather than the session or the region.
    #[inline]
    pub const fn is_fault_fatal(self) -> bool {
        matches!(self, Self::NullPhysAddr | Self::InvalidFrame)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration
            Self::InvalidAddress => write!(f, "invalid device address"),
            Self::InvalidSize => write!(f, "invalid region size"),

            // Resource
            Self::DeviceNotFound => write!(f, "device not found"),
            Self::PeerMemUnsupported => write!(f, "peer memory not supported"),
            Self::AllocationFailed => write!(f, "peer memory allocation failed"),

            // Contention
            Self::Busy => write!(f, "resource busy"),

            // Mapping
            Self::OutOfRange => write!(f, "offset out of range"),
            Self::NullPhysAddr => write!(f, "null physical address"),
            Self::InvalidFrame => write!(f, "invalid page frame"),

            // Lifecycle
            Self::InvalidState => write!(f, "invalid lifecycle state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_fatal_classification() {
        assert!(Error::NullPhysAddr.is_fault_fatal());
        assert!(Error::InvalidFrame.is_fault_fatal());
        assert!(!Error::Busy.is_fault_fatal());
        assert!(!Error::OutOfRange.is_fault_fatal());
    }

    #[test]
    fn test_display_is_distinguishable() {
        let kinds = [
            Error::InvalidAddress,
            Error::InvalidSize,
            Error::DeviceNotFound,
            Error::PeerMemUnsupported,
            Error::AllocationFailed,
            Error::Busy,
            Error::OutOfRange,
            Error::NullPhysAddr,
            Error::InvalidFrame,
            Error::InvalidState,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in kinds.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
