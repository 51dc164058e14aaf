//! # Mapping Session
//!
//! One consumer's live, bounded window into the region.

use alloc::sync::Arc;

use peermem_core::{ByteSize, Error, PageFrame, Result};
use peermem_hal::DeviceMemoryProvider;

use crate::arbiter::AccessArbiter;
use crate::fault::FaultResolver;
use crate::region::MemoryRegion;

// =============================================================================
// MAP WINDOW
// =============================================================================

/// The region window a session maps: `[offset, offset + len)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapWindow {
    /// Byte offset of the window within the region
    pub offset: u64,
    /// Window length in bytes
    pub len: ByteSize,
}

impl MapWindow {
    /// Create a window
    pub const fn new(offset: u64, len: ByteSize) -> Self {
        Self { offset, len }
    }

    /// Whether a region-relative byte offset falls inside the window
    #[inline]
    pub const fn contains(&self, offset: u64) -> bool {
        offset >= self.offset && offset - self.offset < self.len.as_bytes()
    }
}

// =============================================================================
// MAPPING SESSION
// =============================================================================

/// An open mapping over a window of the region
///
/// Holds the arbiter slot claimed at open; the slot is returned when the
/// session is closed or dropped, so it can neither leak nor be returned
/// twice. Faults against a session that has been closed fail at the
/// caller: the session is gone and cannot resolve anything.
#[derive(Debug)]
pub struct MappingSession<P: DeviceMemoryProvider> {
    provider: Arc<P>,
    arbiter: Arc<AccessArbiter>,
    region: MemoryRegion,
    window: MapWindow,
}

impl<P: DeviceMemoryProvider> MappingSession<P> {
    pub(crate) fn new(
        provider: Arc<P>,
        arbiter: Arc<AccessArbiter>,
        region: MemoryRegion,
        window: MapWindow,
    ) -> Self {
        Self {
            provider,
            arbiter,
            region,
            window,
        }
    }

    /// The window this session maps
    pub const fn window(&self) -> MapWindow {
        self.window
    }

    /// The region behind the window
    pub const fn region(&self) -> &MemoryRegion {
        &self.region
    }

    /// Resolve a faulting page to its backing frame
    ///
    /// `offset` is region-relative and page-aligned, as delivered by the
    /// host's fault mechanism. An offset outside the session window is a
    /// fatal per-fault error; it cannot occur through a correctly bounded
    /// mapping.
    pub fn resolve_fault(&self, offset: u64) -> Result<PageFrame> {
        if !self.window.contains(offset) {
            log::error!("fault offset {offset:#x} outside session window");
            return Err(Error::OutOfRange);
        }
        FaultResolver::new(self.provider.as_ref(), &self.region).resolve(offset)
    }

    /// Close the session, returning the arbiter slot
    pub fn close(self) {}
}

impl<P: DeviceMemoryProvider> Drop for MappingSession<P> {
    fn drop(&mut self) {
        self.arbiter.release();
        log::debug!("mapping session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_containment() {
        let window = MapWindow::new(4096, ByteSize::from_pages(2));
        assert!(!window.contains(0));
        assert!(window.contains(4096));
        assert!(window.contains(4096 + 8191));
        assert!(!window.contains(4096 + 8192));
    }

    #[test]
    fn test_zero_offset_window() {
        let window = MapWindow::new(0, ByteSize::from_pages(1));
        assert!(window.contains(0));
        assert!(!window.contains(4096));
    }
}
