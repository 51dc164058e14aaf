//! # Device Memory Provider
//!
//! Capability interface over the platform's device registry and
//! peer-accessible memory pools.

use peermem_core::{ByteSize, DeviceHandle, PageFrame, PciAddr, Pfn, PhysAddr, Result};

// =============================================================================
// PROVIDER CAPABILITIES
// =============================================================================

bitflags::bitflags! {
    /// Capabilities a resolved device advertises
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProviderCaps: u32 {
        /// Device exposes an allocatable peer-accessible memory pool
        const PEER_MEMORY = 1 << 0;
        /// DMA to the pool is cache-coherent
        const COHERENT_DMA = 1 << 1;
        /// Pool is published to other functions behind the same bridge
        const PUBLISHED = 1 << 2;
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Privileged platform services for peer-accessible device memory
///
/// Implementations wrap the platform's device registry and per-device
/// memory pools. All calls complete immediately: they succeed or fail
/// without blocking.
pub trait DeviceMemoryProvider: Send + Sync {
    /// Resolve a PCI address to a live device handle
    ///
    /// A successful resolve transfers one unit of reference ownership to
    /// the caller, who must balance it with exactly one
    /// [`release_device`](Self::release_device).
    fn resolve(&self, addr: PciAddr) -> Result<DeviceHandle>;

    /// Query the capabilities a resolved device advertises
    fn capabilities(&self, device: DeviceHandle) -> Result<ProviderCaps>;

    /// Allocate a contiguous block from the device's peer memory pool
    ///
    /// Returns the physical base of the block. Pool exhaustion fails with
    /// [`Error::AllocationFailed`](peermem_core::Error::AllocationFailed)
    /// and leaves the device handle untouched.
    fn alloc_peer_memory(&self, device: DeviceHandle, size: ByteSize) -> Result<PhysAddr>;

    /// Return a block to the device's peer memory pool
    ///
    /// Safe to call with a block that was never handed out; such a call is
    /// a logged no-op so partial-init teardown stays total.
    fn free_peer_memory(&self, device: DeviceHandle, base: PhysAddr, size: ByteSize);

    /// Drop the reference taken by [`resolve`](Self::resolve)
    fn release_device(&self, device: DeviceHandle);

    /// Whether the platform recognizes this frame as real, addressable memory
    fn frame_valid(&self, pfn: Pfn) -> bool;

    /// Take a reference on a frame and bind it for mapping
    ///
    /// The reference keeps the page alive while it is mapped; the host's
    /// page-reclaim machinery drops it when the mapping goes away.
    fn acquire_frame(&self, pfn: Pfn) -> Result<PageFrame>;
}
