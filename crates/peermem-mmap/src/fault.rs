//! # Fault Resolver
//!
//! Lazy offset-to-frame resolution, invoked by the host's page-fault
//! mechanism on first access to each page.

use peermem_core::{Error, PAGE_SHIFT, PAGE_SIZE, PageFrame, Result};
use peermem_hal::DeviceMemoryProvider;

use crate::region::MemoryRegion;

// =============================================================================
// FAULT RESOLVER
// =============================================================================

/// Resolves page-aligned region offsets to referenced physical frames
///
/// Holds only read-only geometry, so any number of resolvers may run
/// concurrently over the same region. A failed resolution aborts the
/// faulting access alone (bus-error semantics); the session and the
/// region stay intact.
#[derive(Debug)]
pub struct FaultResolver<'a, P: DeviceMemoryProvider> {
    provider: &'a P,
    region: &'a MemoryRegion,
}

impl<'a, P: DeviceMemoryProvider> FaultResolver<'a, P> {
    /// Create a resolver over one region
    pub const fn new(provider: &'a P, region: &'a MemoryRegion) -> Self {
        Self { provider, region }
    }

    /// Resolve a page-aligned byte offset to the frame backing it
    ///
    /// The frame comes back with one reference taken on it; the host's
    /// page-reclaim machinery drops that reference when the page is
    /// unmapped.
    pub fn resolve(&self, offset: u64) -> Result<PageFrame> {
        let page = offset >> PAGE_SHIFT;
        log::debug!("fault at page {page}, offset {offset:#x}");

        if offset & (PAGE_SIZE - 1) != 0 || !self.region.contains(offset) {
            log::error!("fault offset {offset:#x} outside region");
            return Err(Error::OutOfRange);
        }

        // contains() bounds the offset, so the sum cannot wrap unless the
        // region itself was corrupt.
        let pa = self
            .region
            .base()
            .checked_offset(offset)
            .ok_or(Error::OutOfRange)?;
        if pa.is_null() {
            log::error!("null physical address for page {page}");
            return Err(Error::NullPhysAddr);
        }

        let pfn = pa.frame();
        if !self.provider.frame_valid(pfn) {
            log::error!("invalid pfn {:#x}", pfn.raw());
            return Err(Error::InvalidFrame);
        }

        let frame = self.provider.acquire_frame(pfn)?;
        log::debug!("page {page} backed by {pa}");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peermem_core::{ByteSize, DeviceHandle, PciAddr, PhysAddr};
    use peermem_hal::{SimDeviceDesc, SimProvider};

    fn setup(base: PhysAddr, pages: u64) -> (SimProvider, MemoryRegion) {
        let sim = SimProvider::new();
        let addr = PciAddr::new(0, 3, 0, 0);
        sim.register(
            SimDeviceDesc::new(addr)
                .with_base(base)
                .with_pool(ByteSize::from_pages(pages)),
        );
        let region = MemoryRegion::new(DeviceHandle::new(1), base, ByteSize::from_pages(pages));
        (sim, region)
    }

    #[test]
    fn test_resolution_arithmetic() {
        let base = PhysAddr::new(0x1_0000_0000);
        let (sim, region) = setup(base, 2);
        let resolver = FaultResolver::new(&sim, &region);

        let frame = resolver.resolve(0).unwrap();
        assert_eq!(frame.phys(), base);

        let frame = resolver.resolve(4096).unwrap();
        assert_eq!(frame.phys(), base.offset(4096));
    }

    #[test]
    fn test_out_of_region_offset() {
        let (sim, region) = setup(PhysAddr::new(0x1_0000_0000), 2);
        let resolver = FaultResolver::new(&sim, &region);
        assert_eq!(resolver.resolve(8192), Err(Error::OutOfRange));
    }

    #[test]
    fn test_misaligned_offset() {
        let (sim, region) = setup(PhysAddr::new(0x1_0000_0000), 2);
        let resolver = FaultResolver::new(&sim, &region);
        assert_eq!(resolver.resolve(100), Err(Error::OutOfRange));
    }

    #[test]
    fn test_null_physical_address_is_fatal() {
        let (sim, region) = setup(PhysAddr::null(), 2);
        let resolver = FaultResolver::new(&sim, &region);
        let err = resolver.resolve(0).unwrap_err();
        assert_eq!(err, Error::NullPhysAddr);
        assert!(err.is_fault_fatal());
        // The second page has a non-null address and still resolves.
        resolver.resolve(4096).unwrap();
    }

    #[test]
    fn test_unrecognized_frame_is_fatal() {
        let base = PhysAddr::new(0x1_0000_0000);
        let (sim, region) = setup(base, 2);
        sim.poison_frame(base.offset(4096).frame());
        let resolver = FaultResolver::new(&sim, &region);

        let err = resolver.resolve(4096).unwrap_err();
        assert_eq!(err, Error::InvalidFrame);
        assert!(err.is_fault_fatal());
        // Other pages are unaffected.
        resolver.resolve(0).unwrap();
    }

    #[test]
    fn test_each_resolution_takes_a_frame_reference() {
        let base = PhysAddr::new(0x1_0000_0000);
        let (sim, region) = setup(base, 1);
        let resolver = FaultResolver::new(&sim, &region);

        resolver.resolve(0).unwrap();
        resolver.resolve(0).unwrap();
        assert_eq!(sim.frame_refcount(base.frame()), 2);
    }
}
