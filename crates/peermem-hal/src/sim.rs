//! # Simulated Provider
//!
//! A [`DeviceMemoryProvider`] backed by ordinary host bookkeeping instead
//! of privileged hardware access. Devices are registered up front with a
//! synthetic physical pool; reference counts on devices and frames are
//! observable, which is what the lifecycle and fault tests assert against.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use spin::Mutex;

use peermem_core::{ByteSize, DeviceHandle, Error, PageFrame, PciAddr, Pfn, PhysAddr, Result};

use crate::provider::{DeviceMemoryProvider, ProviderCaps};

// =============================================================================
// DEVICE DESCRIPTOR
// =============================================================================

/// Description of one simulated device
#[derive(Debug, Clone, Copy)]
pub struct SimDeviceDesc {
    /// PCI address the device answers to
    pub addr: PciAddr,
    /// Advertised capabilities
    pub caps: ProviderCaps,
    /// Physical base of the device's peer memory pool
    pub base: PhysAddr,
    /// Pool size in bytes
    pub pool: ByteSize,
}

impl SimDeviceDesc {
    /// Default pool placement for registered devices
    pub const DEFAULT_BASE: PhysAddr = PhysAddr::new(0x1_0000_0000);

    /// Create a descriptor with peer memory support and a 1 MiB pool
    pub const fn new(addr: PciAddr) -> Self {
        Self {
            addr,
            caps: ProviderCaps::PEER_MEMORY.union(ProviderCaps::COHERENT_DMA),
            base: Self::DEFAULT_BASE,
            pool: ByteSize::from_mib(1),
        }
    }

    /// Override the advertised capabilities
    pub const fn with_caps(mut self, caps: ProviderCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Override the pool base address
    pub const fn with_base(mut self, base: PhysAddr) -> Self {
        self.base = base;
        self
    }

    /// Override the pool size
    pub const fn with_pool(mut self, pool: ByteSize) -> Self {
        self.pool = pool;
        self
    }
}

// =============================================================================
// SIMULATED STATE
// =============================================================================

/// One registered device plus its live bookkeeping
#[derive(Debug)]
struct SimDevice {
    desc: SimDeviceDesc,
    /// Outstanding resolve references
    refcount: u32,
    /// Bump cursor into the pool
    cursor: u64,
    /// Blocks handed out and not yet freed
    outstanding: u32,
}

/// Operations observed by the provider, in call order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOp {
    /// A device was resolved
    Resolve,
    /// A device reference was released
    Release,
    /// A pool block was allocated
    Alloc,
    /// A pool block was freed
    Free,
    /// A frame reference was taken
    AcquireFrame,
}

/// Provider call counters
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    /// Successful resolves
    pub resolves: u64,
    /// Device releases
    pub releases: u64,
    /// Successful pool allocations
    pub allocs: u64,
    /// Pool frees
    pub frees: u64,
    /// Frame references taken
    pub frames_acquired: u64,
}

#[derive(Debug, Default)]
struct SimState {
    devices: Vec<SimDevice>,
    /// Per-frame reference counts, keyed by raw pfn
    frame_refs: BTreeMap<u64, u32>,
    /// Frames the platform pretends not to back with memory
    poisoned: BTreeSet<u64>,
    ops: Vec<SimOp>,
    stats: SimStats,
}

impl SimState {
    fn device(&self, handle: DeviceHandle) -> Option<&SimDevice> {
        let index = handle.id().checked_sub(1)? as usize;
        self.devices.get(index)
    }

    fn device_mut(&mut self, handle: DeviceHandle) -> Option<&mut SimDevice> {
        let index = handle.id().checked_sub(1)? as usize;
        self.devices.get_mut(index)
    }
}

// =============================================================================
// SIMULATED PROVIDER
// =============================================================================

/// In-memory [`DeviceMemoryProvider`] for deterministic testing
#[derive(Debug, Default)]
pub struct SimProvider {
    state: Mutex<SimState>,
}

impl SimProvider {
    /// Create an empty provider with no devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device; it becomes resolvable immediately
    pub fn register(&self, desc: SimDeviceDesc) {
        self.state.lock().devices.push(SimDevice {
            desc,
            refcount: 0,
            cursor: 0,
            outstanding: 0,
        });
    }

    /// Mark a frame as unrecognized by the platform
    pub fn poison_frame(&self, pfn: Pfn) {
        self.state.lock().poisoned.insert(pfn.raw());
    }

    /// Outstanding resolve references on the device at `addr`
    pub fn device_refcount(&self, addr: PciAddr) -> Option<u32> {
        let state = self.state.lock();
        state
            .devices
            .iter()
            .find(|d| d.desc.addr == addr)
            .map(|d| d.refcount)
    }

    /// Reference count currently held on a frame
    pub fn frame_refcount(&self, pfn: Pfn) -> u32 {
        self.state
            .lock()
            .frame_refs
            .get(&pfn.raw())
            .copied()
            .unwrap_or(0)
    }

    /// Pool blocks handed out and not yet freed, across all devices
    pub fn outstanding_allocs(&self) -> u32 {
        self.state.lock().devices.iter().map(|d| d.outstanding).sum()
    }

    /// Provider operations in call order
    pub fn ops(&self) -> Vec<SimOp> {
        self.state.lock().ops.clone()
    }

    /// Call counters
    pub fn stats(&self) -> SimStats {
        self.state.lock().stats.clone()
    }
}

impl DeviceMemoryProvider for SimProvider {
    fn resolve(&self, addr: PciAddr) -> Result<DeviceHandle> {
        let mut state = self.state.lock();
        let index = state
            .devices
            .iter()
            .position(|d| d.desc.addr == addr)
            .ok_or(Error::DeviceNotFound)?;

        state.devices[index].refcount += 1;
        state.stats.resolves += 1;
        state.ops.push(SimOp::Resolve);

        Ok(DeviceHandle::new(index as u64 + 1))
    }

    fn capabilities(&self, device: DeviceHandle) -> Result<ProviderCaps> {
        let state = self.state.lock();
        state
            .device(device)
            .map(|d| d.desc.caps)
            .ok_or(Error::DeviceNotFound)
    }

    fn alloc_peer_memory(&self, device: DeviceHandle, size: ByteSize) -> Result<PhysAddr> {
        let mut state = self.state.lock();
        let dev = state.device_mut(device).ok_or(Error::DeviceNotFound)?;

        let end = dev
            .cursor
            .checked_add(size.as_bytes())
            .ok_or(Error::AllocationFailed)?;
        if end > dev.desc.pool.as_bytes() {
            return Err(Error::AllocationFailed);
        }

        let base = dev.desc.base.offset(dev.cursor);
        dev.cursor = end;
        dev.outstanding += 1;

        state.stats.allocs += 1;
        state.ops.push(SimOp::Alloc);

        Ok(base)
    }

    fn free_peer_memory(&self, device: DeviceHandle, _base: PhysAddr, _size: ByteSize) {
        let mut state = self.state.lock();
        match state.device_mut(device) {
            Some(dev) if dev.outstanding > 0 => dev.outstanding -= 1,
            Some(_) => log::error!("free of a block that was never handed out"),
            None => {
                log::error!("free against unknown device handle {:?}", device);
                return;
            }
        }
        state.stats.frees += 1;
        state.ops.push(SimOp::Free);
    }

    fn release_device(&self, device: DeviceHandle) {
        let mut state = self.state.lock();
        match state.device_mut(device) {
            Some(dev) if dev.refcount > 0 => dev.refcount -= 1,
            Some(_) => log::error!("unbalanced release of device handle {:?}", device),
            None => {
                log::error!("release of unknown device handle {:?}", device);
                return;
            }
        }
        state.stats.releases += 1;
        state.ops.push(SimOp::Release);
    }

    fn frame_valid(&self, pfn: Pfn) -> bool {
        let state = self.state.lock();
        if state.poisoned.contains(&pfn.raw()) {
            return false;
        }

        let pa = pfn.phys().raw();
        state.devices.iter().any(|d| {
            let base = d.desc.base.raw();
            pa >= base && pa - base < d.desc.pool.as_bytes()
        })
    }

    fn acquire_frame(&self, pfn: Pfn) -> Result<PageFrame> {
        let mut state = self.state.lock();
        if state.poisoned.contains(&pfn.raw()) {
            return Err(Error::InvalidFrame);
        }

        *state.frame_refs.entry(pfn.raw()).or_insert(0) += 1;
        state.stats.frames_acquired += 1;
        state.ops.push(SimOp::AcquireFrame);

        Ok(PageFrame::new(pfn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> PciAddr {
        PciAddr::new(0, 0x03, 0x00, 0x0)
    }

    fn provider() -> SimProvider {
        let sim = SimProvider::new();
        sim.register(SimDeviceDesc::new(addr()).with_pool(ByteSize::from_pages(4)));
        sim
    }

    #[test]
    fn test_resolve_unknown_address_fails() {
        let sim = provider();
        let missing = PciAddr::new(0, 0x7f, 0x1f, 0x7);
        assert_eq!(sim.resolve(missing), Err(Error::DeviceNotFound));
        assert_eq!(sim.device_refcount(addr()), Some(0));
    }

    #[test]
    fn test_resolve_takes_a_reference() {
        let sim = provider();
        let dev = sim.resolve(addr()).unwrap();
        assert_eq!(sim.device_refcount(addr()), Some(1));
        sim.release_device(dev);
        assert_eq!(sim.device_refcount(addr()), Some(0));
    }

    #[test]
    fn test_pool_exhaustion() {
        let sim = provider();
        let dev = sim.resolve(addr()).unwrap();

        let first = sim.alloc_peer_memory(dev, ByteSize::from_pages(3)).unwrap();
        assert_eq!(first, SimDeviceDesc::DEFAULT_BASE);
        assert_eq!(
            sim.alloc_peer_memory(dev, ByteSize::from_pages(2)),
            Err(Error::AllocationFailed)
        );
        // The remaining page is still available.
        let second = sim.alloc_peer_memory(dev, ByteSize::from_pages(1)).unwrap();
        assert_eq!(second, SimDeviceDesc::DEFAULT_BASE.offset(3 * 4096));
        assert_eq!(sim.outstanding_allocs(), 2);
    }

    #[test]
    fn test_frame_validity_tracks_pool_bounds() {
        let sim = provider();
        let inside = SimDeviceDesc::DEFAULT_BASE.frame();
        let outside = SimDeviceDesc::DEFAULT_BASE.offset(4 * 4096).frame();
        assert!(sim.frame_valid(inside));
        assert!(!sim.frame_valid(outside));

        sim.poison_frame(inside);
        assert!(!sim.frame_valid(inside));
        assert_eq!(sim.acquire_frame(inside), Err(Error::InvalidFrame));
    }

    #[test]
    fn test_frame_references_accumulate() {
        let sim = provider();
        let pfn = SimDeviceDesc::DEFAULT_BASE.frame();
        assert_eq!(sim.frame_refcount(pfn), 0);

        let frame = sim.acquire_frame(pfn).unwrap();
        assert_eq!(frame.pfn(), pfn);
        sim.acquire_frame(pfn).unwrap();
        assert_eq!(sim.frame_refcount(pfn), 2);
    }
}
