//! # Lifecycle Manager
//!
//! Owns the region's creation and guarantees its release exactly once,
//! across every error path.

use alloc::sync::Arc;

use peermem_core::{ByteSize, DeviceHandle, Error, PAGE_SIZE, Result};
use peermem_hal::{DeviceMemoryProvider, ProviderCaps};

use crate::arbiter::AccessArbiter;
use crate::config::MapConfig;
use crate::region::MemoryRegion;
use crate::session::{MapWindow, MappingSession};

// =============================================================================
// LIFECYCLE STATE
// =============================================================================

/// Initialization progress of a mapping context
///
/// Teardown releases exactly the resources the current state says were
/// acquired, so a failure at any step rolls back cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing acquired
    Uninitialized,
    /// Device handle resolved, no region yet
    DeviceAcquired,
    /// Region allocated from the device pool
    RegionAllocated,
    /// Sessions may be opened
    Ready,
}

// =============================================================================
// PEER MEMORY MAP
// =============================================================================

/// One device's mapped peer memory region and its session arbitration
///
/// Explicitly constructed and explicitly owned; independent contexts can
/// coexist against different devices (or different providers).
#[derive(Debug)]
pub struct PeerMemMap<P: DeviceMemoryProvider> {
    provider: Arc<P>,
    config: MapConfig,
    state: LifecycleState,
    device: Option<DeviceHandle>,
    region: Option<MemoryRegion>,
    arbiter: Arc<AccessArbiter>,
}

impl<P: DeviceMemoryProvider> PeerMemMap<P> {
    /// Resolve the target device and allocate the region
    ///
    /// Runs the locator and the allocator in sequence. Any failure tears
    /// down whatever was acquired up to that point and returns the error;
    /// no resource leaks, no double release.
    pub fn initialize(provider: Arc<P>, config: MapConfig) -> Result<Self> {
        config.validate()?;

        let mut map = Self {
            provider,
            config,
            state: LifecycleState::Uninitialized,
            device: None,
            region: None,
            arbiter: Arc::new(AccessArbiter::exclusive()),
        };

        match map.bring_up() {
            Ok(()) => {
                map.state = LifecycleState::Ready;
                log::info!("peermem (v{}) ready", crate::VERSION);
                log::info!(
                    "{} allocated from {} peer memory",
                    config.size,
                    config.target
                );
                Ok(map)
            }
            Err(err) => {
                map.tear_down();
                Err(err)
            }
        }
    }

    fn bring_up(&mut self) -> Result<()> {
        let device = self.provider.resolve(self.config.target)?;
        self.device = Some(device);
        self.state = LifecycleState::DeviceAcquired;

        let caps = self.provider.capabilities(device)?;
        if !caps.contains(ProviderCaps::PEER_MEMORY) {
            log::error!("{} does not support peer memory", self.config.target);
            return Err(Error::PeerMemUnsupported);
        }

        let base = self.provider.alloc_peer_memory(device, self.config.size)?;
        self.region = Some(MemoryRegion::new(device, base, self.config.size));
        self.state = LifecycleState::RegionAllocated;

        Ok(())
    }

    /// Current lifecycle state
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// The configuration this context was built from
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// The mapped region, once allocated
    pub const fn region(&self) -> Option<&MemoryRegion> {
        self.region.as_ref()
    }

    /// Sessions currently open
    pub fn open_sessions(&self) -> u32 {
        self.arbiter.open_count()
    }

    /// Open a mapping session over `[offset, offset + len)`
    ///
    /// The window is bounds-checked here, once; faults can then never
    /// reach past the region. Contention for the arbiter's slots fails
    /// with [`Error::Busy`] and changes nothing.
    pub fn open_session(&self, offset: u64, len: ByteSize) -> Result<MappingSession<P>> {
        if self.state != LifecycleState::Ready {
            return Err(Error::InvalidState);
        }
        let region = self.region.ok_or(Error::InvalidState)?;

        if offset & (PAGE_SIZE - 1) != 0 || !len.is_page_multiple() {
            return Err(Error::InvalidSize);
        }
        let end = offset
            .checked_add(len.as_bytes())
            .ok_or(Error::OutOfRange)?;
        if end > region.size().as_bytes() {
            log::error!(
                "window of {} at offset {:#x} exceeds region size {}",
                len,
                offset,
                region.size()
            );
            return Err(Error::OutOfRange);
        }

        self.arbiter.try_acquire()?;
        log::debug!("session opened: offset {offset:#x}, length {len}");

        Ok(MappingSession::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.arbiter),
            region,
            MapWindow::new(offset, len),
        ))
    }

    /// Release the region and the device handle
    ///
    /// Refused with [`Error::Busy`] while sessions are open; the region
    /// must never be pulled out from under a live mapping. Calling again
    /// after a completed shutdown is a no-op.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state == LifecycleState::Uninitialized {
            return Ok(());
        }
        let open = self.arbiter.open_count();
        if open != 0 {
            log::error!("shutdown refused: {open} session(s) still open");
            return Err(Error::Busy);
        }

        self.tear_down();
        log::info!("peer memory released");
        Ok(())
    }

    /// Release acquired resources in order: region first, then device.
    /// Total over partial states: absent resources are skipped.
    fn tear_down(&mut self) {
        if let Some(region) = self.region.take() {
            self.provider
                .free_peer_memory(region.device(), region.base(), region.size());
        }
        if let Some(device) = self.device.take() {
            self.provider.release_device(device);
        }
        self.state = LifecycleState::Uninitialized;
    }
}

impl<P: DeviceMemoryProvider> Drop for PeerMemMap<P> {
    fn drop(&mut self) {
        if self.state == LifecycleState::Uninitialized {
            return;
        }
        if self.arbiter.open_count() != 0 {
            // Freeing under a live mapping trades a leak for a dangling
            // frame; keep the leak.
            log::error!("mapping context dropped with open sessions; region not reclaimed");
            return;
        }
        self.tear_down();
    }
}
