//! # Mapping Configuration
//!
//! Startup parameters for one mapped region: the target device address
//! and the region size.

use core::str::FromStr;

use peermem_core::{ByteSize, Error, PciAddr, Result};

// =============================================================================
// MAP CONFIGURATION
// =============================================================================

/// Configuration for one peer memory mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Device whose peer memory pool backs the region
    pub target: PciAddr,
    /// Region size in bytes
    pub size: ByteSize,
}

impl MapConfig {
    /// Default region size: one page
    pub const DEFAULT_SIZE: ByteSize = ByteSize::PAGE;

    /// Configuration for `target` with the default size
    pub const fn new(target: PciAddr) -> Self {
        Self {
            target,
            size: Self::DEFAULT_SIZE,
        }
    }

    /// Configuration from a textual device address
    ///
    /// Accepts both `"bus:device.function"` and
    /// `"domain:bus:device.function"` hexadecimal forms.
    pub fn from_target_str(target: &str) -> Result<Self> {
        Ok(Self::new(PciAddr::from_str(target)?))
    }

    /// Override the region size
    pub const fn with_size(mut self, size: ByteSize) -> Self {
        self.size = size;
        self
    }

    /// Check the configuration before any resource is acquired
    ///
    /// The size must be a positive multiple of the page size.
    pub fn validate(&self) -> Result<()> {
        if !self.size.is_page_multiple() {
            log::error!("region size {} is not a positive page multiple", self.size);
            return Err(Error::InvalidSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peermem_core::PAGE_SIZE;

    #[test]
    fn test_default_size_is_one_page() {
        let config = MapConfig::from_target_str("0000:03:00.0").unwrap();
        assert_eq!(config.size.as_bytes(), PAGE_SIZE);
        assert_eq!(config.target, PciAddr::new(0, 3, 0, 0));
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_target_string() {
        assert_eq!(
            MapConfig::from_target_str("not-a-device"),
            Err(Error::InvalidAddress)
        );
    }

    #[test]
    fn test_validate_rejects_non_page_multiples() {
        let base = MapConfig::from_target_str("03:00.0").unwrap();
        for bytes in [0, 1, 100, PAGE_SIZE - 1, PAGE_SIZE + 1, 3 * PAGE_SIZE / 2] {
            let config = base.with_size(ByteSize::from_bytes(bytes));
            assert_eq!(config.validate(), Err(Error::InvalidSize), "{bytes}");
        }
    }

    #[test]
    fn test_validate_accepts_page_multiples() {
        let base = MapConfig::from_target_str("03:00.0").unwrap();
        for pages in [1, 2, 16, 1024] {
            base.with_size(ByteSize::from_pages(pages)).validate().unwrap();
        }
    }
}
