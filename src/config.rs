//! Communication configuration types.

use std::time::Duration;

use crate::codec::EncoderSettings;
use crate::device::{encoder_settings, DeviceCapabilities};
use crate::disk::{BlockSizeBounds, SECTOR_SIZE};
use crate::error::{NeoError, Result};

/// Settings for one adapter session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunicationConfig {
    /// Timeout for each aligned storage read.
    pub read_timeout: Duration,
    /// Allowed storage transfer sizes.
    pub block_size_bounds: BlockSizeBounds,
    /// Storage sector size.
    pub sector_size: u64,
    /// Encoder capabilities.
    pub encoder: EncoderSettings,
}

impl Default for CommunicationConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(5),
            block_size_bounds: BlockSizeBounds::default(),
            sector_size: SECTOR_SIZE,
            encoder: EncoderSettings::default(),
        }
    }
}

impl CommunicationConfig {
    /// Derive a configuration from a device descriptor.
    pub fn from_capabilities(caps: &DeviceCapabilities) -> Result<Self> {
        let config = Self::default()
            .with_block_size_bounds(BlockSizeBounds::new(caps.block_size_min, caps.block_size_max)?)
            .with_sector_size(caps.sector_size)
            .with_encoder(encoder_settings(caps));
        config.validate()?;
        Ok(config)
    }

    /// Set the storage read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the storage block size bounds.
    pub fn with_block_size_bounds(mut self, bounds: BlockSizeBounds) -> Self {
        self.block_size_bounds = bounds;
        self
    }

    /// Set the storage sector size.
    pub fn with_sector_size(mut self, sector_size: u64) -> Self {
        self.sector_size = sector_size;
        self
    }

    /// Set the encoder capabilities.
    pub fn with_encoder(mut self, encoder: EncoderSettings) -> Self {
        self.encoder = encoder;
        self
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 {
            return Err(NeoError::InvalidConfig("sector size must be non-zero".into()));
        }
        if self.block_size_bounds.min() % self.sector_size != 0 {
            return Err(NeoError::InvalidConfig(format!(
                "minimum block size {} is not a multiple of the sector size {}",
                self.block_size_bounds.min(),
                self.sector_size
            )));
        }
        Ok(())
    }
}
