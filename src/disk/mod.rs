//! Access to device-resident storage.
//!
//! Storage is read in aligned blocks. A read is a single command frame
//! followed by any number of reply chunks on
//! [`NetId::NeoMemorySdRead`](crate::network::NetId::NeoMemorySdRead),
//! accumulated in arrival order until the requested length is reached.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use icsneo_rs::disk::{BlockSizeBounds, RegionReader};
//! use icsneo_rs::dispatch::MessageDispatcher;
//! use icsneo_rs::transport::WriteTransport;
//!
//! let port = std::fs::OpenOptions::new().write(true).open("/dev/ttyACM0").unwrap();
//! let dispatcher = MessageDispatcher::new();
//! let reader = RegionReader::new(
//!     dispatcher,
//!     Arc::new(WriteTransport::new(port)),
//!     BlockSizeBounds::new(512, 32768).unwrap(),
//! );
//!
//! let mut block = vec![0u8; 4096];
//! reader.read_aligned(0, &mut block, Duration::from_secs(1)).unwrap();
//! ```

mod accumulator;
mod reader;
#[cfg(feature = "tokio")]
mod reader_async;

pub use reader::RegionReader;
#[cfg(feature = "tokio")]
pub use reader_async::AsyncRegionReader;

pub(crate) use accumulator::{ReadAccumulator, ReadOutcome};

use crate::command::StorageReadCommand;
use crate::error::{NeoError, Result};

/// Fixed sector size used for storage addressing.
pub const SECTOR_SIZE: u64 = 512;

/// Allowed block sizes for an aligned storage operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSizeBounds {
    min: u64,
    max: u64,
}

impl BlockSizeBounds {
    /// Create bounds, checking `0 < min <= max`.
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min == 0 || min > max {
            return Err(NeoError::InvalidConfig(format!(
                "block size bounds must satisfy 0 < min <= max, got {min}..={max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Smallest block, and the alignment of every position and length.
    pub fn min(&self) -> u64 {
        self.min
    }

    /// Largest single transfer.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Largest multiple of `min` that a single transfer may carry.
    pub fn max_aligned(&self) -> u64 {
        self.max - self.max % self.min
    }
}

impl Default for BlockSizeBounds {
    fn default() -> Self {
        Self {
            min: SECTOR_SIZE,
            max: 32 * 1024,
        }
    }
}

/// Check an aligned read request and build its command frame.
///
/// No I/O happens here; every failure is reported before a frame is built.
pub(crate) fn prepare_read(
    bounds: &BlockSizeBounds,
    sector_size: u64,
    pos: u64,
    amount: u64,
) -> Result<StorageReadCommand> {
    let misaligned = || NeoError::InvalidAlignment {
        pos,
        amount,
        min: bounds.min,
        max: bounds.max,
    };

    if amount > bounds.max {
        return Err(misaligned());
    }
    if amount % bounds.min != 0 {
        return Err(misaligned());
    }
    if pos % bounds.min != 0 {
        return Err(misaligned());
    }
    if sector_size == 0 {
        return Err(NeoError::InvalidConfig("sector size must be non-zero".into()));
    }
    // Addressing is per sector, so a position inside a sector cannot be sent.
    if pos % sector_size != 0 {
        return Err(misaligned());
    }

    let sector = u32::try_from(pos / sector_size).map_err(|_| {
        NeoError::overflow(format!(
            "sector {} for position {pos} does not fit in 32 bits",
            pos / sector_size
        ))
    })?;
    let amount = u16::try_from(amount).map_err(|_| {
        NeoError::overflow(format!("read length {amount} does not fit in 16 bits"))
    })?;

    Ok(StorageReadCommand::new(sector, amount))
}
