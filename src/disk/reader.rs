//! Blocking storage reads over the asynchronous reply stream.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::config::CommunicationConfig;
use crate::dispatch::MessageDispatcher;
use crate::error::{NeoError, Result};
use crate::filter::MessageFilter;
use crate::network::NetId;
use crate::transport::Transport;

use super::{prepare_read, BlockSizeBounds, ReadAccumulator, ReadOutcome, SECTOR_SIZE};

/// Rendezvous between the delivery thread and the waiting caller.
struct ReadState {
    acc: Mutex<ReadAccumulator>,
    done: Condvar,
}

/// Reads device storage through a dispatcher and a transport.
///
/// Cloning yields another reader over the same dispatcher and transport.
#[derive(Clone)]
pub struct RegionReader {
    dispatcher: MessageDispatcher,
    transport: Arc<dyn Transport>,
    bounds: BlockSizeBounds,
    sector_size: u64,
}

impl RegionReader {
    /// Create a reader using the standard sector size.
    pub fn new(
        dispatcher: MessageDispatcher,
        transport: Arc<dyn Transport>,
        bounds: BlockSizeBounds,
    ) -> Self {
        Self {
            dispatcher,
            transport,
            bounds,
            sector_size: SECTOR_SIZE,
        }
    }

    /// Create a reader from a communication config.
    pub fn from_config(
        dispatcher: MessageDispatcher,
        transport: Arc<dyn Transport>,
        config: &CommunicationConfig,
    ) -> Self {
        Self::new(dispatcher, transport, config.block_size_bounds).with_sector_size(config.sector_size)
    }

    /// Override the sector size used for addressing.
    ///
    /// Reads fail with [`NeoError::InvalidConfig`] if the size is zero, and
    /// with [`NeoError::InvalidAlignment`] for positions inside a sector.
    pub fn with_sector_size(mut self, sector_size: u64) -> Self {
        self.sector_size = sector_size;
        self
    }

    /// Get the block size bounds.
    pub fn bounds(&self) -> BlockSizeBounds {
        self.bounds
    }

    /// Get the sector size.
    pub fn sector_size(&self) -> u64 {
        self.sector_size
    }

    pub(crate) fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Read `into.len()` bytes starting at byte offset `pos`.
    ///
    /// Both `pos` and the length must be multiples of the minimum block
    /// size, and the length may not exceed the maximum. Blocks until all
    /// reply chunks arrived or `timeout` elapsed. `into` is only written on
    /// success.
    pub fn read_aligned(&self, pos: u64, into: &mut [u8], timeout: Duration) -> Result<usize> {
        let amount = into.len();
        let command = prepare_read(&self.bounds, self.sector_size, pos, amount as u64)?;
        if amount == 0 {
            return Ok(0);
        }

        let state = Arc::new(ReadState {
            acc: Mutex::new(ReadAccumulator::new(amount)),
            done: Condvar::new(),
        });

        // Registered before the request goes out so no reply can be missed.
        let handler_state = state.clone();
        let registration = self.dispatcher.register(
            MessageFilter::for_network(NetId::NeoMemorySdRead),
            move |message| {
                let finished = handler_state.acc.lock().accept(message);
                if finished {
                    handler_state.done.notify_all();
                }
                Ok(())
            },
        );

        debug!(pos, amount, sector = command.sector, "Storage read started");
        self.transport.write(&command.to_bytes())?;

        let deadline = Instant::now() + timeout;
        let outcome = {
            let mut acc = state.acc.lock();
            while !acc.is_finished() {
                if state.done.wait_until(&mut acc, deadline).timed_out() {
                    break;
                }
            }
            match acc.outcome() {
                ReadOutcome::Complete => {
                    into.copy_from_slice(acc.data());
                    Ok(amount)
                }
                ReadOutcome::Failed(reason) => Err(NeoError::protocol(reason.clone())),
                ReadOutcome::Pending => {
                    warn!(pos, amount, received = acc.copied(), "Storage read timed out");
                    Err(NeoError::Timeout)
                }
            }
        };

        // The accumulator lock must be released before removal, since the
        // handler takes it while holding the registration gate.
        registration.unregister();

        match &outcome {
            Ok(_) => debug!(pos, amount, "Storage read complete"),
            Err(NeoError::ProtocolError(reason)) => {
                warn!(pos, amount, %reason, "Storage read rejected a reply")
            }
            Err(_) => {}
        }
        outcome
    }

    /// Read an arbitrary byte range, aligned or not.
    ///
    /// The range is split into aligned reads of at most the maximum block
    /// size, each bounded by `timeout`.
    pub fn read(&self, pos: u64, into: &mut [u8], timeout: Duration) -> Result<usize> {
        let min = self.bounds.min();
        let chunk = self.bounds.max_aligned().min(u16::MAX as u64 / min * min);
        if chunk == 0 {
            return Err(NeoError::overflow(format!(
                "minimum block size {min} does not fit in a single read command"
            )));
        }

        let min = min as usize;
        let chunk = chunk as usize;
        let mut bounce = vec![0u8; chunk];
        let mut done = 0usize;

        while done < into.len() {
            let cur = pos
                .checked_add(done as u64)
                .ok_or_else(|| NeoError::overflow("read position overflows u64"))?;
            let skip = (cur % min as u64) as usize;
            let aligned = cur - skip as u64;
            let wanted = into.len() - done;
            let span = (skip + wanted).div_ceil(min).saturating_mul(min).min(chunk);

            self.read_aligned(aligned, &mut bounce[..span], timeout)?;

            let n = (span - skip).min(wanted);
            into[done..done + n].copy_from_slice(&bounce[skip..skip + n]);
            done += n;
        }

        Ok(done)
    }
}

impl std::fmt::Debug for RegionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionReader")
            .field("bounds", &self.bounds)
            .field("sector_size", &self.sector_size)
            .finish()
    }
}
