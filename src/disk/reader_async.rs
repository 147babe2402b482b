//! Async storage reads for tokio runtimes.
//!
//! Same protocol as [`RegionReader`], but the caller awaits completion
//! instead of parking a thread.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::{NeoError, Result};
use crate::filter::MessageFilter;
use crate::network::NetId;

use super::{prepare_read, BlockSizeBounds, ReadAccumulator, ReadOutcome, RegionReader};

struct ReadState {
    acc: Mutex<ReadAccumulator>,
    done: Notify,
}

/// Async front-end over a [`RegionReader`].
#[derive(Debug, Clone)]
pub struct AsyncRegionReader {
    inner: RegionReader,
}

impl AsyncRegionReader {
    /// Wrap a blocking reader.
    pub fn new(inner: RegionReader) -> Self {
        Self { inner }
    }

    /// Get the block size bounds.
    pub fn bounds(&self) -> BlockSizeBounds {
        self.inner.bounds()
    }

    /// Read `into.len()` bytes starting at byte offset `pos`.
    ///
    /// See [`RegionReader::read_aligned`] for the alignment rules.
    pub async fn read_aligned(
        &self,
        pos: u64,
        into: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        let amount = into.len();
        let command = prepare_read(
            &self.inner.bounds(),
            self.inner.sector_size(),
            pos,
            amount as u64,
        )?;
        if amount == 0 {
            return Ok(0);
        }

        let state = Arc::new(ReadState {
            acc: Mutex::new(ReadAccumulator::new(amount)),
            done: Notify::new(),
        });

        let handler_state = state.clone();
        let registration = self.inner.dispatcher().register(
            MessageFilter::for_network(NetId::NeoMemorySdRead),
            move |message| {
                if handler_state.acc.lock().accept(message) {
                    // Stores a permit if the waiter is not parked yet.
                    handler_state.done.notify_one();
                }
                Ok(())
            },
        );

        debug!(pos, amount, sector = command.sector, "Async storage read started");
        self.inner.transport().write(&command.to_bytes())?;

        let deadline = Instant::now() + timeout;
        loop {
            if state.acc.lock().is_finished() {
                break;
            }
            if timeout_at(deadline, state.done.notified()).await.is_err() {
                break;
            }
        }

        let outcome = {
            let acc = state.acc.lock();
            match acc.outcome() {
                ReadOutcome::Complete => {
                    into.copy_from_slice(acc.data());
                    Ok(amount)
                }
                ReadOutcome::Failed(reason) => {
                    warn!(pos, amount, %reason, "Async storage read rejected a reply");
                    Err(NeoError::protocol(reason.clone()))
                }
                ReadOutcome::Pending => {
                    warn!(pos, amount, received = acc.copied(), "Async storage read timed out");
                    Err(NeoError::Timeout)
                }
            }
        };

        registration.unregister();
        outcome
    }
}

impl From<RegionReader> for AsyncRegionReader {
    fn from(inner: RegionReader) -> Self {
        Self::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MessageDispatcher;
    use crate::message::{Message, ReadMemorySdMessage};
    use crate::transport::Transport;
    use std::thread;

    /// Answers every command with the given chunks from a plain thread.
    struct Echo {
        dispatcher: MessageDispatcher,
        chunks: Vec<Vec<u8>>,
    }

    impl Transport for Echo {
        fn write(&self, _frame: &[u8]) -> Result<()> {
            let dispatcher = self.dispatcher.clone();
            let chunks = self.chunks.clone();
            thread::spawn(move || {
                for data in chunks {
                    let reply: Message = ReadMemorySdMessage::new(data).into();
                    dispatcher.dispatch(Arc::new(reply));
                }
            });
            Ok(())
        }
    }

    fn reader(chunks: Vec<Vec<u8>>) -> (MessageDispatcher, AsyncRegionReader) {
        let dispatcher = MessageDispatcher::new();
        let echo = Arc::new(Echo {
            dispatcher: dispatcher.clone(),
            chunks,
        });
        let inner = RegionReader::new(
            dispatcher.clone(),
            echo,
            BlockSizeBounds::new(512, 4096).unwrap(),
        );
        (dispatcher, inner.into())
    }

    #[tokio::test]
    async fn test_async_read_aligned() {
        let (dispatcher, reader) = reader(vec![vec![1; 256], vec![2; 768]]);

        let mut buf = vec![0u8; 1024];
        let n = reader
            .read_aligned(2048, &mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(n, 1024);
        assert!(buf[..256].iter().all(|&b| b == 1));
        assert!(buf[256..].iter().all(|&b| b == 2));
        assert!(dispatcher.is_empty());
    }

    #[tokio::test]
    async fn test_async_read_timeout() {
        let (dispatcher, reader) = reader(vec![vec![1; 256]]);

        let mut buf = vec![0u8; 512];
        let result = reader
            .read_aligned(0, &mut buf, Duration::from_millis(100))
            .await;
        assert!(matches!(result, Err(NeoError::Timeout)));
        assert!(buf.iter().all(|&b| b == 0));
        assert!(dispatcher.is_empty());
    }

    #[tokio::test]
    async fn test_async_read_rejects_misaligned() {
        let (_, reader) = reader(vec![]);
        let mut buf = vec![0u8; 100];
        assert!(matches!(
            reader.read_aligned(0, &mut buf, Duration::from_millis(10)).await,
            Err(NeoError::InvalidAlignment { .. })
        ));
    }
}
