//! Outbound transport abstraction.
//!
//! The core never opens or enumerates devices. The surrounding layer hands
//! it something that can write raw frames, and calls
//! [`Communication::handle_frame`](crate::communication::Communication::handle_frame)
//! for each inbound frame it receives.

use std::io::{BufWriter, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{NeoError, Result};

/// A byte-oriented, full-duplex channel to the adapter (write side).
pub trait Transport: Send + Sync {
    /// Write one raw frame.
    fn write(&self, frame: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn write(&self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }
}

/// Transport over any [`Write`] sink, such as an opened serial TTY.
///
/// Each frame is written in full and flushed before `write` returns.
#[derive(Debug)]
pub struct WriteTransport<W: Write + Send> {
    writer: Mutex<Option<BufWriter<W>>>,
}

impl<W: Write + Send> WriteTransport<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(Some(BufWriter::new(writer))),
        }
    }

    /// Flush and stop accepting frames.
    ///
    /// Returns the inner writer. Later writes fail with
    /// [`NeoError::TransportClosed`].
    pub fn close(&self) -> Result<Option<W>> {
        let Some(writer) = self.writer.lock().take() else {
            return Ok(None);
        };
        let inner = writer.into_inner().map_err(|e| NeoError::Io(e.into_error()))?;
        Ok(Some(inner))
    }

    /// Check whether the transport still accepts frames.
    pub fn is_open(&self) -> bool {
        self.writer.lock().is_some()
    }
}

impl<W: Write + Send> Transport for WriteTransport<W> {
    fn write(&self, frame: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(NeoError::TransportClosed)?;
        writer.write_all(frame)?;
        writer.flush()?;
        trace!(len = frame.len(), "Frame written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_transport() {
        let transport = WriteTransport::new(Vec::new());
        transport.write(&[1, 2, 3]).unwrap();
        transport.write(&[4]).unwrap();
        assert!(transport.is_open());

        let inner = transport.close().unwrap().unwrap();
        assert_eq!(inner, vec![1, 2, 3, 4]);
        assert!(!transport.is_open());
        assert!(matches!(
            transport.write(&[5]),
            Err(NeoError::TransportClosed)
        ));
        assert!(transport.close().unwrap().is_none());
    }

    #[test]
    fn test_shared_transport() {
        let transport: Arc<dyn Transport> = Arc::new(WriteTransport::new(std::io::sink()));
        let shared = transport.clone();
        shared.write(&[0xAA; 7]).unwrap();
    }
}
