//! Per-call reply accumulation for storage reads.

use tracing::trace;

use crate::message::Message;

/// Where a read currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// Waiting for more reply chunks.
    Pending,
    /// Exactly the requested number of bytes arrived.
    Complete,
    /// A reply was rejected; the reason is kept for the error.
    Failed(String),
}

/// Destination buffer plus progress of one region read.
///
/// The buffer is allocated to the requested length up front and is never
/// written past it.
#[derive(Debug)]
pub(crate) struct ReadAccumulator {
    buf: Vec<u8>,
    copied: usize,
    outcome: ReadOutcome,
}

impl ReadAccumulator {
    pub(crate) fn new(amount: usize) -> Self {
        Self {
            buf: vec![0u8; amount],
            copied: 0,
            outcome: ReadOutcome::Pending,
        }
    }

    /// Take one reply into account.
    ///
    /// Returns `true` when this reply finished the read, successfully or
    /// not, and the waiter should be woken. Replies arriving after the read
    /// finished are ignored.
    pub(crate) fn accept(&mut self, message: &Message) -> bool {
        if self.is_finished() {
            trace!(kind = ?message.kind(), "Reply after read finished, ignored");
            return false;
        }

        let Message::ReadMemorySd(reply) = message else {
            self.outcome = ReadOutcome::Failed(format!(
                "unexpected {:?} reply on {}",
                message.kind(),
                message.network()
            ));
            return true;
        };

        let len = reply.data.len();
        let end = self.copied + len;
        if end > self.buf.len() {
            self.outcome = ReadOutcome::Failed(format!(
                "reply of {len} bytes overflows read: {} of {} bytes already received",
                self.copied,
                self.buf.len()
            ));
            return true;
        }

        self.buf[self.copied..end].copy_from_slice(&reply.data);
        self.copied = end;

        if self.copied == self.buf.len() {
            self.outcome = ReadOutcome::Complete;
            return true;
        }
        false
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.outcome != ReadOutcome::Pending
    }

    pub(crate) fn outcome(&self) -> &ReadOutcome {
        &self.outcome
    }

    pub(crate) fn copied(&self) -> usize {
        self.copied
    }

    /// The accumulated bytes. Only meaningful once complete.
    pub(crate) fn data(&self) -> &[u8] {
        &self.buf
    }
}
