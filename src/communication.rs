//! Session-level glue between a transport, the codec and the dispatcher.
//!
//! The transport layer owns the read side of the link and calls
//! [`Communication::handle_frame`] once per inbound frame. Everything
//! upward (callbacks, storage reads, transmit) goes through this type.

use std::sync::Arc;

use tracing::warn;

use crate::codec::{decode_frame, Encoder};
use crate::config::CommunicationConfig;
use crate::disk::RegionReader;
use crate::dispatch::{MessageDispatcher, Registration};
use crate::error::Result;
use crate::filter::MessageFilter;
use crate::message::Message;
use crate::network::NetId;
use crate::transport::Transport;

/// One adapter session.
#[derive(Clone)]
pub struct Communication {
    dispatcher: MessageDispatcher,
    transport: Arc<dyn Transport>,
    encoder: Encoder,
    config: CommunicationConfig,
}

impl Communication {
    /// Create a session over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: CommunicationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dispatcher: MessageDispatcher::new(),
            transport,
            encoder: Encoder::new(config.encoder),
            config,
        })
    }

    /// Get the session configuration.
    pub fn config(&self) -> &CommunicationConfig {
        &self.config
    }

    /// Get the dispatcher inbound messages are delivered through.
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// Decode one inbound frame and deliver it.
    ///
    /// Frames that fail to decode are logged and reported, and nothing is
    /// dispatched. Returns the number of handlers invoked.
    pub fn handle_frame(&self, network: NetId, frame: &[u8]) -> Result<usize> {
        let message = decode_frame(network, frame).inspect_err(|e| {
            warn!(%network, len = frame.len(), error = %e, "Dropping undecodable frame");
        })?;
        Ok(self.dispatcher.dispatch(Arc::new(message)))
    }

    /// Register a callback for inbound messages matching `filter`.
    #[must_use = "dropping the registration immediately removes the callback"]
    pub fn add_message_callback<F>(&self, filter: MessageFilter, callback: F) -> Registration
    where
        F: Fn(&Arc<Message>) -> Result<()> + Send + Sync + 'static,
    {
        self.dispatcher.register(filter, callback)
    }

    /// Write a raw frame without encoding.
    pub fn raw_write(&self, frame: &[u8]) -> Result<()> {
        self.transport.write(frame)
    }

    /// Encode a message and write it.
    pub fn transmit(&self, message: &Message) -> Result<()> {
        let frame = self.encoder.encode(message)?;
        self.transport.write(&frame)
    }

    /// A storage reader bound to this session.
    pub fn region_reader(&self) -> RegionReader {
        RegionReader::from_config(self.dispatcher.clone(), self.transport.clone(), &self.config)
    }

    /// Read an arbitrary storage range with the configured timeout.
    pub fn read_storage(&self, pos: u64, into: &mut [u8]) -> Result<usize> {
        self.region_reader().read(pos, into, self.config.read_timeout)
    }
}

impl std::fmt::Debug for Communication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communication")
            .field("dispatcher", &self.dispatcher)
            .field("encoder", &self.encoder)
            .field("config", &self.config)
            .finish()
    }
}
