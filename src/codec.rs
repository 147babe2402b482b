//! Conversion between raw frames and decoded messages.

use bytes::Bytes;

use crate::error::{NeoError, Result};
use crate::message::{Message, RawMessage, ReadMemorySdMessage};
use crate::network::NetId;
use crate::packet::HardwareCanPacket;

/// Hardware capabilities the encoder needs to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderSettings {
    /// Target accepts CAN FD frames (EDL/BRS).
    pub supports_can_fd: bool,
}

impl EncoderSettings {
    /// Settings for a classic-CAN-only target.
    pub const fn classic() -> Self {
        Self {
            supports_can_fd: false,
        }
    }

    /// Settings for a CAN FD capable target.
    pub const fn can_fd() -> Self {
        Self {
            supports_can_fd: true,
        }
    }
}

/// Decode one inbound frame received on `network`.
///
/// CAN networks carry hardware CAN records, storage read replies carry
/// opaque chunks, and everything else is passed through as a raw message.
pub fn decode_frame(network: NetId, frame: &[u8]) -> Result<Message> {
    if network.is_can() {
        return HardwareCanPacket::decode(network, frame).map(Message::Can);
    }

    match network {
        NetId::NeoMemorySdRead => Ok(ReadMemorySdMessage::new(Bytes::copy_from_slice(frame)).into()),
        _ => Ok(RawMessage::new(network, Bytes::copy_from_slice(frame)).into()),
    }
}

/// Encode a message for transmission.
pub fn encode(message: &Message, settings: &EncoderSettings) -> Result<Vec<u8>> {
    match message {
        Message::Can(can) => HardwareCanPacket::encode(can, settings),
        other => Err(NeoError::unsupported(format!(
            "{:?} messages cannot be transmitted",
            other.kind()
        ))),
    }
}

/// An encoder bound to one device's capabilities.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    settings: EncoderSettings,
}

impl Encoder {
    /// Create a new encoder.
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Get the encoder settings.
    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Encode a message.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        encode(message, &self.settings)
    }
}
