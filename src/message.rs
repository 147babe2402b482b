//! Decoded bus messages.

use bytes::Bytes;

use crate::network::NetId;

/// Largest identifier representable in a standard (11-bit) frame.
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// Largest identifier representable in an extended (29-bit) frame.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Discriminant of a [`Message`], usable in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// CAN or CAN FD frame.
    Can,
    /// Chunk of a storage read reply.
    ReadMemorySd,
    /// Anything the codec does not interpret.
    Raw,
}

/// A decoded message as delivered by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// CAN or CAN FD frame.
    Can(CanMessage),
    /// Chunk of a storage read reply.
    ReadMemorySd(ReadMemorySdMessage),
    /// Uninterpreted payload for a network the codec does not decode.
    Raw(RawMessage),
}

impl Message {
    /// Get the message kind.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Can(_) => MessageKind::Can,
            Self::ReadMemorySd(_) => MessageKind::ReadMemorySd,
            Self::Raw(_) => MessageKind::Raw,
        }
    }

    /// Get the network this message arrived on.
    pub fn network(&self) -> NetId {
        match self {
            Self::Can(m) => m.network,
            Self::ReadMemorySd(_) => NetId::NeoMemorySdRead,
            Self::Raw(m) => m.network,
        }
    }

    /// Get the payload bytes.
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Can(m) => &m.data,
            Self::ReadMemorySd(m) => &m.data,
            Self::Raw(m) => &m.data,
        }
    }

    /// Get the CAN frame, if this is one.
    pub fn as_can(&self) -> Option<&CanMessage> {
        match self {
            Self::Can(m) => Some(m),
            _ => None,
        }
    }
}

impl From<CanMessage> for Message {
    fn from(msg: CanMessage) -> Self {
        Self::Can(msg)
    }
}

impl From<ReadMemorySdMessage> for Message {
    fn from(msg: ReadMemorySdMessage) -> Self {
        Self::ReadMemorySd(msg)
    }
}

impl From<RawMessage> for Message {
    fn from(msg: RawMessage) -> Self {
        Self::Raw(msg)
    }
}

/// A CAN or CAN FD frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CanMessage {
    /// Network the frame was received on or is destined for.
    pub network: NetId,
    /// Arbitration identifier (11 or 29 bits).
    pub arb_id: u32,
    /// Frame uses a 29-bit identifier.
    pub is_extended: bool,
    /// Remote transmission request.
    pub is_remote: bool,
    /// CAN FD frame (extended data length).
    pub is_can_fd: bool,
    /// CAN FD bit-rate switch.
    pub baudrate_switch: bool,
    /// CAN FD error state indicator.
    pub error_state_indicator: bool,
    /// This is the echo of a frame we transmitted.
    pub transmitted: bool,
    /// Transmission was aborted.
    pub tx_aborted: bool,
    /// Transmission lost arbitration.
    pub tx_lost_arbitration: bool,
    /// Transmission ended in a bus error.
    pub tx_error: bool,
    /// Reserved network-index bit, as received. Never transmitted.
    pub extended_network_index: bool,
    /// Hardware status word.
    pub status: u16,
    /// Hardware timestamp in device ticks (60 bits).
    pub timestamp: u64,
    /// Frame payload.
    pub data: Bytes,
}

impl CanMessage {
    /// Create a CAN message builder.
    pub fn builder(network: NetId, arb_id: u32) -> CanMessageBuilder {
        CanMessageBuilder::new(network, arb_id)
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Builder for constructing CAN messages.
#[derive(Debug, Clone)]
pub struct CanMessageBuilder {
    msg: CanMessage,
}

impl CanMessageBuilder {
    /// Create a new builder for the given network and identifier.
    pub fn new(network: NetId, arb_id: u32) -> Self {
        Self {
            msg: CanMessage {
                network,
                arb_id,
                ..Default::default()
            },
        }
    }

    /// Request a 29-bit identifier even if the id fits in 11 bits.
    pub fn extended(mut self, extended: bool) -> Self {
        self.msg.is_extended = extended;
        self
    }

    /// Mark as a remote frame.
    pub fn remote(mut self, remote: bool) -> Self {
        self.msg.is_remote = remote;
        self
    }

    /// Mark as a CAN FD frame.
    pub fn can_fd(mut self, fd: bool) -> Self {
        self.msg.is_can_fd = fd;
        self
    }

    /// Enable the CAN FD bit-rate switch.
    pub fn baudrate_switch(mut self, brs: bool) -> Self {
        self.msg.baudrate_switch = brs;
        self
    }

    /// Set the error state indicator.
    pub fn error_state_indicator(mut self, esi: bool) -> Self {
        self.msg.error_state_indicator = esi;
        self
    }

    /// Set the hardware status word.
    pub fn status(mut self, status: u16) -> Self {
        self.msg.status = status;
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.msg.timestamp = timestamp;
        self
    }

    /// Set the payload.
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.msg.data = data.into();
        self
    }

    /// Build the message.
    pub fn build(self) -> CanMessage {
        self.msg
    }
}

/// One chunk of a storage read reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadMemorySdMessage {
    /// Chunk contents.
    pub data: Bytes,
}

impl ReadMemorySdMessage {
    /// Create a new reply chunk.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

/// A payload on a network the codec does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Source network.
    pub network: NetId,
    /// Raw payload.
    pub data: Bytes,
}

impl RawMessage {
    /// Create a new raw message.
    pub fn new(network: NetId, data: impl Into<Bytes>) -> Self {
        Self {
            network,
            data: data.into(),
        }
    }
}
