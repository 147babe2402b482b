//! Host-side communication core for CAN / CAN FD bus-interface adapters.
//!
//! This crate sits between a byte transport (a serial TTY, a USB bulk pipe)
//! and application code. It decodes inbound hardware frames into typed
//! messages, fans them out to registered handlers, encodes outbound CAN
//! frames, and reads the adapter's onboard storage.
//!
//! # Features
//!
//! - Bit-exact hardware CAN / CAN FD record codec
//! - Filtered message dispatch with RAII registrations
//! - Blocking storage reads with timeout (async with the `tokio` feature)
//! - Static device capability descriptors
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use icsneo_rs::{CanMessage, Communication, CommunicationConfig, MessageFilter, NetId};
//! use icsneo_rs::codec::EncoderSettings;
//! use icsneo_rs::packet::HardwareCanPacket;
//! use icsneo_rs::transport::WriteTransport;
//!
//! let transport = Arc::new(WriteTransport::new(std::io::sink()));
//! let com = Communication::new(transport, CommunicationConfig::default()).unwrap();
//!
//! let _callback = com.add_message_callback(MessageFilter::for_network(NetId::HsCan), |msg| {
//!     println!("received {:?}", msg);
//!     Ok(())
//! });
//!
//! // Normally called by the transport's read loop.
//! let frame = HardwareCanPacket::encode(
//!     &CanMessage::builder(NetId::HsCan, 0x123).data(b"hi".as_slice()).build(),
//!     &EncoderSettings::classic(),
//! )
//! .unwrap();
//! assert_eq!(com.handle_frame(NetId::HsCan, &frame).unwrap(), 1);
//! ```
//!
//! # Hardware CAN Record
//!
//! Every CAN frame on the wire is a 24-byte little-endian record, followed by
//! the remaining payload for CAN FD frames longer than 8 bytes:
//!
//! ```text
//! +--------+--------+--------+--------+--------+--------+
//! |  header (SID)   |   eid / TX      |   dlc / EID2    |  (6 bytes)
//! +--------+--------+--------+--------+--------+--------+
//! |                 data[0..8]                          |  (8 bytes)
//! +--------+--------+--------+--------+--------+--------+
//! |      stats      |       timestamp (60 bit)  ...     |  (10 bytes)
//! +--------+--------+--------+--------+--------+--------+
//! |           data[8..N] (CAN FD only) ...              |  (variable)
//! +--------+--------+--------+--------+--------+--------+
//! ```

pub mod codec;
pub mod command;
pub mod communication;
pub mod config;
pub mod device;
pub mod disk;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod message;
pub mod network;
pub mod packet;
pub mod transport;

// Re-export commonly used types at the crate root
pub use codec::{decode_frame, encode, Encoder, EncoderSettings};
pub use communication::Communication;
pub use config::CommunicationConfig;
pub use device::{DeviceCapabilities, RAD_JUPITER};
pub use disk::{BlockSizeBounds, RegionReader};
#[cfg(feature = "tokio")]
pub use disk::AsyncRegionReader;
pub use dispatch::{MessageDispatcher, Registration};
pub use error::{NeoError, Result};
pub use filter::MessageFilter;
pub use message::{CanMessage, Message, MessageKind, RawMessage, ReadMemorySdMessage};
pub use network::{NetId, NetworkType};
pub use packet::HardwareCanPacket;
pub use transport::{Transport, WriteTransport};
