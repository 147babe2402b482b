//! Hardware packet layouts.
//!
//! Each submodule owns one fixed record format and its conversion to and
//! from the logical message types in [`crate::message`].

mod can;

pub use can::{
    dlc_to_length, length_to_dlc, record_size, HardwareCanPacket, CAN_PACKET_SIZE,
    CLASSIC_DATA_LEN, MAX_FD_DATA_LEN,
};
