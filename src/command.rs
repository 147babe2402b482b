//! Host-to-device command frames.

/// Size of a storage read command frame in bytes.
pub const STORAGE_READ_COMMAND_SIZE: usize = 7;

/// Multi-channel command codes for the SD card controller.
///
/// The low nibble encodes direction: `0` host to device, `1` device to host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Write to SD card controller 1.
    HostPcToSdcc1 = 0x50,
    /// Read from SD card controller 1.
    HostPcFromSdcc1 = 0x51,
}

impl CommandType {
    /// Create a CommandType from a raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x50 => Some(Self::HostPcToSdcc1),
            0x51 => Some(Self::HostPcFromSdcc1),
            _ => None,
        }
    }
}

/// Request to read `amount` bytes starting at `sector` from onboard storage.
///
/// ```text
/// byte 0     opcode (HostPcFromSdcc1)
/// bytes 1-4  sector number, little-endian
/// bytes 5-6  byte count, little-endian
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageReadCommand {
    /// First sector to read.
    pub sector: u32,
    /// Number of bytes to read.
    pub amount: u16,
}

impl StorageReadCommand {
    /// Create a new storage read command.
    pub fn new(sector: u32, amount: u16) -> Self {
        Self { sector, amount }
    }

    /// Serialize the command frame.
    pub fn to_bytes(&self) -> [u8; STORAGE_READ_COMMAND_SIZE] {
        let mut buf = [0u8; STORAGE_READ_COMMAND_SIZE];
        buf[0] = CommandType::HostPcFromSdcc1 as u8;
        buf[1..5].copy_from_slice(&self.sector.to_le_bytes());
        buf[5..7].copy_from_slice(&self.amount.to_le_bytes());
        buf
    }
}
