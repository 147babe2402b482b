//! Network identifiers and their classification.

/// Broad family a network belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkType {
    /// Classic CAN or CAN FD bus.
    Can,
    /// LIN bus.
    Lin,
    /// Automotive Ethernet.
    Ethernet,
    /// Device-internal traffic (commands, storage, status).
    Internal,
}

/// Network identifiers as used on the wire between host and adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u16)]
pub enum NetId {
    /// Traffic addressed to the device itself.
    Device = 0,
    /// High-speed CAN 1.
    #[default]
    HsCan = 1,
    /// Medium-speed CAN.
    MsCan = 2,
    /// LIN 1.
    Lin = 16,
    /// High-speed CAN 2.
    HsCan2 = 42,
    /// High-speed CAN 3.
    HsCan3 = 44,
    /// Ethernet.
    Ethernet = 93,
    /// Replies to storage (SD card) read requests.
    NeoMemorySdRead = 0x200,
}

impl NetId {
    /// Create a NetId from a raw wire value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Device),
            1 => Some(Self::HsCan),
            2 => Some(Self::MsCan),
            16 => Some(Self::Lin),
            42 => Some(Self::HsCan2),
            44 => Some(Self::HsCan3),
            93 => Some(Self::Ethernet),
            0x200 => Some(Self::NeoMemorySdRead),
            _ => None,
        }
    }

    /// Raw wire value.
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Classify this network.
    pub fn network_type(&self) -> NetworkType {
        match self {
            Self::HsCan | Self::MsCan | Self::HsCan2 | Self::HsCan3 => NetworkType::Can,
            Self::Lin => NetworkType::Lin,
            Self::Ethernet => NetworkType::Ethernet,
            Self::Device | Self::NeoMemorySdRead => NetworkType::Internal,
        }
    }

    /// Check if frames on this network use the CAN record layout.
    pub fn is_can(&self) -> bool {
        self.network_type() == NetworkType::Can
    }
}

impl std::fmt::Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Device => "Device",
            Self::HsCan => "HSCAN",
            Self::MsCan => "MSCAN",
            Self::Lin => "LIN",
            Self::HsCan2 => "HSCAN2",
            Self::HsCan3 => "HSCAN3",
            Self::Ethernet => "Ethernet",
            Self::NeoMemorySdRead => "NeoMemorySDRead",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_id_from_u16() {
        assert_eq!(NetId::from_u16(1), Some(NetId::HsCan));
        assert_eq!(NetId::from_u16(42), Some(NetId::HsCan2));
        assert_eq!(NetId::from_u16(0x200), Some(NetId::NeoMemorySdRead));
        assert_eq!(NetId::from_u16(0xFFFF), None);
        assert_eq!(NetId::HsCan2.as_u16(), 42);
    }

    #[test]
    fn test_network_type() {
        assert!(NetId::HsCan.is_can());
        assert!(NetId::HsCan3.is_can());
        assert!(!NetId::Lin.is_can());
        assert_eq!(NetId::Ethernet.network_type(), NetworkType::Ethernet);
        assert_eq!(
            NetId::NeoMemorySdRead.network_type(),
            NetworkType::Internal
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(NetId::HsCan2.to_string(), "HSCAN2");
        assert_eq!(NetId::NeoMemorySdRead.to_string(), "NeoMemorySDRead");
    }
}
