//! Static capability descriptors for adapter models.
//!
//! A descriptor is plain data. Behavior that differs between models is
//! expressed by free functions reading the descriptor, not by overriding
//! methods.

use crate::codec::EncoderSettings;
use crate::disk::SECTOR_SIZE;
use crate::network::NetId;

/// What one adapter model can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Human-readable model name.
    pub name: &'static str,
    /// Prefix every serial number of this model starts with.
    pub serial_prefix: &'static str,
    /// USB product id.
    pub product_id: u16,
    /// Networks the adapter can receive on.
    pub rx_networks: &'static [NetId],
    /// Networks the adapter can transmit on.
    pub tx_networks: &'static [NetId],
    /// Whether the CAN controllers accept FD frames.
    pub supports_can_fd: bool,
    /// Whether Ethernet PHY registers can be accessed.
    pub supports_eth_phy: bool,
    /// Whether the adapter needs vehicle power to operate.
    pub requires_vehicle_power: bool,
    /// Script start address in flash, if scripts can live there.
    pub coremini_start_flash: Option<u64>,
    /// Script start address on the SD card, if scripts can live there.
    pub coremini_start_sd: Option<u64>,
    /// Smallest storage transfer.
    pub block_size_min: u64,
    /// Largest storage transfer.
    pub block_size_max: u64,
    /// Storage sector size.
    pub sector_size: u64,
}

const RAD_JUPITER_NETWORKS: &[NetId] = &[NetId::HsCan, NetId::HsCan2, NetId::Lin, NetId::Ethernet];

/// RAD-Jupiter: two CAN FD channels, LIN and a switched Ethernet port.
pub const RAD_JUPITER: DeviceCapabilities = DeviceCapabilities {
    name: "RAD-Jupiter",
    serial_prefix: "RJ",
    product_id: 0x1105,
    rx_networks: RAD_JUPITER_NETWORKS,
    tx_networks: RAD_JUPITER_NETWORKS,
    supports_can_fd: true,
    supports_eth_phy: true,
    requires_vehicle_power: false,
    coremini_start_flash: Some(512 * 2048),
    coremini_start_sd: Some(0),
    block_size_min: SECTOR_SIZE,
    block_size_max: 32 * 1024,
    sector_size: SECTOR_SIZE,
};

impl DeviceCapabilities {
    /// Check whether a serial number belongs to this model.
    pub fn matches_serial(&self, serial: &str) -> bool {
        serial.starts_with(self.serial_prefix)
    }
}

/// Check whether a device can receive on `network`.
pub fn supports_network(caps: &DeviceCapabilities, network: NetId) -> bool {
    caps.rx_networks.contains(&network)
}

/// Check whether a device can transmit on `network`.
pub fn can_transmit_on(caps: &DeviceCapabilities, network: NetId) -> bool {
    caps.tx_networks.contains(&network)
}

/// Encoder settings matching a device.
pub fn encoder_settings(caps: &DeviceCapabilities) -> EncoderSettings {
    EncoderSettings {
        supports_can_fd: caps.supports_can_fd,
    }
}
