//! Hardware CAN / CAN FD record.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::warn;

use crate::codec::EncoderSettings;
use crate::error::{NeoError, Result};
use crate::message::{CanMessage, MAX_EXTENDED_ID, MAX_STANDARD_ID};
use crate::network::NetId;

/// Size of the fixed part of the CAN record in bytes.
pub const CAN_PACKET_SIZE: usize = 24;

/// Data bytes carried inside the fixed part of the record.
pub const CLASSIC_DATA_LEN: usize = 8;

/// Largest CAN FD payload.
pub const MAX_FD_DATA_LEN: usize = 64;

const DATA_OFFSET: usize = 6;
const STATS_OFFSET: usize = 14;
const TIMESTAMP_OFFSET: usize = 16;

// header word
const HEADER_IDE: u16 = 1 << 0;
const HEADER_SRR: u16 = 1 << 1;
const HEADER_SID_SHIFT: u16 = 2;
const SID_MASK: u16 = 0x07FF;
const HEADER_EDL: u16 = 1 << 13;
const HEADER_BRS: u16 = 1 << 14;
const HEADER_ESI: u16 = 1 << 15;

// eid word
const EID_MASK: u16 = 0x0FFF;
const EID_TXMSG: u16 = 1 << 12;
const EID_TX_ABORTED: u16 = 1 << 13;
const EID_TX_LOST_ARB: u16 = 1 << 14;
const EID_TX_ERROR: u16 = 1 << 15;

// dlc word
const DLC_MASK: u16 = 0x000F;
const DLC_RB0: u16 = 1 << 4;
const DLC_IVRIF: u16 = 1 << 5;
const DLC_HV_ENABLE: u16 = 1 << 6;
const DLC_EXTENDED_NETWORK_INDEX: u16 = 1 << 7;
const DLC_RB1: u16 = 1 << 8;
const DLC_RTR: u16 = 1 << 9;
const DLC_EID2_SHIFT: u16 = 10;
const EID2_MASK: u16 = 0x003F;

// timestamp word
const TIMESTAMP_TICKS_MASK: u64 = (1 << 60) - 1;
const TIMESTAMP_IS_EXTENDED: u64 = 1 << 63;

/// Payload lengths for DLC 9..=15 on CAN FD.
const FD_LENGTHS: [usize; 7] = [12, 16, 20, 24, 32, 48, 64];

/// Map a DLC to a payload length.
///
/// DLC values above 8 are only valid for CAN FD frames.
pub fn dlc_to_length(dlc: u8, fd: bool) -> Option<usize> {
    match dlc {
        0..=8 => Some(dlc as usize),
        9..=15 if fd => Some(FD_LENGTHS[(dlc - 9) as usize]),
        _ => None,
    }
}

/// Map a payload length to its DLC, if the length is representable.
pub fn length_to_dlc(len: usize) -> Option<u8> {
    match len {
        0..=8 => Some(len as u8),
        _ => FD_LENGTHS
            .iter()
            .position(|&l| l == len)
            .map(|i| i as u8 + 9),
    }
}

/// Total record size for a frame carrying `len` data bytes.
pub fn record_size(len: usize) -> usize {
    CAN_PACKET_SIZE + len.saturating_sub(CLASSIC_DATA_LEN)
}

/// CAN record as exchanged with the adapter.
///
/// All words are little-endian. Bits are numbered from the LSB.
///
/// ```text
/// offset  field      bits
///  0..2   header     IDE:1 SRR:1 SID:11 EDL:1 BRS:1 ESI:1
///  2..4   eid        EID:12 TXMSG:1 TXAborted:1 TXLostArb:1 TXError:1
///  4..6   dlc        DLC:4 RB0:1 IVRIF:1 HVEnable:1 ExtNetIdx:1 RB1:1 RTR:1 EID2:6
///  6..14  data       first 8 data bytes
/// 14..16  stats      status word
/// 16..24  timestamp  TS:60 reserved:3 IsExtended:1
/// 24..    fd data    data bytes 9..N (CAN FD only)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareCanPacket {
    /// Identifier/flag header word.
    pub header: u16,
    /// Extended identifier and transmit status word.
    pub eid: u16,
    /// Control word.
    pub dlc: u16,
    /// Payload bytes (length given by the DLC).
    pub data: Bytes,
    /// Hardware status word.
    pub stats: u16,
    /// Packed timestamp word.
    pub timestamp: u64,
}

impl HardwareCanPacket {
    /// Identifier extension bit.
    pub fn ide(&self) -> bool {
        self.header & HEADER_IDE != 0
    }

    /// Standard identifier (11 bits).
    pub fn sid(&self) -> u16 {
        (self.header >> HEADER_SID_SHIFT) & SID_MASK
    }

    /// Extended data length (CAN FD) bit.
    pub fn edl(&self) -> bool {
        self.header & HEADER_EDL != 0
    }

    /// Extended identifier continuation (12 bits).
    pub fn eid_bits(&self) -> u16 {
        self.eid & EID_MASK
    }

    /// Second extended identifier continuation (6 bits).
    pub fn eid2(&self) -> u16 {
        (self.dlc >> DLC_EID2_SHIFT) & EID2_MASK
    }

    /// Data length code.
    pub fn dlc_code(&self) -> u8 {
        (self.dlc & DLC_MASK) as u8
    }

    /// Effective arbitration identifier.
    pub fn arb_id(&self) -> u32 {
        if self.ide() {
            ((self.sid() as u32) << 18) | ((self.eid_bits() as u32) << 6) | self.eid2() as u32
        } else {
            self.sid() as u32
        }
    }

    /// Timestamp tick count (60 bits).
    pub fn timestamp_ticks(&self) -> u64 {
        self.timestamp & TIMESTAMP_TICKS_MASK
    }

    /// Parse a record from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < CAN_PACKET_SIZE {
            return Err(NeoError::malformed(format!(
                "CAN record too short: expected at least {CAN_PACKET_SIZE} bytes, got {}",
                data.len()
            )));
        }

        let header = u16::from_le_bytes([data[0], data[1]]);
        let eid = u16::from_le_bytes([data[2], data[3]]);
        let dlc = u16::from_le_bytes([data[4], data[5]]);
        let stats = u16::from_le_bytes([data[STATS_OFFSET], data[STATS_OFFSET + 1]]);
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&data[TIMESTAMP_OFFSET..CAN_PACKET_SIZE]);
        let timestamp = u64::from_le_bytes(ts);

        let fd = header & HEADER_EDL != 0;
        let code = (dlc & DLC_MASK) as u8;
        let len = dlc_to_length(code, fd).ok_or_else(|| {
            NeoError::malformed(format!("DLC {code} is invalid for a classic CAN frame"))
        })?;

        let expected = record_size(len);
        if data.len() != expected {
            return Err(NeoError::malformed(format!(
                "CAN record length mismatch: DLC {code} needs {expected} bytes, got {}",
                data.len()
            )));
        }

        let mut payload = BytesMut::with_capacity(len);
        let inline = len.min(CLASSIC_DATA_LEN);
        payload.put_slice(&data[DATA_OFFSET..DATA_OFFSET + inline]);
        if len > CLASSIC_DATA_LEN {
            payload.put_slice(&data[CAN_PACKET_SIZE..]);
        }

        Ok(Self {
            header,
            eid,
            dlc,
            data: payload.freeze(),
            stats,
            timestamp,
        })
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = self.data.len();
        let mut buf = vec![0u8; record_size(len)];

        buf[0..2].copy_from_slice(&self.header.to_le_bytes());
        buf[2..4].copy_from_slice(&self.eid.to_le_bytes());
        buf[4..6].copy_from_slice(&self.dlc.to_le_bytes());
        let inline = len.min(CLASSIC_DATA_LEN);
        buf[DATA_OFFSET..DATA_OFFSET + inline].copy_from_slice(&self.data[..inline]);
        buf[STATS_OFFSET..STATS_OFFSET + 2].copy_from_slice(&self.stats.to_le_bytes());
        buf[TIMESTAMP_OFFSET..CAN_PACKET_SIZE].copy_from_slice(&self.timestamp.to_le_bytes());
        if len > CLASSIC_DATA_LEN {
            buf[CAN_PACKET_SIZE..].copy_from_slice(&self.data[CLASSIC_DATA_LEN..]);
        }

        buf
    }

    /// Decode a record into a CAN message on `network`.
    pub fn decode(network: NetId, data: &[u8]) -> Result<CanMessage> {
        Ok(Self::from_bytes(data)?.to_message(network))
    }

    /// Encode a CAN message into a record.
    ///
    /// Rejections are logged and returned as [`NeoError::UnsupportedFrame`].
    pub fn encode(message: &CanMessage, settings: &EncoderSettings) -> Result<Vec<u8>> {
        Self::from_message(message, settings)
            .map(|packet| packet.to_bytes())
            .inspect_err(|e| {
                warn!(
                    network = %message.network,
                    arb_id = message.arb_id,
                    error = %e,
                    "CAN frame rejected by encoder"
                )
            })
    }

    /// Convert the record into a logical message.
    pub fn to_message(&self, network: NetId) -> CanMessage {
        let extended = self.ide();
        let is_remote = if extended {
            self.dlc & DLC_RTR != 0
        } else {
            self.header & HEADER_SRR != 0
        };

        CanMessage {
            network,
            arb_id: self.arb_id(),
            is_extended: extended,
            is_remote,
            is_can_fd: self.edl(),
            baudrate_switch: self.header & HEADER_BRS != 0,
            error_state_indicator: self.header & HEADER_ESI != 0,
            transmitted: self.eid & EID_TXMSG != 0,
            tx_aborted: self.eid & EID_TX_ABORTED != 0,
            tx_lost_arbitration: self.eid & EID_TX_LOST_ARB != 0,
            tx_error: self.eid & EID_TX_ERROR != 0,
            extended_network_index: self.dlc & DLC_EXTENDED_NETWORK_INDEX != 0,
            status: self.stats,
            timestamp: self.timestamp_ticks(),
            data: self.data.clone(),
        }
    }

    /// Build a record from a logical message.
    ///
    /// HVEnable, the network index bit and the reserved bits are always
    /// cleared, whatever the message says.
    pub fn from_message(message: &CanMessage, settings: &EncoderSettings) -> Result<Self> {
        if message.arb_id > MAX_EXTENDED_ID {
            return Err(NeoError::unsupported(format!(
                "arbitration id 0x{:X} exceeds 29 bits",
                message.arb_id
            )));
        }
        if (message.is_can_fd || message.baudrate_switch) && !settings.supports_can_fd {
            return Err(NeoError::unsupported(
                "CAN FD requested but the device does not support it",
            ));
        }
        if message.baudrate_switch && !message.is_can_fd {
            return Err(NeoError::unsupported(
                "bit-rate switch requires a CAN FD frame",
            ));
        }
        if message.is_remote && message.is_can_fd {
            return Err(NeoError::unsupported("CAN FD has no remote frames"));
        }

        let len = message.data.len();
        let code = length_to_dlc(len).ok_or_else(|| {
            NeoError::unsupported(format!("no DLC encodes a {len} byte payload"))
        })?;
        if len > CLASSIC_DATA_LEN && !message.is_can_fd {
            return Err(NeoError::unsupported(format!(
                "{len} byte payload needs a CAN FD frame"
            )));
        }

        let extended = message.is_extended || message.arb_id > MAX_STANDARD_ID;
        let (sid, eid_bits, eid2) = if extended {
            (
                ((message.arb_id >> 18) as u16) & SID_MASK,
                ((message.arb_id >> 6) as u16) & EID_MASK,
                (message.arb_id as u16) & EID2_MASK,
            )
        } else {
            (message.arb_id as u16 & SID_MASK, 0, 0)
        };

        let mut header = sid << HEADER_SID_SHIFT;
        if extended {
            header |= HEADER_IDE;
        }
        if message.is_remote && !extended {
            header |= HEADER_SRR;
        }
        if message.is_can_fd {
            header |= HEADER_EDL;
        }
        if message.baudrate_switch {
            header |= HEADER_BRS;
        }
        if message.error_state_indicator {
            header |= HEADER_ESI;
        }

        let mut eid = eid_bits;
        if message.transmitted {
            eid |= EID_TXMSG;
        }
        if message.tx_aborted {
            eid |= EID_TX_ABORTED;
        }
        if message.tx_lost_arbitration {
            eid |= EID_TX_LOST_ARB;
        }
        if message.tx_error {
            eid |= EID_TX_ERROR;
        }

        let mut dlc = code as u16 | (eid2 << DLC_EID2_SHIFT);
        if message.is_remote && extended {
            dlc |= DLC_RTR;
        }
        debug_assert_eq!(
            dlc & (DLC_RB0 | DLC_IVRIF | DLC_HV_ENABLE | DLC_EXTENDED_NETWORK_INDEX | DLC_RB1),
            0
        );

        let mut timestamp = message.timestamp & TIMESTAMP_TICKS_MASK;
        if message.is_can_fd {
            timestamp |= TIMESTAMP_IS_EXTENDED;
        }

        Ok(Self {
            header,
            eid,
            dlc,
            data: message.data.clone(),
            stats: message.status,
            timestamp,
        })
    }
}
