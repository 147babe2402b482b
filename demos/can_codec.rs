//! CAN codec example.
//!
//! This example builds classic and FD CAN frames, encodes them to the
//! hardware record format and decodes them back, without any hardware.
//!
//! Run with: cargo run --example can_codec

use icsneo_rs::packet::{dlc_to_length, length_to_dlc, HardwareCanPacket, CAN_PACKET_SIZE};
use icsneo_rs::{decode_frame, CanMessage, EncoderSettings, Message, NetId, RAD_JUPITER};

fn main() {
    println!("=== CAN Record Codec ===\n");

    // Example 1: Classic frame with a standard id
    println!("--- Example 1: Classic CAN ---");
    let classic = CanMessage::builder(NetId::HsCan, 0x7DF)
        .data(vec![0x02, 0x01, 0x0C])
        .build();
    let bytes = HardwareCanPacket::encode(&classic, &EncoderSettings::classic()).unwrap();
    print_record(&bytes);

    // Example 2: FD frame on a device that supports it
    println!("\n--- Example 2: CAN FD ---");
    let settings = icsneo_rs::device::encoder_settings(&RAD_JUPITER);
    let fd = CanMessage::builder(NetId::HsCan2, 0x18DA_F110)
        .extended(true)
        .can_fd(true)
        .baudrate_switch(true)
        .data((0..20u8).collect::<Vec<_>>())
        .build();
    let bytes = HardwareCanPacket::encode(&fd, &settings).unwrap();
    print_record(&bytes);

    let decoded = decode_frame(NetId::HsCan2, &bytes).unwrap();
    println!("Round trip equal: {}", decoded == Message::Can(fd.clone()));

    // Example 3: The same frame rejected by a classic-only encoder
    println!("\n--- Example 3: Rejection ---");
    match HardwareCanPacket::encode(&fd, &EncoderSettings::classic()) {
        Ok(_) => println!("unexpectedly encoded"),
        Err(e) => println!("Rejected: {e}"),
    }

    // Example 4: DLC table
    println!("\n--- Example 4: DLC Table ---");
    for len in [0usize, 8, 12, 20, 33, 64] {
        match length_to_dlc(len) {
            Some(dlc) => println!(
                "  {len:2} bytes -> DLC {dlc:2} -> {:?} bytes",
                dlc_to_length(dlc, true)
            ),
            None => println!("  {len:2} bytes -> no DLC"),
        }
    }
}

fn print_record(bytes: &[u8]) {
    let packet = HardwareCanPacket::from_bytes(bytes).unwrap();
    println!(
        "  {} bytes ({} fixed), header {:#06x}, eid {:#06x}, dlc {:#06x}",
        bytes.len(),
        CAN_PACKET_SIZE,
        packet.header,
        packet.eid,
        packet.dlc
    );
    println!("  data: {:02x?}", &packet.data[..]);
}
