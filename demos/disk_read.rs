//! Storage read example.
//!
//! This example reads from the onboard storage of a simulated adapter. The
//! simulated adapter answers each read command on its own thread, the way
//! a transport read loop would deliver replies from real hardware.
//!
//! Run with: cargo run --example disk_read

use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use icsneo_rs::{Communication, CommunicationConfig, NetId, Result, Transport, RAD_JUPITER};

/// Answers storage reads from a fixed byte pattern in 512-byte chunks.
struct SimulatedAdapter {
    com: OnceLock<Communication>,
}

impl Transport for SimulatedAdapter {
    fn write(&self, frame: &[u8]) -> Result<()> {
        let sector = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]) as u64;
        let amount = u16::from_le_bytes([frame[5], frame[6]]) as u64;
        println!("  -> read command: sector {sector}, {amount} bytes");

        let Some(com) = self.com.get().cloned() else {
            return Ok(());
        };
        thread::spawn(move || {
            let start = sector * 512;
            let data: Vec<u8> = (start..start + amount).map(|i| (i % 256) as u8).collect();
            for chunk in data.chunks(512) {
                let _ = com.handle_frame(NetId::NeoMemorySdRead, chunk);
            }
        });
        Ok(())
    }
}

fn main() -> Result<()> {
    println!("=== Storage Read ===\n");

    let adapter = Arc::new(SimulatedAdapter {
        com: OnceLock::new(),
    });
    let config = CommunicationConfig::from_capabilities(&RAD_JUPITER)?
        .with_read_timeout(Duration::from_secs(1));
    let com = Communication::new(adapter.clone(), config)?;
    let _ = adapter.com.set(com.clone());

    // Example 1: An aligned block read
    println!("--- Example 1: Aligned Read ---");
    let reader = com.region_reader();
    let mut block = vec![0u8; 2048];
    let n = reader.read_aligned(4096, &mut block, Duration::from_secs(1))?;
    println!("Read {n} bytes, first bytes {:02x?}", &block[..8]);

    // Example 2: An unaligned read split into aligned blocks
    println!("\n--- Example 2: Unaligned Read ---");
    let mut window = vec![0u8; 100];
    com.read_storage(1000, &mut window)?;
    println!("Read 100 bytes at 1000, first bytes {:02x?}", &window[..8]);

    // Example 3: A misaligned aligned read is refused before any I/O
    println!("\n--- Example 3: Alignment Check ---");
    let mut odd = vec![0u8; 700];
    match reader.read_aligned(0, &mut odd, Duration::from_secs(1)) {
        Ok(_) => println!("unexpectedly succeeded"),
        Err(e) => println!("Refused: {e}"),
    }

    println!("\nLive registrations after reads: {}", com.dispatcher().len());
    Ok(())
}
