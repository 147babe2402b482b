//! Storage read protocol against a scripted adapter.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use icsneo_rs::command::CommandType;
use icsneo_rs::{
    BlockSizeBounds, Communication, CommunicationConfig, MessageDispatcher, NeoError, NetId,
    RegionReader, Result, Transport,
};

/// Fake adapter backed by an in-memory disk.
///
/// Every storage read command is answered from `disk` in chunks of
/// `chunk_len` bytes, delivered through `handle_frame` on a separate thread
/// after `delay`.
struct FakeAdapter {
    com: Mutex<Option<Communication>>,
    disk: Vec<u8>,
    chunk_len: usize,
    delay: Duration,
    extra: Vec<u8>,
    commands: Mutex<Vec<Vec<u8>>>,
    replies: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl FakeAdapter {
    fn new(disk: Vec<u8>, chunk_len: usize) -> Arc<Self> {
        Arc::new(Self {
            com: Mutex::new(None),
            disk,
            chunk_len,
            delay: Duration::ZERO,
            extra: Vec::new(),
            commands: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
        })
    }

    fn attach(self: &Arc<Self>, config: CommunicationConfig) -> Communication {
        let com = Communication::new(self.clone(), config).unwrap();
        *self.com.lock() = Some(com.clone());
        com
    }

    fn join_replies(&self) {
        for handle in self.replies.lock().drain(..) {
            handle.join().unwrap();
        }
    }
}

impl Transport for FakeAdapter {
    fn write(&self, frame: &[u8]) -> Result<()> {
        self.commands.lock().push(frame.to_vec());
        assert_eq!(frame.len(), 7);
        assert_eq!(CommandType::from_u8(frame[0]), Some(CommandType::HostPcFromSdcc1));

        let sector = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
        let amount = u16::from_le_bytes([frame[5], frame[6]]) as usize;
        let start = sector * 512;
        let mut data = self.disk[start..start + amount].to_vec();
        data.extend_from_slice(&self.extra);

        let Some(com) = self.com.lock().clone() else {
            return Ok(());
        };
        let chunk_len = self.chunk_len;
        let delay = self.delay;
        let handle = thread::spawn(move || {
            thread::sleep(delay);
            for chunk in data.chunks(chunk_len) {
                com.handle_frame(NetId::NeoMemorySdRead, chunk).unwrap();
            }
        });
        self.replies.lock().push(handle);
        Ok(())
    }
}

fn disk() -> Vec<u8> {
    (0..16 * 1024u32).map(|i| (i * 7 % 256) as u8).collect()
}

fn config(min: u64, max: u64) -> CommunicationConfig {
    CommunicationConfig::default()
        .with_block_size_bounds(BlockSizeBounds::new(min, max).unwrap())
        .with_read_timeout(Duration::from_secs(2))
}

#[test]
fn aligned_read_in_two_chunks() {
    let disk = disk();
    let adapter = FakeAdapter::new(disk.clone(), 512);
    let com = adapter.attach(config(512, 65536));
    let reader = com.region_reader();

    let mut buf = vec![0u8; 1024];
    let n = reader.read_aligned(1024, &mut buf, Duration::from_secs(2)).unwrap();
    adapter.join_replies();

    assert_eq!(n, 1024);
    assert_eq!(buf.as_slice(), &disk[1024..2048]);
    assert_eq!(
        adapter.commands.lock().as_slice(),
        &[vec![0x51, 0x02, 0x00, 0x00, 0x00, 0x00, 0x04]]
    );
    assert!(com.dispatcher().is_empty());
}

#[test]
fn odd_chunking_is_reassembled_in_order() {
    let disk = disk();
    let adapter = FakeAdapter::new(disk.clone(), 100);
    let com = adapter.attach(config(512, 4096));

    let mut buf = vec![0u8; 4096];
    com.region_reader()
        .read_aligned(8192, &mut buf, Duration::from_secs(2))
        .unwrap();
    adapter.join_replies();

    assert_eq!(buf.as_slice(), &disk[8192..12288]);
}

#[test]
fn length_beyond_wire_field_is_rejected_without_io() {
    let adapter = FakeAdapter::new(disk(), 512);
    let com = adapter.attach(config(512, 65536));

    let mut buf = vec![0u8; 65536];
    let result = com.region_reader().read_aligned(0, &mut buf, Duration::from_secs(1));

    assert!(matches!(result, Err(NeoError::Overflow { .. })));
    assert!(adapter.commands.lock().is_empty());
    assert!(com.dispatcher().is_empty());
}

#[test]
fn misaligned_requests_do_no_io() {
    let adapter = FakeAdapter::new(disk(), 512);
    let com = adapter.attach(config(512, 2048));
    let reader = com.region_reader();
    let timeout = Duration::from_secs(1);

    for (pos, len) in [(0, 4096), (0, 700), (256, 512)] {
        let mut buf = vec![0u8; len];
        let result = reader.read_aligned(pos, &mut buf, timeout);
        assert!(
            matches!(result, Err(NeoError::InvalidAlignment { .. })),
            "pos {pos} len {len}: {result:?}"
        );
    }
    assert!(adapter.commands.lock().is_empty());
    assert!(com.dispatcher().is_empty());
}

#[test]
fn reply_after_completion_is_ignored() {
    let disk = disk();
    let mut adapter = FakeAdapter::new(disk.clone(), 512);
    Arc::get_mut(&mut adapter).unwrap().extra = vec![0xFF; 512];
    let com = adapter.attach(config(512, 4096));

    let mut buf = vec![0u8; 512];
    let result = com.region_reader().read_aligned(0, &mut buf, Duration::from_secs(2));
    adapter.join_replies();

    assert_eq!(result.unwrap(), 512);
    assert_eq!(buf.as_slice(), &disk[..512]);
    assert!(com.dispatcher().is_empty());
}

#[test]
fn oversized_reply_is_a_protocol_error() {
    let mut adapter = FakeAdapter::new(disk(), 1024);
    Arc::get_mut(&mut adapter).unwrap().extra = vec![0xFF; 16];
    let com = adapter.attach(config(512, 4096));

    let mut buf = vec![0x33u8; 512];
    let result = com.region_reader().read_aligned(0, &mut buf, Duration::from_secs(2));
    adapter.join_replies();

    assert!(matches!(result, Err(NeoError::ProtocolError(_))));
    assert!(buf.iter().all(|&b| b == 0x33));
    assert!(com.dispatcher().is_empty());
}

#[test]
fn timeout_leaves_buffer_untouched_and_ignores_late_reply() {
    let mut adapter = FakeAdapter::new(disk(), 512);
    Arc::get_mut(&mut adapter).unwrap().delay = Duration::from_millis(300);
    let com = adapter.attach(config(512, 4096));

    let mut buf = vec![0x44u8; 1024];
    let result = com.region_reader().read_aligned(0, &mut buf, Duration::from_millis(50));
    assert!(matches!(result, Err(NeoError::Timeout)));
    assert!(result.unwrap_err().is_recoverable());
    assert!(com.dispatcher().is_empty());

    // The late reply finds nobody listening.
    adapter.join_replies();
    assert!(buf.iter().all(|&b| b == 0x44));
    assert!(com.dispatcher().is_empty());
}

#[test]
fn unaligned_read_through_session() {
    let disk = disk();
    let adapter = FakeAdapter::new(disk.clone(), 512);
    let com = adapter.attach(config(512, 1024));

    let mut buf = vec![0u8; 3000];
    let n = com.read_storage(1234, &mut buf).unwrap();
    adapter.join_replies();

    assert_eq!(n, 3000);
    assert_eq!(buf.as_slice(), &disk[1234..4234]);
    for command in adapter.commands.lock().iter() {
        let amount = u16::from_le_bytes([command[5], command[6]]);
        assert!(amount <= 1024 && amount % 512 == 0);
    }
    assert!(com.dispatcher().is_empty());
}

#[test]
fn sequential_reads_clean_up_each_time() {
    let disk = disk();
    let adapter = FakeAdapter::new(disk.clone(), 512);
    let com = adapter.attach(config(512, 4096));

    // Replies carry no request tag, so reads on one session never overlap.
    for block in 0..8u64 {
        let mut buf = vec![0u8; 1024];
        com.region_reader()
            .read_aligned(block * 1024, &mut buf, Duration::from_secs(2))
            .unwrap();
        adapter.join_replies();
        let start = block as usize * 1024;
        assert_eq!(buf.as_slice(), &disk[start..start + 1024]);
        assert!(com.dispatcher().is_empty());
    }
}

#[test]
fn reader_on_bare_dispatcher() {
    let disk = disk();
    let adapter = FakeAdapter::new(disk.clone(), 256);
    let com = adapter.attach(config(512, 4096));

    // A reader built by hand over the session's dispatcher.
    let dispatcher: MessageDispatcher = com.dispatcher().clone();
    let reader = RegionReader::new(dispatcher.clone(), adapter.clone(), com.config().block_size_bounds);

    let mut buf = vec![0u8; 512];
    reader.read_aligned(512, &mut buf, Duration::from_secs(2)).unwrap();
    adapter.join_replies();
    assert_eq!(buf.as_slice(), &disk[512..1024]);
    assert!(dispatcher.is_empty());
}
