//! Fuzz target for the packetizer's reassembly invariant under arbitrary
//! chunking of an otherwise well-formed wire stream.
//!
//! Packetizes a batch of arbitrary messages, concatenates their packets into
//! one byte stream, then feeds that stream back in at arbitrary split
//! points (as a real serial/socket read loop would). The reassembled
//! messages must equal the originals exactly, with zero reading-frame
//! errors — chunking a valid stream must never itself look like corruption.

#![no_main]

use arbitrary::Arbitrary;
use hdc_proto::packetizer::{packetize, Packetizer};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    messages: Vec<Vec<u8>>,
    split_points: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let messages: Vec<Vec<u8>> = input.messages.into_iter().take(16).collect();

    let mut wire = Vec::new();
    for message in &messages {
        for packet in packetize(message) {
            wire.extend(packet);
        }
    }

    let mut packetizer = Packetizer::new();
    let mut offset = 0usize;
    for raw_split in &input.split_points {
        if offset >= wire.len() {
            break;
        }
        let remaining = wire.len() - offset;
        let chunk_len = (usize::from(*raw_split) % remaining.max(1)).max(1).min(remaining);
        packetizer.feed(&wire[offset..offset + chunk_len]);
        offset += chunk_len;
    }
    if offset < wire.len() {
        packetizer.feed(&wire[offset..]);
    }
    packetizer.feed(&[]);

    assert_eq!(packetizer.drain_messages(), messages);
    assert_eq!(packetizer.reading_frame_error_count(), 0);
});
