//! Fuzz target for `Packetizer::feed`.
//!
//! Feeds arbitrary byte chunks (split at arbitrary points, like a real
//! byte-stream transport would deliver them across several reads) into the
//! packetizer and checks that it never panics on malformed input — recovery
//! from a bad checksum/terminator is a reading-frame error, not a crash.

#![no_main]

use hdc_proto::packetizer::Packetizer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|chunks: Vec<Vec<u8>>| {
    let mut packetizer = Packetizer::new();
    for chunk in &chunks {
        packetizer.feed(chunk);
    }
    packetizer.feed(&[]);
    let _ = packetizer.drain_messages();
    let _ = packetizer.reading_frame_error_count();
});
