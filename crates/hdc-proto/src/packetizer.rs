//! Byte-stream ⇄ message framing, with checksum/terminator validation,
//! reading-frame-error recovery, and multi-packet reassembly (§4.1).
//!
//! Packet layout: `len (u8) ‖ payload[len] ‖ checksum (u8) ‖ terminator (u8)`.

/// `"Record Separator"`, terminating every packet.
pub const TERMINATOR: u8 = 0x1E;

/// Maximum payload bytes carried by a single packet.
pub const MAX_PAYLOAD_SIZE: usize = 0xFF;

/// The packet `00 00 1E`, used to signal the end of a multi-packet message
/// whose length is an exact nonzero multiple of 255, or to encode an empty
/// message.
pub const EMPTY_PACKET: [u8; 3] = [0, 0, TERMINATOR];

/// Eight-bit two's-complement checksum: `(0x100 - sum(payload)) mod 0x100`.
///
/// Chosen so that `(sum(payload) + checksum(payload)) mod 256 == 0`.
#[must_use]
pub fn checksum(payload: &[u8]) -> u8 {
    let sum: u32 = payload.iter().map(|&b| u32::from(b)).sum();
    (0x100 - (sum & 0xFF)).to_le_bytes()[0] & 0xFF
}

/// Split `message` into on-wire packets.
///
/// Total, for any message (including the empty one): a message of `m`
/// bytes yields `⌈m/255⌉` packets, plus one trailing empty packet when `m`
/// is a nonzero multiple of 255 (and exactly one packet, the empty one,
/// when `m == 0`).
#[must_use]
pub fn packetize(message: &[u8]) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    let mut last_payload_size = MAX_PAYLOAD_SIZE; // forces an empty packet if the loop below never runs

    for chunk in message.chunks(MAX_PAYLOAD_SIZE).collect::<Vec<_>>().iter().copied() {
        last_payload_size = chunk.len();
        let mut packet = Vec::with_capacity(chunk.len() + 3);
        #[allow(clippy::cast_possible_truncation)] // chunk.len() <= MAX_PAYLOAD_SIZE == 0xFF
        packet.push(chunk.len() as u8);
        packet.extend_from_slice(chunk);
        packet.push(checksum(chunk));
        packet.push(TERMINATOR);
        packets.push(packet);
    }

    if last_payload_size == MAX_PAYLOAD_SIZE {
        packets.push(EMPTY_PACKET.to_vec());
    }

    packets
}

/// Reassembles whole messages from a (possibly chunked, possibly corrupt)
/// inbound byte stream.
///
/// Single-threaded by contract (§5): used only on the transport's receiver
/// thread. `feed` never panics on malformed input — corruption is recorded
/// via [`Self::reading_frame_error_count`] and recovered from by skipping a
/// byte at a time.
#[derive(Debug, Default)]
pub struct Packetizer {
    incoming: Vec<u8>,
    multi_message: Vec<u8>,
    rfe_counter: u64,
    received: Vec<Vec<u8>>,
}

impl Packetizer {
    /// Create an empty packetizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reading-frame errors observed since construction (never
    /// reset by [`Self::clear`] or [`Self::drain_messages`]).
    #[must_use]
    pub fn reading_frame_error_count(&self) -> u64 {
        self.rfe_counter
    }

    /// Discard any accumulated partial packet/message state. Does not reset
    /// the reading-frame-error counter.
    pub fn clear(&mut self) {
        self.incoming.clear();
        self.multi_message.clear();
    }

    /// Feed a chunk of inbound bytes.
    ///
    /// Pass an empty slice to signal that a read burst has ended (e.g. a
    /// transport read-timeout elapsed): this turns "not enough bytes yet"
    /// into a reading-frame error instead of waiting indefinitely for bytes
    /// that belonged to an already-finished, malformed burst.
    pub fn feed(&mut self, data: &[u8]) {
        self.incoming.extend_from_slice(data);
        let burst_over = data.is_empty();

        while !self.incoming.is_empty() {
            let payload_len = usize::from(self.incoming[0]);
            let terminator_index = payload_len + 2;

            if terminator_index >= self.incoming.len() && !burst_over {
                // Message may still be in flight; wait for more bytes.
                return;
            }

            let payload_end = payload_len + 1; // exclusive; incoming[1..payload_end] is the payload
            if terminator_index < self.incoming.len()
                && self.incoming[terminator_index] == TERMINATOR
                && checksum(&self.incoming[1..payload_end]) == self.incoming[payload_end]
            {
                let payload = self.incoming[1..payload_end].to_vec();
                self.incoming.drain(0..=terminator_index);

                if !self.multi_message.is_empty() || payload_len == MAX_PAYLOAD_SIZE {
                    self.multi_message.extend_from_slice(&payload);
                    if payload_len < MAX_PAYLOAD_SIZE {
                        self.received.push(std::mem::take(&mut self.multi_message));
                    }
                } else {
                    self.received.push(payload);
                }
                continue;
            }

            // Reading-frame error: checksum/terminator mismatch, or a
            // burst ended with an incomplete packet still in the buffer.
            tracing::warn!(rfe_counter = self.rfe_counter + 1, "packetizer reading-frame error");
            self.rfe_counter += 1;
            self.incoming.remove(0);
            if !self.multi_message.is_empty() {
                self.multi_message.clear();
            }
        }
    }

    /// Return and forget every message fully assembled since the last call.
    pub fn drain_messages(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.received)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn checksum_law_examples() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x01]), 0xFF);
        assert_eq!(checksum(&[0xFF, 0xFF, 0xFF]), 0x03);
    }

    #[test]
    fn fragmentation_exact_multiple_of_255_adds_empty_packet() {
        let message = vec![0xAB; 255];
        let packets = packetize(&message);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1], EMPTY_PACKET);
    }

    #[test]
    fn fragmentation_400_bytes_no_trailing_empty() {
        let message: Vec<u8> = (0..400u32).map(|b| b as u8).collect();
        let packets = packetize(&message);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0][0], 255);
        assert_eq!(packets[1][0], 145);
    }

    #[test]
    fn empty_message_is_one_empty_packet() {
        assert_eq!(packetize(&[]), vec![EMPTY_PACKET.to_vec()]);
    }

    #[test]
    fn round_trip_single_message() {
        let message = b"hello hdc".to_vec();
        let mut packetizer = Packetizer::new();
        for packet in packetize(&message) {
            packetizer.feed(&packet);
        }
        packetizer.feed(&[]);
        assert_eq!(packetizer.drain_messages(), vec![message]);
        assert_eq!(packetizer.reading_frame_error_count(), 0);
    }

    #[test]
    fn round_trip_multi_packet_message() {
        let message: Vec<u8> = (0..600u32).map(|b| b as u8).collect();
        let mut packetizer = Packetizer::new();
        let mut wire = Vec::new();
        for packet in packetize(&message) {
            wire.extend(packet);
        }
        packetizer.feed(&wire);
        packetizer.feed(&[]);
        assert_eq!(packetizer.drain_messages(), vec![message]);
    }

    #[test]
    fn reading_frame_recovery_counts_bogus_bytes() {
        let message: Vec<u8> = (0..32u32).map(|b| b as u8).collect();
        let mut wire = vec![0u8; 5];
        for packet in packetize(&message) {
            wire.extend(packet);
        }
        let mut packetizer = Packetizer::new();
        packetizer.feed(&wire);
        packetizer.feed(&[]);
        assert_eq!(packetizer.drain_messages(), vec![message]);
        assert_eq!(packetizer.reading_frame_error_count(), 5);
    }

    #[test]
    fn multi_packet_in_flight_is_aborted_on_rfe() {
        let message: Vec<u8> = vec![0xCD; 300];
        let mut packets = packetize(&message);
        // Corrupt the second (final) packet's checksum byte so reassembly fails partway through.
        let last = packets.last_mut().expect("two packets expected");
        let checksum_index = last.len() - 2;
        last[checksum_index] ^= 0xFF;

        let mut wire = Vec::new();
        for packet in &packets {
            wire.extend_from_slice(packet);
        }
        let mut packetizer = Packetizer::new();
        packetizer.feed(&wire);
        packetizer.feed(&[]);
        // The corrupted continuation never completes the message.
        assert!(packetizer.drain_messages().is_empty());
        assert!(packetizer.reading_frame_error_count() > 0);
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary_messages(messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..600), 1..8)) {
            let mut wire = Vec::new();
            for message in &messages {
                for packet in packetize(message) {
                    wire.extend(packet);
                }
            }
            let mut packetizer = Packetizer::new();
            packetizer.feed(&wire);
            packetizer.feed(&[]);
            prop_assert_eq!(packetizer.drain_messages(), messages);
            prop_assert_eq!(packetizer.reading_frame_error_count(), 0);
        }

        #[test]
        fn chunking_does_not_affect_result(message in prop::collection::vec(any::<u8>(), 0..600), split_at in 0usize..600) {
            let mut wire = Vec::new();
            for packet in packetize(&message) {
                wire.extend(packet);
            }
            let split = split_at.min(wire.len());
            let mut packetizer = Packetizer::new();
            packetizer.feed(&wire[..split]);
            packetizer.feed(&wire[split..]);
            packetizer.feed(&[]);
            prop_assert_eq!(packetizer.drain_messages(), vec![message]);
        }
    }
}
