//! Reassembly behaviour: framing round-trips, chunking invariance,
//! partial input, malformed headers, and the decode-failure policy.

use std::sync::Arc;

use bytes::Bytes;
use diawire::MessageAssembler;
use proptest::prelude::*;
use rstest::rstest;

mod common;
use common::{RecordingListener, frame};

fn assembler_with_capacity(
    capacity: usize,
) -> (Arc<RecordingListener>, MessageAssembler<RecordingListener>) {
    let listener = Arc::new(RecordingListener::default());
    let assembler = MessageAssembler::new(Arc::clone(&listener), capacity);
    (listener, assembler)
}

fn assembler() -> (Arc<RecordingListener>, MessageAssembler<RecordingListener>) {
    assembler_with_capacity(2048)
}

#[test]
fn single_append_yields_one_frame() {
    let (listener, mut assembler) = assembler();
    let encoded = frame(b"hello diameter");

    assembler.append(&encoded);

    assert_eq!(listener.frames(), vec![Bytes::from(encoded)]);
    assert_eq!(assembler.buffered(), 0);
}

#[test]
fn minimal_header_only_frame_is_delivered() {
    // A message of total length 4 is nothing but its own header.
    let (listener, mut assembler) = assembler();
    let encoded = frame(b"");

    assembler.append(&encoded);

    assert_eq!(listener.frames(), vec![Bytes::from(encoded)]);
}

#[test]
fn two_frames_in_one_chunk_are_both_delivered() {
    let (listener, mut assembler) = assembler();
    let first = frame(b"first message");
    let second = frame(b"second");
    let mut chunk = first.clone();
    chunk.extend_from_slice(&second);

    assembler.append(&chunk);

    assert_eq!(
        listener.frames(),
        vec![Bytes::from(first), Bytes::from(second)]
    );
}

#[rstest]
#[case::one_byte(1)]
#[case::two_bytes(2)]
#[case::three_bytes(3)]
fn short_header_prefix_stalls_without_delivery(#[case] len: usize) {
    let (listener, mut assembler) = assembler();
    let encoded = frame(b"payload");

    assembler.append(&encoded[..len]);

    assert!(listener.frames().is_empty());
    assert_eq!(assembler.buffered(), len);
}

#[test]
fn split_frame_completes_on_the_final_chunk() {
    let (listener, mut assembler) = assembler();
    let encoded = frame(b"split across reads");

    assembler.append(&encoded[..6]);
    assert!(listener.frames().is_empty());

    assembler.append(&encoded[6..]);
    assert_eq!(listener.frames(), vec![Bytes::from(encoded)]);
}

#[test]
fn growth_mid_message_loses_no_bytes() {
    // Storage starts far smaller than the message, forcing growth while
    // the frame is still incomplete.
    let (listener, mut assembler) = assembler_with_capacity(16);
    let body = vec![0x5a_u8; 300];
    let encoded = frame(&body);

    for chunk in encoded.chunks(7) {
        assembler.append(chunk);
    }

    assert_eq!(listener.frames(), vec![Bytes::from(encoded)]);
    assert_eq!(assembler.buffered(), 0);
}

#[test]
fn version_mismatch_stalls_silently() {
    let (listener, mut assembler) = assembler();

    assembler.append(&[0x02, 0x00, 0x00, 0x08, 0xde, 0xad, 0xbe, 0xef]);

    assert!(listener.frames().is_empty());
    assert!(listener.decode_errors().is_empty());
    // The unrecognisable prefix is never consumed; later traffic stays
    // queued behind it.
    assembler.append(&frame(b"after garbage"));
    assert!(listener.frames().is_empty());
}

#[test]
fn sub_header_length_field_stalls_silently() {
    let (listener, mut assembler) = assembler();

    assembler.append(&[0x01, 0x00, 0x00, 0x00]);

    assert!(listener.frames().is_empty());
    assert_eq!(assembler.buffered(), 4);
}

#[test]
fn decode_failure_discards_all_buffered_bytes() {
    let (listener, mut assembler) = assembler();
    let bad = frame(b"won't parse");
    let next = frame(&[0x99, 0x98, 0x97, 0x96, 0x95, 0x94]);

    // The rejected frame arrives together with the first half of the
    // following message.
    listener.reject_next_frame();
    let mut chunk = bad;
    chunk.extend_from_slice(&next[..5]);
    assembler.append(&chunk);

    assert!(listener.frames().is_empty());
    assert_eq!(listener.decode_errors().len(), 1);
    assert_eq!(assembler.buffered(), 0);

    // The rest of the following message cannot complete it: its prefix
    // died with the buffer.
    assembler.append(&next[5..]);
    assert!(listener.frames().is_empty());
}

#[test]
fn frames_after_an_accepted_frame_keep_flowing() {
    let (listener, mut assembler) = assembler();
    let first = frame(b"one");
    let second = frame(b"two");

    assembler.append(&first);
    assembler.append(&second);

    assert_eq!(
        listener.frames(),
        vec![Bytes::from(first), Bytes::from(second)]
    );
}

proptest! {
    /// Feeding a frame sequence whole or split at arbitrary points
    /// yields the identical sequence of delivered frames.
    #[test]
    fn chunking_is_invariant(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..40), 1..5),
        cuts in prop::collection::vec(1_usize..64, 0..12),
    ) {
        let stream: Vec<u8> = bodies.iter().flat_map(|body| frame(body)).collect();

        let (whole_listener, mut whole) = assembler();
        whole.append(&stream);

        let (chunked_listener, mut chunked) = assembler();
        let mut pos = 0;
        let mut cut = 0;
        while pos < stream.len() {
            let step = if cuts.is_empty() {
                stream.len()
            } else {
                cuts[cut % cuts.len()]
            }
            .min(stream.len() - pos);
            chunked.append(&stream[pos..pos + step]);
            pos += step;
            cut += 1;
        }

        prop_assert_eq!(whole_listener.frames(), chunked_listener.frames());
        prop_assert_eq!(whole.buffered(), chunked.buffered());
    }
}
