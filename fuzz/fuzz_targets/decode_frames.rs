#![no_main]
use libfuzzer_sys::fuzz_target;
use pretty_assertions::assert_eq;
use sensorboard::board::frame::{Frame, FrameDecoder};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    // Split the stream at an arbitrary point: chunking must not matter.
    let split = data.first().map_or(0, |first| usize::from(*first) % (data.len() + 1));
    let (head, tail) = data.split_at(split);
    decoder.push(head);
    let mut frames = Vec::new();
    while let Some(decoded) = decoder.next_frame() {
        frames.extend(decoded.ok());
    }
    decoder.push(tail);
    while let Some(decoded) = decoder.next_frame() {
        frames.extend(decoded.ok());
    }

    let mut whole = FrameDecoder::new();
    whole.push(data);
    let mut expected = Vec::new();
    while let Some(decoded) = whole.next_frame() {
        expected.extend(decoded.ok());
    }
    assert_eq!(frames, expected);
    for frame in frames {
        assert_eq!(Frame::decode(&frame.encode()), Ok(frame));
    }
});
