#![no_main]

use dumpi_trace::{CallType, TraceReader, LEAD_IN_MAGIC, LEAD_IN_MAGIC_WORD};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

/// Cap the raw fuzz input size to keep allocations (both in the harness and the parser) bounded.
const MAX_INPUT_SIZE_BYTES: usize = 1024 * 1024; // 1 MiB

/// Limit how much of the input we embed as a call stream in the synthetic container.
const MAX_BODY_BYTES: usize = 64 * 1024; // 64 KiB

/// Bound the number of call records decoded per input.
const MAX_RECORDS: usize = 4096;

fn try_parse_trace(bytes: &[u8]) {
    let mut reader = match TraceReader::open(Cursor::new(bytes)) {
        Ok(r) => r,
        Err(_) => return,
    };

    let _ = reader.header();
    let _ = reader.footer();
    let _ = reader.keyvals();
    let _ = reader.perf_labels();
    let _ = reader.function_names();

    if let Ok(calls) = reader.calls() {
        for record in calls.take(MAX_RECORDS) {
            if record.is_err() {
                break;
            }
        }
    }
}

/// Wrap fuzzer bytes as the call stream of an otherwise valid five-word-trailer file so record
/// decoding is reached without having to discover the magic and offsets.
fn build_synthetic_container(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 128);
    out.extend_from_slice(&LEAD_IN_MAGIC);
    out.extend_from_slice(&0u32.to_be_bytes()); // cpu bias
    out.extend_from_slice(&0u32.to_be_bytes()); // wall bias

    let body_offset = out.len() as u64;
    out.extend_from_slice(body);
    out.extend_from_slice(&CallType::END_OF_STREAM.0.to_be_bytes());

    let header_offset = out.len() as u64;
    out.extend_from_slice(&[0, 8, 0]); // version
    out.extend_from_slice(&0u64.to_be_bytes()); // start time
    out.extend_from_slice(&0u32.to_be_bytes()); // hostname
    out.extend_from_slice(&0u32.to_be_bytes()); // username
    out.extend_from_slice(&0u32.to_be_bytes()); // mesh dimension

    let footer_offset = out.len() as u64;
    out.extend_from_slice(&dumpi_trace::FOOTER_MAGIC.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // call counts
    out.extend_from_slice(&0u32.to_be_bytes()); // skip counts

    let keyval_offset = out.len() as u64;
    out.extend_from_slice(&0u32.to_be_bytes());

    out.extend_from_slice(&LEAD_IN_MAGIC_WORD.to_be_bytes());
    for offset in [header_offset, body_offset, footer_offset, keyval_offset] {
        out.extend_from_slice(&offset.to_be_bytes());
    }
    out
}

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_SIZE_BYTES {
        return;
    }

    // 1) Treat the input as an on-disk trace file.
    try_parse_trace(data);

    // 2) Also embed the bytes as the call stream of a minimally valid file.
    let body_len = data.len().min(MAX_BODY_BYTES);
    let trace = build_synthetic_container(&data[..body_len]);
    try_parse_trace(&trace);
});
