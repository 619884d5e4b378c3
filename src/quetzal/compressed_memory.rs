//! XOR-RLE compression for `CMem` chunks: XOR current dynamic memory
//! against the pristine story image, then run-length-encode the zero runs.

use crate::error::{ZMachineError, ZResult};
use log::debug;

pub fn compress_memory(current: &[u8], original: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    let mut i = 0;
    while i < current.len() {
        let xor_byte = current[i] ^ original[i];
        if xor_byte == 0 {
            let start = i;
            while i < current.len() && (current[i] ^ original[i]) == 0 {
                i += 1;
            }
            let mut remaining = i - start;
            while remaining > 256 {
                compressed.push(0);
                compressed.push(255);
                remaining -= 256;
            }
            if remaining > 0 {
                compressed.push(0);
                compressed.push((remaining - 1) as u8);
            }
        } else {
            compressed.push(xor_byte);
            i += 1;
        }
    }
    debug!("compressed {} bytes to {} bytes", current.len(), compressed.len());
    compressed
}

pub fn decompress_memory(compressed: &[u8], original: &[u8]) -> ZResult<Vec<u8>> {
    let err = |detail: &str| ZMachineError::StreamError { detail: detail.into() };
    let mut decompressed = Vec::with_capacity(original.len());
    let mut c = 0usize;
    let mut o = 0usize;
    while c < compressed.len() && o < original.len() {
        let byte = compressed[c];
        c += 1;
        if byte == 0 {
            if c >= compressed.len() {
                return Err(err("incomplete RLE sequence"));
            }
            let run_length = compressed[c] as usize + 1;
            c += 1;
            for _ in 0..run_length {
                if o >= original.len() {
                    return Err(err("RLE run extends beyond memory"));
                }
                decompressed.push(original[o]);
                o += 1;
            }
        } else {
            if o >= original.len() {
                return Err(err("compressed data extends beyond memory"));
            }
            decompressed.push(original[o] ^ byte);
            o += 1;
        }
    }
    while o < original.len() {
        decompressed.push(original[o]);
        o += 1;
    }
    Ok(decompressed)
}
