// Copyright 2024 tison <wander4096@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Kafka wraps Snappy payloads in the `org.xerial.snappy` chunked frame,
//! regardless of magic version: an 8-byte magic header, a version pair, then
//! a stream of `[len:i32][compressed chunk]` entries over raw Snappy blocks.

use byteorder::BigEndian;
use byteorder::ByteOrder;

use crate::error::err_corrupt;
use crate::error::CodecResult;

const XERIAL_MAGIC: [u8; 8] = [0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0x00];
const XERIAL_VERSION: i32 = 1;
const XERIAL_COMPATIBLE_VERSION: i32 = 1;
const DEFAULT_BLOCK_SIZE: usize = 32 * 1024;

pub(crate) fn compress(data: &[u8]) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&XERIAL_MAGIC);
    let mut header = [0u8; 8];
    BigEndian::write_i32(&mut header[0..4], XERIAL_VERSION);
    BigEndian::write_i32(&mut header[4..8], XERIAL_COMPATIBLE_VERSION);
    out.extend_from_slice(&header);

    let mut encoder = snap::raw::Encoder::new();
    for chunk in data.chunks(DEFAULT_BLOCK_SIZE) {
        let compressed = encoder
            .compress_vec(chunk)
            .map_err(|e| err_corrupt(format!("snappy compress: {e}")))?;
        let mut len_buf = [0u8; 4];
        BigEndian::write_i32(&mut len_buf, compressed.len() as i32);
        out.extend_from_slice(&len_buf);
        out.extend_from_slice(&compressed);
    }
    Ok(out)
}

pub(crate) fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    if data.len() < 16 || data[0..8] != XERIAL_MAGIC {
        return decompress_unframed(data);
    }

    let mut decoder = snap::raw::Decoder::new();
    let mut out = Vec::new();
    let mut pos = 16;
    while pos < data.len() {
        if pos + 4 > data.len() {
            return Err(err_corrupt("truncated snappy chunk length"));
        }
        let chunk_len = BigEndian::read_i32(&data[pos..pos + 4]) as usize;
        pos += 4;
        if pos + chunk_len > data.len() {
            return Err(err_corrupt("truncated snappy chunk body"));
        }
        let chunk = decoder
            .decompress_vec(&data[pos..pos + chunk_len])
            .map_err(|e| err_corrupt(format!("snappy decompress: {e}")))?;
        out.extend_from_slice(&chunk);
        pos += chunk_len;
    }
    Ok(out)
}

/// Older producers may write a single unframed Snappy block; tolerate it.
fn decompress_unframed(data: &[u8]) -> CodecResult<Vec<u8>> {
    snap::raw::Decoder::new()
        .decompress_vec(data)
        .map_err(|e| err_corrupt(format!("snappy decompress: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snappy_round_trip() {
        let data = b"hello world hello world hello world";
        let compressed = compress(data).unwrap();
        assert_eq!(compressed[0..8], XERIAL_MAGIC);
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_snappy_multi_chunk() {
        let data = vec![7u8; DEFAULT_BLOCK_SIZE * 2 + 123];
        let compressed = compress(&data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_snappy_unframed_fallback() {
        let data = b"raw block, no xerial framing";
        let compressed = snap::raw::Encoder::new().compress_vec(data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }
}
