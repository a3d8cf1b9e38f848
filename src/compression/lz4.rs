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

//! Minimal single-block LZ4 frame envelope.
//!
//! Real LZ4 frames support multiple blocks, block checksums and a content
//! checksum; this crate only ever wraps one record batch's records region
//! per frame, so a single block with no checksums is sufficient. The block
//! payload itself is produced by [`lz4_flex::compress_prepend_size`], which
//! stores the uncompressed length ahead of the compressed bytes so decoding
//! does not need an external size hint.

use byteorder::ByteOrder;
use byteorder::LittleEndian;
use xxhash_rust::xxh32::xxh32;

use crate::error::err_corrupt;
use crate::error::CodecResult;

const MAGIC: u32 = 0x184D_2204;
const FLG: u8 = 0b0110_0000; // version=01, block independence=1
const BD: u8 = 0b0111_0000; // block max size id = 7 (4 MiB)
const END_MARK: u32 = 0;

fn header_checksum(bytes: &[u8]) -> u8 {
    // Mirrors LZ4F_headerChecksum: (XXH32(header, 0) >> 8) & 0xFF.
    ((xxh32(bytes, 0) >> 8) & 0xFF) as u8
}

fn write_frame(out: &mut Vec<u8>, block: &[u8], hc_input: &[u8]) {
    let mut magic_buf = [0u8; 4];
    LittleEndian::write_u32(&mut magic_buf, MAGIC);
    out.extend_from_slice(&magic_buf);
    out.push(FLG);
    out.push(BD);
    out.push(header_checksum(hc_input));

    let mut size_buf = [0u8; 4];
    LittleEndian::write_u32(&mut size_buf, block.len() as u32);
    out.extend_from_slice(&size_buf);
    out.extend_from_slice(block);

    let mut end_buf = [0u8; 4];
    LittleEndian::write_u32(&mut end_buf, END_MARK);
    out.extend_from_slice(&end_buf);
}

pub(crate) fn compress(data: &[u8]) -> CodecResult<Vec<u8>> {
    let block = lz4_flex::compress_prepend_size(data);
    let mut out = Vec::with_capacity(block.len() + 13);
    write_frame(&mut out, &block, &[FLG, BD]);
    Ok(out)
}

/// Replicates the historical magic-0 Kafka broker bug (KAFKA-3160) where the
/// header checksum was computed over the magic number as well as the frame
/// descriptor bytes, instead of the descriptor alone.
pub(crate) fn compress_legacy(data: &[u8]) -> CodecResult<Vec<u8>> {
    let block = lz4_flex::compress_prepend_size(data);
    let mut out = Vec::with_capacity(block.len() + 13);
    let mut magic_buf = [0u8; 4];
    LittleEndian::write_u32(&mut magic_buf, MAGIC);
    let hc_input = [magic_buf[0], magic_buf[1], magic_buf[2], magic_buf[3], FLG, BD];
    write_frame(&mut out, &block, &hc_input);
    Ok(out)
}

pub(crate) fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    if data.len() < 11 {
        return Err(err_corrupt("lz4 frame too short"));
    }
    let magic = LittleEndian::read_u32(&data[0..4]);
    if magic != MAGIC {
        return Err(err_corrupt(format!("bad lz4 frame magic: {magic:#010x}")));
    }
    // header checksum byte at data[6] is intentionally not validated here:
    // the legacy writer produces a non-standard value by design.
    let block_len = LittleEndian::read_u32(&data[7..11]) as usize;
    let block_start = 11;
    let block_end = block_start
        .checked_add(block_len)
        .ok_or_else(|| err_corrupt("lz4 block length overflow"))?;
    if block_end + 4 > data.len() {
        return Err(err_corrupt("truncated lz4 frame"));
    }
    let block = &data[block_start..block_end];
    lz4_flex::decompress_size_prepended(block)
        .map_err(|e| err_corrupt(format!("lz4 block decompress: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lz4_round_trip() {
        let data = b"hello world hello world hello world";
        let compressed = compress(data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_lz4_legacy_round_trip() {
        let data = b"hello world hello world hello world";
        let compressed = compress_legacy(data).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_lz4_legacy_header_checksum_differs() {
        let data = b"same payload";
        let standard = compress(data).unwrap();
        let legacy = compress_legacy(data).unwrap();
        // frame layout is identical except for the HC byte at index 6
        assert_eq!(standard[0..6], legacy[0..6]);
        assert_ne!(standard[6], legacy[6]);
    }
}
