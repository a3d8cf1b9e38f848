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

//! Compression envelopes applied to the records region of a batch.
//!
//! Each backend speaks the wire framing real Kafka clients produce, not just
//! the bare compressed bytes: gzip is a plain gzip stream, Snappy is framed
//! the way `org.xerial.snappy` frames it, and LZ4 is wrapped in an LZ4 frame
//! with the historical magic-0 header-checksum quirk preserved for
//! [`lz4::compress_legacy`].

mod gzip;
mod lz4;
mod snappy;
mod zstd;

use crate::error::CodecError;
use crate::error::CodecResult;
use crate::records::record::CompressionType;

/// Compresses `data` using `kind`. `magic == 0` selects the legacy LZ4
/// framing quirk when `kind` is [`CompressionType::Lz4`].
pub fn compress(kind: CompressionType, magic: i8, data: &[u8]) -> CodecResult<Vec<u8>> {
    match kind {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Gzip => gzip::compress(data),
        CompressionType::Snappy => snappy::compress(data),
        CompressionType::Lz4 => {
            if magic == 0 {
                lz4::compress_legacy(data)
            } else {
                lz4::compress(data)
            }
        }
        CompressionType::Zstd => zstd::compress(data),
    }
}

pub fn decompress(kind: CompressionType, data: &[u8]) -> CodecResult<Vec<u8>> {
    match kind {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Gzip => gzip::decompress(data),
        CompressionType::Snappy => snappy::decompress(data),
        CompressionType::Lz4 => lz4::decompress(data),
        CompressionType::Zstd => zstd::decompress(data),
    }
}

pub(crate) fn err_unsupported(id: u8) -> CodecError {
    CodecError::UnsupportedCompression(id)
}
