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

//! Splits a buffer holding one or more concatenated (and possibly
//! truncated) batches, dispatching each to the right reader by magic.
//!
//! All three magic values share the same leading 16 bytes: an 8-byte
//! offset/base-offset, a 4-byte length, and a 4-byte field (CRC for v0/v1,
//! PartitionLeaderEpoch for v2), so the magic byte itself always sits at
//! offset 16. This lets the splitter find batch boundaries without first
//! knowing which format it is looking at.

use byteorder::BigEndian;
use byteorder::ReadBytesExt;

use crate::error::err_corrupt;
use crate::error::CodecResult;
use crate::records::consts::LOG_OVERHEAD;
use crate::records::consts::MAGIC_OFFSET;
use crate::records::default_batch::RecordBatchReader;
use crate::records::legacy_batch::LegacyRecordBatchReader;
use crate::records::record::Record;

/// Minimum bytes a magic 0/1 message needs beyond the set-entry header:
/// CRC(4) + Magic(1) + Attributes(1) + KeyLen(4) + ValueLen(4).
const RECORD_OVERHEAD_V0: usize = 4 + 1 + 1 + 4 + 4;

/// A single decoded batch, borrowed from the iterator's underlying buffer.
pub enum DecodedBatch<'a> {
    Default(RecordBatchReader<'a>),
    Legacy(LegacyRecordBatchReader<'a>),
}

impl<'a> DecodedBatch<'a> {
    pub fn magic(&self) -> i8 {
        match self {
            DecodedBatch::Default(r) => r.magic(),
            DecodedBatch::Legacy(r) => r.magic(),
        }
    }

    pub fn records(&self) -> CodecResult<Vec<Record>> {
        match self {
            DecodedBatch::Default(r) => r.records(),
            DecodedBatch::Legacy(r) => r.records(),
        }
    }

    pub fn validate_crc(&self) -> CodecResult<()> {
        match self {
            DecodedBatch::Default(r) => r.validate_crc(),
            DecodedBatch::Legacy(r) => r.validate_crc(),
        }
    }
}

/// Lazily splits `buffer` into batch slices and decodes each on demand.
///
/// A trailing slice that is present but incomplete (too short to contain a
/// full batch, or whose declared length runs past the end of `buffer`) is
/// not an error: it is simply excluded from iteration and counted in
/// [`BatchIterator::remaining`], matching how a Kafka consumer handles a
/// partially-fetched tail batch.
pub struct BatchIterator<'a> {
    buffer: &'a [u8],
    slices: Vec<&'a [u8]>,
    remaining: usize,
    next: usize,
}

impl<'a> BatchIterator<'a> {
    pub fn new(buffer: &'a [u8]) -> CodecResult<Self> {
        let (slices, remaining) = split_slices(buffer)?;
        Ok(BatchIterator { buffer, slices, remaining, next: 0 })
    }

    pub fn size_in_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes consumed by complete, yieldable batches.
    pub fn valid_bytes(&self) -> usize {
        self.buffer.len() - self.remaining
    }

    /// Bytes left over in a trailing incomplete batch, or `0` if the buffer
    /// ends exactly on a batch boundary.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn has_next(&self) -> bool {
        self.next < self.slices.len()
    }
}

impl<'a> Iterator for BatchIterator<'a> {
    type Item = CodecResult<DecodedBatch<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }
        let slice = self.slices[self.next];
        self.next += 1;

        let magic = slice.get(MAGIC_OFFSET).copied().unwrap_or(0) as i8;
        let batch = if magic >= 2 {
            RecordBatchReader::new(slice).map(DecodedBatch::Default)
        } else {
            LegacyRecordBatchReader::new(slice).map(DecodedBatch::Legacy)
        };
        Some(batch)
    }
}

fn split_slices(buffer: &[u8]) -> CodecResult<(Vec<&[u8]>, usize)> {
    let mut slices = Vec::new();
    let mut next = 0usize;
    let mut remaining = 0usize;
    let total = buffer.len();

    while next != total {
        remaining = total - next;
        if remaining < LOG_OVERHEAD {
            break;
        }

        let length = (&buffer[next + 8..next + 12]).read_i32::<BigEndian>()?;
        if length < RECORD_OVERHEAD_V0 as i32 {
            return Err(err_corrupt(format!(
                "declared batch length {length} is below the minimum record overhead"
            )));
        }

        let slice_end = next + length as usize + LOG_OVERHEAD;
        if slice_end > total {
            break;
        }

        slices.push(&buffer[next..slice_end]);
        next = slice_end;
    }

    Ok((slices, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::default_batch::RecordBatchWriter;
    use crate::records::legacy_batch::LegacyRecordBatchWriter;
    use crate::records::record::CompressionType;

    fn build_default_batch(offset: i64, value: &[u8]) -> Vec<u8> {
        let mut writer = RecordBatchWriter::new(CompressionType::None, false, -1, -1, -1, 1_000_000);
        writer.append(offset, 1, None, Some(value), vec![]).unwrap();
        writer.build().unwrap()
    }

    fn build_legacy_batch(magic: i8, value: &[u8]) -> Vec<u8> {
        let mut writer = LegacyRecordBatchWriter::new(magic, CompressionType::None, 1_000_000);
        writer.append(0, 1, None, Some(value), &[]).unwrap();
        writer.build().unwrap()
    }

    #[test]
    fn test_iterate_mixed_concatenation() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&build_legacy_batch(1, b"123"));
        buf.extend_from_slice(&build_default_batch(0, b"456"));

        let mut iter = BatchIterator::new(&buf).unwrap();
        assert_eq!(iter.remaining(), 0);

        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.magic(), 1);
        assert_eq!(first.records().unwrap()[0].value.as_deref(), Some(b"123".as_slice()));

        let second = iter.next().unwrap().unwrap();
        assert_eq!(second.magic(), 2);
        assert_eq!(second.records().unwrap()[0].value.as_deref(), Some(b"456".as_slice()));

        assert!(iter.next().is_none());
    }

    #[test]
    fn test_truncated_tail_is_reported_not_errored() {
        let whole = build_default_batch(0, b"hello world");
        let second = build_default_batch(1, b"second batch");
        let mut buf = whole.clone();
        buf.extend_from_slice(&second);

        let cut = 5;
        buf.truncate(buf.len() - cut);

        let mut iter = BatchIterator::new(&buf).unwrap();
        let batches: Vec<_> = (&mut iter).collect::<CodecResult<Vec<_>>>().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(iter.remaining(), second.len() - cut);
        assert_eq!(iter.valid_bytes(), whole.len());
    }

    #[test]
    fn test_empty_buffer_yields_nothing() {
        let mut iter = BatchIterator::new(&[]).unwrap();
        assert!(iter.next().is_none());
        assert_eq!(iter.remaining(), 0);
    }
}
