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

//! Writer and reader for the default (magic 2) record batch format.

use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::compression;
use crate::crc32c::crc32c;
use crate::error::err_corrupt;
use crate::error::CodecResult;
use crate::records::consts::*;
use crate::records::record::CompressionType;
use crate::records::record::Header;
use crate::records::record::Record;
use crate::records::record::TimestampType;
use crate::varint::read_bytes;
use crate::varint::read_varint;
use crate::varint::read_varlong;
use crate::varint::size_of_varint;
use crate::varint::size_of_varlong;
use crate::varint::write_varint;
use crate::varint::write_varlong;

/// Builds a single magic-2 record batch. `base_offset` is always `0`; the
/// broker is the one that rewrites it on append to the log.
pub struct RecordBatchWriter {
    compression_type: CompressionType,
    is_transactional: bool,
    is_control: bool,
    producer_id: i64,
    producer_epoch: i16,
    base_sequence: i32,
    partition_leader_epoch: i32,
    batch_size: usize,
    records: Vec<u8>,
    record_count: i32,
    first_timestamp: Option<i64>,
    max_timestamp: i64,
    last_offset_delta: i32,
}

#[allow(clippy::too_many_arguments)]
impl RecordBatchWriter {
    pub fn new(
        compression_type: CompressionType,
        is_transactional: bool,
        producer_id: i64,
        producer_epoch: i16,
        base_sequence: i32,
        batch_size: usize,
    ) -> Self {
        RecordBatchWriter {
            compression_type,
            is_transactional,
            is_control: false,
            producer_id,
            producer_epoch,
            base_sequence,
            partition_leader_epoch: -1,
            batch_size,
            records: Vec::new(),
            record_count: 0,
            first_timestamp: None,
            max_timestamp: i64::MIN,
            last_offset_delta: 0,
        }
    }

    pub fn mark_control_batch(&mut self) {
        self.is_control = true;
    }

    fn timestamp_delta(&self, timestamp: i64) -> i64 {
        timestamp - self.first_timestamp.unwrap_or(timestamp)
    }

    /// Exact number of bytes appending this record would add to the batch.
    pub fn size_in_bytes(
        &self,
        offset: i64,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        headers: &[Header],
    ) -> usize {
        record_size(self.timestamp_delta(timestamp), offset as i32, key, value, headers)
    }

    /// Upper bound on the encoded size of a record with the given payload,
    /// usable before the record's offset or timestamp are known.
    pub fn estimate_size_in_bytes(
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        headers: &[Header],
    ) -> usize {
        // worst case: 10-byte timestamp delta, 5-byte offset delta
        record_size(i64::MIN, i32::MAX, key, value, headers)
    }

    /// Appends a record. Returns `false` (without mutating state) if the
    /// batch has no free capacity and at least one record is already
    /// present; the first record is always accepted.
    pub fn append(
        &mut self,
        offset: i64,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        headers: Vec<Header>,
    ) -> CodecResult<bool> {
        let offset_delta = offset as i32;
        let timestamp_delta = self.timestamp_delta(timestamp);
        let needed = record_size(timestamp_delta, offset_delta, key, value, &headers);
        if self.record_count > 0 && RECORD_BATCH_OVERHEAD + self.records.len() + needed > self.batch_size
        {
            return Ok(false);
        }

        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(timestamp);
        }
        write_varint(&mut self.records, content_len(timestamp_delta, offset_delta, key, value, &headers) as i32)?;
        self.records.write_i8(0)?; // attributes, always 0
        write_varlong(&mut self.records, timestamp_delta)?;
        write_varint(&mut self.records, offset_delta)?;
        write_nullable_bytes(&mut self.records, key)?;
        write_nullable_bytes(&mut self.records, value)?;
        write_varint(&mut self.records, headers.len() as i32)?;
        for header in &headers {
            write_nullable_bytes(&mut self.records, Some(header.key.as_bytes()))?;
            write_nullable_bytes(&mut self.records, header.value.as_deref())?;
        }

        self.record_count += 1;
        self.max_timestamp = self.max_timestamp.max(timestamp);
        self.last_offset_delta = self.last_offset_delta.max(offset_delta);
        Ok(true)
    }

    /// Finalizes the batch: compresses the records region if configured,
    /// writes the header, and computes the CRC32C.
    pub fn build(self) -> CodecResult<Vec<u8>> {
        let records = compression::compress(self.compression_type, 2, &self.records)?;

        let mut attributes: u16 = self.compression_type.as_u8() as u16;
        if self.is_transactional {
            attributes |= TRANSACTIONAL_FLAG_MASK as u16;
        }
        if self.is_control {
            attributes |= CONTROL_FLAG_MASK as u16;
        }

        let batch_length = (RECORD_BATCH_OVERHEAD - LOG_OVERHEAD) + records.len();

        let mut buf = Vec::with_capacity(LOG_OVERHEAD + batch_length);
        buf.write_i64::<BigEndian>(0)?; // base offset
        buf.write_i32::<BigEndian>(batch_length as i32)?;
        buf.write_i32::<BigEndian>(self.partition_leader_epoch)?;
        buf.write_i8(2)?; // magic
        let crc_pos = buf.len();
        buf.write_u32::<BigEndian>(0)?; // crc placeholder
        buf.write_u16::<BigEndian>(attributes)?;
        buf.write_i32::<BigEndian>(self.last_offset_delta)?;
        buf.write_i64::<BigEndian>(self.first_timestamp.unwrap_or(0))?;
        buf.write_i64::<BigEndian>(self.max_timestamp.max(self.first_timestamp.unwrap_or(0)))?;
        buf.write_i64::<BigEndian>(self.producer_id)?;
        buf.write_i16::<BigEndian>(self.producer_epoch)?;
        buf.write_i32::<BigEndian>(self.base_sequence)?;
        buf.write_i32::<BigEndian>(self.record_count)?;
        buf.extend_from_slice(&records);

        let crc = crc32c(&buf[crc_pos + CRC_LENGTH..]);
        (&mut buf[crc_pos..crc_pos + CRC_LENGTH]).write_u32::<BigEndian>(crc)?;

        Ok(buf)
    }
}

fn content_len(
    timestamp_delta: i64,
    offset_delta: i32,
    key: Option<&[u8]>,
    value: Option<&[u8]>,
    headers: &[Header],
) -> usize {
    let mut size = 1; // attributes
    size += size_of_varlong(timestamp_delta);
    size += size_of_varint(offset_delta);
    size += nullable_bytes_size(key);
    size += nullable_bytes_size(value);
    size += size_of_varint(headers.len() as i32);
    for header in headers {
        size += nullable_bytes_size(Some(header.key.as_bytes()));
        size += nullable_bytes_size(header.value.as_deref());
    }
    size
}

fn record_size(
    timestamp_delta: i64,
    offset_delta: i32,
    key: Option<&[u8]>,
    value: Option<&[u8]>,
    headers: &[Header],
) -> usize {
    let content = content_len(timestamp_delta, offset_delta, key, value, headers);
    size_of_varint(content as i32) + content
}

fn nullable_bytes_size(bytes: Option<&[u8]>) -> usize {
    match bytes {
        None => size_of_varint(-1),
        Some(b) => size_of_varint(b.len() as i32) + b.len(),
    }
}

fn write_nullable_bytes<B: WriteBytesExt>(buf: &mut B, bytes: Option<&[u8]>) -> CodecResult<()> {
    match bytes {
        None => write_varint(buf, -1),
        Some(b) => {
            write_varint(buf, b.len() as i32)?;
            buf.write_all(b)?;
            Ok(())
        }
    }
}

/// Read-only view over a single magic-2 record batch slice.
pub struct RecordBatchReader<'a> {
    bytes: &'a [u8],
}

impl<'a> RecordBatchReader<'a> {
    /// `bytes` must be exactly one batch: `LOG_OVERHEAD + batch_length`.
    pub fn new(bytes: &'a [u8]) -> CodecResult<Self> {
        if bytes.len() < RECORD_BATCH_OVERHEAD {
            return Err(err_corrupt("batch shorter than the minimum v2 header"));
        }
        let magic = (&bytes[MAGIC_OFFSET..]).read_i8()?;
        if magic != 2 {
            return Err(err_corrupt(format!("not a magic-2 batch: magic={magic}")));
        }
        Ok(RecordBatchReader { bytes })
    }

    pub fn magic(&self) -> i8 {
        2
    }

    pub fn base_offset(&self) -> i64 {
        (&self.bytes[BASE_OFFSET_OFFSET..]).read_i64::<BigEndian>().unwrap()
    }

    pub fn last_offset_delta(&self) -> i32 {
        (&self.bytes[LAST_OFFSET_DELTA_OFFSET..]).read_i32::<BigEndian>().unwrap()
    }

    pub fn last_offset(&self) -> i64 {
        self.base_offset() + self.last_offset_delta() as i64
    }

    pub fn partition_leader_epoch(&self) -> i32 {
        (&self.bytes[PARTITION_LEADER_EPOCH_OFFSET..]).read_i32::<BigEndian>().unwrap()
    }

    pub fn checksum(&self) -> u32 {
        (&self.bytes[CRC_OFFSET..]).read_u32::<BigEndian>().unwrap()
    }

    pub fn first_timestamp(&self) -> i64 {
        (&self.bytes[BASE_TIMESTAMP_OFFSET..]).read_i64::<BigEndian>().unwrap()
    }

    pub fn max_timestamp(&self) -> i64 {
        (&self.bytes[MAX_TIMESTAMP_OFFSET..]).read_i64::<BigEndian>().unwrap()
    }

    pub fn producer_id(&self) -> i64 {
        (&self.bytes[PRODUCER_ID_OFFSET..]).read_i64::<BigEndian>().unwrap()
    }

    pub fn producer_epoch(&self) -> i16 {
        (&self.bytes[PRODUCER_EPOCH_OFFSET..]).read_i16::<BigEndian>().unwrap()
    }

    pub fn base_sequence(&self) -> i32 {
        (&self.bytes[BASE_SEQUENCE_OFFSET..]).read_i32::<BigEndian>().unwrap()
    }

    pub fn records_count(&self) -> i32 {
        (&self.bytes[RECORDS_COUNT_OFFSET..]).read_i32::<BigEndian>().unwrap()
    }

    fn attributes(&self) -> u16 {
        (&self.bytes[ATTRIBUTES_OFFSET..]).read_u16::<BigEndian>().unwrap()
    }

    pub fn compression_type(&self) -> CodecResult<CompressionType> {
        CompressionType::try_from((self.attributes() & COMPRESSION_CODEC_MASK as u16) as u8)
    }

    pub fn timestamp_type(&self) -> TimestampType {
        if self.attributes() & TIMESTAMP_TYPE_MASK as u16 != 0 {
            TimestampType::LogAppendTime
        } else {
            TimestampType::CreateTime
        }
    }

    pub fn is_transactional(&self) -> bool {
        self.attributes() & TRANSACTIONAL_FLAG_MASK as u16 != 0
    }

    pub fn is_control_batch(&self) -> bool {
        self.attributes() & CONTROL_FLAG_MASK as u16 != 0
    }

    /// Validates the CRC32C over every byte after the CRC field.
    pub fn validate_crc(&self) -> CodecResult<()> {
        let calc = crc32c(&self.bytes[CRC_OFFSET + CRC_LENGTH..]);
        let stored = self.checksum();
        if calc != stored {
            return Err(crate::error::CodecError::CrcCheckFailed {
                record_crc: stored,
                calc_crc: calc,
            });
        }
        Ok(())
    }

    /// Decompresses (if needed) and decodes every record in the batch.
    pub fn records(&self) -> CodecResult<Vec<Record>> {
        let compression_type = self.compression_type()?;
        let raw = &self.bytes[RECORDS_OFFSET..];
        let owned;
        let region: &[u8] = if compression_type == CompressionType::None {
            raw
        } else {
            owned = compression::decompress(compression_type, raw)?;
            &owned
        };
        decode_records(
            region,
            self.base_offset(),
            self.first_timestamp(),
            self.timestamp_type(),
            self.records_count(),
        )
    }
}

fn decode_records(
    mut region: &[u8],
    base_offset: i64,
    first_timestamp: i64,
    timestamp_type: TimestampType,
    count: i32,
) -> CodecResult<Vec<Record>> {
    let mut records = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let _len = read_varint(&mut region)?;
        let attributes = region.read_i8()?;
        let timestamp_delta = read_varlong(&mut region)?;
        let offset_delta = read_varint(&mut region)?;
        let key_len = read_varint(&mut region)?;
        let key = read_bytes(&mut region, key_len)?;
        let value_len = read_varint(&mut region)?;
        let value = read_bytes(&mut region, value_len)?;
        let header_count = read_varint(&mut region)?;
        let mut headers = Vec::with_capacity(header_count.max(0) as usize);
        for _ in 0..header_count {
            let key_len = read_varint(&mut region)?;
            let header_key = read_bytes(&mut region, key_len)?
                .ok_or_else(|| err_corrupt("header key must not be null"))?;
            let header_key = String::from_utf8(header_key)
                .map_err(|e| err_corrupt(format!("header key is not utf-8: {e}")))?;
            let value_len = read_varint(&mut region)?;
            let header_value = read_bytes(&mut region, value_len)?;
            headers.push(Header {
                key: header_key,
                value: header_value,
            });
        }

        records.push(Record {
            offset: base_offset + offset_delta as i64,
            timestamp: Some(first_timestamp + timestamp_delta),
            timestamp_type,
            attrs: attributes,
            key,
            value,
            headers,
            checksum: None,
        });
    }
    Ok(records)
}
