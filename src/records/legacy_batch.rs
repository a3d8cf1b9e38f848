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

//! Writer and reader for the legacy (magic 0/1) message set format.

use byteorder::BigEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::compression;
use crate::crc32c::crc32_ieee;
use crate::error::err_corrupt;
use crate::error::CodecResult;
use crate::records::record::CompressionType;
use crate::records::record::Record;
use crate::records::record::TimestampType;
use crate::varint::read_bytes;

const MESSAGE_SET_ENTRY_OVERHEAD: usize = 8 + 4; // offset + message size
const COMPRESSION_CODEC_MASK: i8 = 0x07;
const TIMESTAMP_TYPE_MASK: i8 = 0x08;

fn message_overhead(magic: i8) -> usize {
    let fixed = 4 + 1 + 1 + 4 + 4; // crc + magic + attributes + key len + value len
    if magic >= 1 {
        fixed + 8 // timestamp
    } else {
        fixed
    }
}

/// Builds a single magic-0/1 message set. Headers are not representable at
/// this magic; [`LegacyRecordBatchWriter::append`] rejects non-empty ones.
pub struct LegacyRecordBatchWriter {
    magic: i8,
    compression_type: CompressionType,
    batch_size: usize,
    messages: Vec<u8>,
    first_message: bool,
    max_timestamp: i64,
}

impl LegacyRecordBatchWriter {
    pub fn new(magic: i8, compression_type: CompressionType, batch_size: usize) -> Self {
        LegacyRecordBatchWriter {
            magic,
            compression_type,
            batch_size,
            messages: Vec::new(),
            first_message: true,
            max_timestamp: 0,
        }
    }

    fn is_full(&self, key: Option<&[u8]>, value: Option<&[u8]>) -> bool {
        if self.first_message {
            return false;
        }
        let mut needed = MESSAGE_SET_ENTRY_OVERHEAD + message_overhead(self.magic);
        needed += key.map_or(0, |k| k.len());
        needed += value.map_or(0, |v| v.len());
        self.messages.len() + needed > self.batch_size
    }

    /// Appends a message. Returns `false` (without mutating state) if the
    /// batch has no free capacity and at least one message is already
    /// present; the first message is always accepted. Fails if `headers` is
    /// non-empty, which v0/v1 cannot express.
    pub fn append(
        &mut self,
        offset: i64,
        timestamp: i64,
        key: Option<&[u8]>,
        value: Option<&[u8]>,
        headers: &[crate::records::record::Header],
    ) -> CodecResult<bool> {
        if !headers.is_empty() {
            return Err(err_corrupt("headers are not supported in magic 0/1 record batches"));
        }
        if self.is_full(key, value) {
            return Ok(false);
        }

        self.first_message = false;
        self.max_timestamp = self.max_timestamp.max(timestamp);
        let message_timestamp = if self.magic >= 1 { Some(timestamp) } else { None };
        let encoded = encode_message(self.magic, 0, message_timestamp, key, value)?;
        self.messages.write_i64::<BigEndian>(offset)?;
        self.messages.write_i32::<BigEndian>(encoded.len() as i32)?;
        self.messages.extend_from_slice(&encoded);
        Ok(true)
    }

    /// Compresses the accumulated message set if a compression type was
    /// configured and the wrapper message is smaller than the original.
    fn maybe_compress(&mut self) -> CodecResult<()> {
        if self.compression_type == CompressionType::None {
            return Ok(());
        }
        let compressed = compression::compress(self.compression_type, self.magic, &self.messages)?;
        let wrapper_timestamp = if self.magic >= 1 { Some(self.max_timestamp) } else { None };
        let encoded = encode_message(
            self.magic,
            self.compression_type.as_u8() as i8,
            wrapper_timestamp,
            None,
            Some(&compressed),
        )?;

        // if the compressed wrapper plus its own set-entry header is not
        // smaller than the original, sending uncompressed is cheaper.
        if encoded.len() + MESSAGE_SET_ENTRY_OVERHEAD < self.messages.len() {
            let mut wrapped = Vec::with_capacity(MESSAGE_SET_ENTRY_OVERHEAD + encoded.len());
            wrapped.write_i64::<BigEndian>(0)?;
            wrapped.write_i32::<BigEndian>(encoded.len() as i32)?;
            wrapped.extend_from_slice(&encoded);
            self.messages = wrapped;
        }
        Ok(())
    }

    /// Finalizes the message set: compresses it if configured and prefixes
    /// it with its total length.
    pub fn build(mut self) -> CodecResult<Vec<u8>> {
        self.maybe_compress()?;
        let mut buf = Vec::with_capacity(4 + self.messages.len());
        buf.write_i32::<BigEndian>(self.messages.len() as i32)?;
        buf.extend_from_slice(&self.messages);
        Ok(buf)
    }
}

fn encode_message(
    magic: i8,
    attributes: i8,
    timestamp: Option<i64>,
    key: Option<&[u8]>,
    value: Option<&[u8]>,
) -> CodecResult<Vec<u8>> {
    let mut content = Vec::new();
    content.write_i8(magic)?;
    content.write_i8(attributes)?;
    if let Some(ts) = timestamp {
        content.write_i64::<BigEndian>(ts)?;
    }
    write_nullable_bytes(&mut content, key)?;
    write_nullable_bytes(&mut content, value)?;

    let crc = crc32_ieee(&content);
    let mut out = Vec::with_capacity(4 + content.len());
    out.write_u32::<BigEndian>(crc)?;
    out.extend_from_slice(&content);
    Ok(out)
}

fn write_nullable_bytes<B: WriteBytesExt>(buf: &mut B, bytes: Option<&[u8]>) -> CodecResult<()> {
    match bytes {
        None => buf.write_i32::<BigEndian>(-1)?,
        Some(b) => {
            buf.write_i32::<BigEndian>(b.len() as i32)?;
            buf.write_all(b)?;
        }
    }
    Ok(())
}

struct MessageFields {
    crc: u32,
    magic: i8,
    attributes: i8,
    timestamp: Option<i64>,
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
}

impl MessageFields {
    fn timestamp_type(&self) -> TimestampType {
        if self.attributes & TIMESTAMP_TYPE_MASK != 0 {
            TimestampType::LogAppendTime
        } else {
            TimestampType::CreateTime
        }
    }

    fn compression_type(&self) -> CodecResult<CompressionType> {
        CompressionType::try_from((self.attributes & COMPRESSION_CODEC_MASK) as u8)
    }
}

fn decode_message(mut bytes: &[u8]) -> CodecResult<MessageFields> {
    let crc = bytes.read_u32::<BigEndian>()?;
    let magic = bytes.read_i8()?;
    let attributes = bytes.read_i8()?;
    let timestamp = if magic >= 1 {
        Some(bytes.read_i64::<BigEndian>()?)
    } else {
        None
    };
    let key_len = bytes.read_i32::<BigEndian>()?;
    let key = read_bytes(&mut bytes, key_len)?;
    let value_len = bytes.read_i32::<BigEndian>()?;
    let value = read_bytes(&mut bytes, value_len)?;
    Ok(MessageFields { crc, magic, attributes, timestamp, key, value })
}

fn decode_message_set(mut buf: &[u8]) -> CodecResult<Vec<(i64, MessageFields)>> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        if buf.len() < MESSAGE_SET_ENTRY_OVERHEAD {
            return Err(err_corrupt("truncated inner message set entry header"));
        }
        let offset = buf.read_i64::<BigEndian>()?;
        let size = buf.read_i32::<BigEndian>()? as usize;
        if buf.len() < size {
            return Err(err_corrupt("truncated inner message payload"));
        }
        let (msg_bytes, rest) = buf.split_at(size);
        out.push((offset, decode_message(msg_bytes)?));
        buf = rest;
    }
    Ok(out)
}

/// Read-only view over a single magic-0/1 message set entry: exactly one
/// `Offset | MessageSize | Message` triple (the concatenation-splitting
/// lives in [`crate::records::iterator`]).
pub struct LegacyRecordBatchReader<'a> {
    bytes: &'a [u8],
    magic: i8,
}

impl<'a> LegacyRecordBatchReader<'a> {
    pub fn new(bytes: &'a [u8]) -> CodecResult<Self> {
        if bytes.len() < MESSAGE_SET_ENTRY_OVERHEAD + 6 {
            return Err(err_corrupt("message set entry shorter than the minimum legacy header"));
        }
        let reader = LegacyRecordBatchReader { bytes, magic: 0 };
        let magic = reader.message_fields()?.magic;
        if magic != 0 && magic != 1 {
            return Err(err_corrupt(format!("not a legacy batch: magic={magic}")));
        }
        Ok(LegacyRecordBatchReader { bytes, magic })
    }

    fn outer_offset(&self) -> CodecResult<i64> {
        Ok((&self.bytes[0..8]).read_i64::<BigEndian>()?)
    }

    fn message_bytes(&self) -> CodecResult<&'a [u8]> {
        let size = (&self.bytes[8..12]).read_i32::<BigEndian>()? as usize;
        let end = MESSAGE_SET_ENTRY_OVERHEAD
            .checked_add(size)
            .ok_or_else(|| err_corrupt("declared message size overflows"))?;
        if end > self.bytes.len() {
            return Err(err_corrupt(format!(
                "declared message size {size} runs past the end of the buffer"
            )));
        }
        Ok(&self.bytes[MESSAGE_SET_ENTRY_OVERHEAD..end])
    }

    fn message_fields(&self) -> CodecResult<MessageFields> {
        decode_message(self.message_bytes()?)
    }

    pub fn magic(&self) -> i8 {
        self.magic
    }

    /// The outer message's own CRC, as stored on the wire.
    pub fn crc(&self) -> CodecResult<u32> {
        Ok(self.message_fields()?.crc)
    }

    /// The wrapper's compression codec (attributes bits 0-2).
    pub fn compression_type(&self) -> CodecResult<CompressionType> {
        self.message_fields()?.compression_type()
    }

    /// The wrapper's timestamp type (attributes bit 3); meaningless for
    /// magic 0, which has no per-message timestamp at all.
    pub fn timestamp_type(&self) -> CodecResult<TimestampType> {
        Ok(self.message_fields()?.timestamp_type())
    }

    /// Validates the outer message's own CRC (covers magic through value).
    pub fn validate_crc(&self) -> CodecResult<()> {
        let message = self.message_bytes()?;
        let fields = decode_message(message)?;
        let calc = crc32_ieee(&message[4..]);
        if calc != fields.crc {
            return Err(crate::error::CodecError::CrcCheckFailed {
                record_crc: fields.crc,
                calc_crc: calc,
            });
        }
        Ok(())
    }

    /// Decodes the outer message, decompressing and splitting the nested
    /// message set if the wrapper indicates compression.
    pub fn records(&self) -> CodecResult<Vec<Record>> {
        let offset = self.outer_offset()?;
        let fields = self.message_fields()?;
        let compression_type = fields.compression_type()?;

        if compression_type == CompressionType::None {
            return Ok(vec![Record {
                offset,
                timestamp: fields.timestamp,
                timestamp_type: fields.timestamp_type(),
                attrs: fields.attributes,
                key: fields.key,
                value: fields.value,
                headers: vec![],
                checksum: Some(fields.crc),
            }]);
        }

        let inner_buf = compression::decompress(
            compression_type,
            fields.value.as_deref().ok_or_else(|| err_corrupt("compressed message has no value"))?,
        )?;
        let inner_entries = decode_message_set(&inner_buf)?;

        let absolute_base = if fields.magic > 0 {
            let last_relative = inner_entries.last().map(|(o, _)| *o).unwrap_or(0);
            offset - last_relative
        } else {
            -1
        };

        let timestamp_type = fields.timestamp_type();
        let mut records = Vec::with_capacity(inner_entries.len());
        for (inner_offset, inner_fields) in inner_entries {
            let timestamp = if fields.magic > 0 {
                match timestamp_type {
                    TimestampType::CreateTime => inner_fields.timestamp,
                    TimestampType::LogAppendTime => fields.timestamp,
                }
            } else {
                None
            };
            let resolved_offset = if absolute_base >= 0 { inner_offset + absolute_base } else { inner_offset };
            records.push(Record {
                offset: resolved_offset,
                timestamp,
                timestamp_type,
                attrs: fields.attributes,
                key: inner_fields.key,
                value: inner_fields.value,
                headers: vec![],
                checksum: Some(inner_fields.crc),
            });
        }
        Ok(records)
    }
}
