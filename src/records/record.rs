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

/// A decoded record, uniform across legacy (magic 0/1) and default (magic 2)
/// batches.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Record {
    pub offset: i64,
    /// Absent for magic 0, which carries no per-message timestamp.
    pub timestamp: Option<i64>,
    pub timestamp_type: TimestampType,
    /// Always `0` in default format. In legacy format this is the wrapper
    /// message's attributes byte (compression codec and timestamp type);
    /// inner messages of a compressed legacy wrapper don't carry their own.
    pub attrs: i8,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    /// Always empty for magic < 2.
    pub headers: Vec<Header>,
    /// The message's own CRC for magic 0/1; `None` for magic 2, where the
    /// checksum protects the whole batch rather than individual records.
    pub checksum: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TimestampType {
    #[default]
    CreateTime,
    LogAppendTime,
}

impl TimestampType {
    pub fn as_i8(self) -> i8 {
        match self {
            TimestampType::CreateTime => 0,
            TimestampType::LogAppendTime => 1,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl CompressionType {
    pub fn as_u8(self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Gzip => 1,
            CompressionType::Snappy => 2,
            CompressionType::Lz4 => 3,
            CompressionType::Zstd => 4,
        }
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = crate::error::CodecError;

    fn try_from(ty: u8) -> Result<Self, Self::Error> {
        match ty {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Snappy),
            3 => Ok(CompressionType::Lz4),
            4 => Ok(CompressionType::Zstd),
            other => Err(crate::compression::err_unsupported(other)),
        }
    }
}
