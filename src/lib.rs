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

//! Codec for Apache Kafka record batch wire formats: the legacy magic 0/1
//! message set and the default magic 2 record batch, plus a lazy iterator
//! over a buffer that may hold several concatenated batches.

mod compression;
pub mod crc32c;
pub mod error;
pub mod records;
pub mod varint;

pub use error::CodecError;
pub use error::CodecResult;
pub use records::default_batch::RecordBatchReader;
pub use records::default_batch::RecordBatchWriter;
pub use records::iterator::BatchIterator;
pub use records::iterator::DecodedBatch;
pub use records::legacy_batch::LegacyRecordBatchReader;
pub use records::legacy_batch::LegacyRecordBatchWriter;
pub use records::CompressionType;
pub use records::Header;
pub use records::Record;
pub use records::TimestampType;
