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

use std::io;

/// Errors produced while encoding or decoding record batches.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    #[error("crc check failed (record: {record_crc}, computed: {calc_crc})")]
    CrcCheckFailed { record_crc: u32, calc_crc: u32 },

    #[error("unsupported compression type id: {0}")]
    UnsupportedCompression(u8),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

pub(crate) fn err_corrupt(message: impl Into<String>) -> CodecError {
    CodecError::CorruptRecord(message.into())
}
