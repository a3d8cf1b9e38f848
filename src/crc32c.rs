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

//! CRC32C (Castagnoli) checksum used to protect default (v2) record batches.
//!
//! Legacy (v0/v1) messages use the plain CRC-32 (IEEE) polynomial instead; see
//! [`crate::records::legacy_batch`].

use crc::Crc;
use crc::CRC_32_ISCSI;
use crc::CRC_32_ISO_HDLC;

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
const IEEE: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc32c(data: &[u8]) -> u32 {
    CASTAGNOLI.checksum(data)
}

/// The plain (IEEE, reflected 0xEDB88320) CRC-32 used by legacy (magic 0/1)
/// messages. Distinct from [`crc32c`]: v2 switched to Castagnoli.
pub fn crc32_ieee(data: &[u8]) -> u32 {
    IEEE.checksum(data)
}
