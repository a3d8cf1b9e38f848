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

use crate::error::err_corrupt;
use crate::error::CodecResult;

const ZSTD_LEVEL: i32 = 3;

pub(crate) fn compress(data: &[u8]) -> CodecResult<Vec<u8>> {
    zstd::encode_all(data, ZSTD_LEVEL).map_err(|e| err_corrupt(format!("zstd compress: {e}")))
}

pub(crate) fn decompress(data: &[u8]) -> CodecResult<Vec<u8>> {
    zstd::decode_all(data).map_err(|e| err_corrupt(format!("zstd decompress: {e}")))
}
