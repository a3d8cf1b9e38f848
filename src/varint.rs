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

//! Zigzag varint codec used to frame records inside a default (v2) batch.

use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

use crate::error::CodecResult;

pub(crate) fn read_unsigned_varint<B: ReadBytesExt>(buf: &mut B) -> CodecResult<i32> {
    let mut res: i32 = 0;
    for i in 0.. {
        if i >= 5 {
            return Err(crate::error::err_corrupt("varint longer than 5 bytes"));
        }
        let next = buf.read_u8()? as i32;
        res |= (next & 0x7F) << (i * 7);
        if next < 0x80 {
            break;
        }
    }
    Ok(res)
}

pub(crate) fn read_unsigned_varlong<B: ReadBytesExt>(buf: &mut B) -> CodecResult<i64> {
    let mut res: i64 = 0;
    for i in 0.. {
        if i >= 10 {
            return Err(crate::error::err_corrupt("varlong longer than 10 bytes"));
        }
        let next = buf.read_u8()? as i64;
        res |= (next & 0x7F) << (i * 7);
        if next < 0x80 {
            break;
        }
    }
    Ok(res)
}

fn varint_zigzag_decode(i: i32) -> i32 {
    (((i as u32) >> 1) as i32) ^ -(i & 1)
}

fn varlong_zigzag_decode(i: i64) -> i64 {
    (((i as u64) >> 1) as i64) ^ -(i & 1)
}

fn varint_zigzag_encode(i: i32) -> i32 {
    (i << 1) ^ (i >> 31)
}

fn varlong_zigzag_encode(i: i64) -> i64 {
    (i << 1) ^ (i >> 63)
}

pub(crate) fn write_unsigned_varint<B: WriteBytesExt>(buf: &mut B, n: i32) -> CodecResult<()> {
    let mut v = n as u32;
    while v >= 0x80 {
        buf.write_u8((v as u8) | 0x80)?;
        v >>= 7;
    }
    buf.write_u8(v as u8)?;
    Ok(())
}

pub(crate) fn write_unsigned_varlong<B: WriteBytesExt>(buf: &mut B, n: i64) -> CodecResult<()> {
    let mut v = n as u64;
    while v >= 0x80 {
        buf.write_u8((v as u8) | 0x80)?;
        v >>= 7;
    }
    buf.write_u8(v as u8)?;
    Ok(())
}

pub fn read_varint<B: ReadBytesExt>(buf: &mut B) -> CodecResult<i32> {
    read_unsigned_varint(buf).map(varint_zigzag_decode)
}

pub fn read_varlong<B: ReadBytesExt>(buf: &mut B) -> CodecResult<i64> {
    read_unsigned_varlong(buf).map(varlong_zigzag_decode)
}

pub fn write_varint<B: WriteBytesExt>(buf: &mut B, n: i32) -> CodecResult<()> {
    write_unsigned_varint(buf, varint_zigzag_encode(n))
}

pub fn write_varlong<B: WriteBytesExt>(buf: &mut B, n: i64) -> CodecResult<()> {
    write_unsigned_varlong(buf, varlong_zigzag_encode(n))
}

/// Number of bytes [`write_varint`] would emit for `n`, without encoding it.
pub fn size_of_varint(n: i32) -> usize {
    let zz = varint_zigzag_encode(n) as u32;
    size_of_unsigned_varint(zz)
}

/// Number of bytes [`write_varlong`] would emit for `n`, without encoding it.
pub fn size_of_varlong(n: i64) -> usize {
    let zz = varlong_zigzag_encode(n) as u64;
    size_of_unsigned_varlong(zz)
}

fn size_of_unsigned_varint(v: u32) -> usize {
    let mut res = 1;
    let mut v = v;
    while v >= 0x80 {
        res += 1;
        v >>= 7;
    }
    res
}

fn size_of_unsigned_varlong(v: u64) -> usize {
    let mut res = 1;
    let mut v = v;
    while v >= 0x80 {
        res += 1;
        v >>= 7;
    }
    res
}

pub(crate) fn read_bytes<B: ReadBytesExt>(buf: &mut B, len: i32) -> CodecResult<Option<Vec<u8>>> {
    match len {
        -1 => Ok(None),
        n if n >= 0 => {
            let n = n as usize;
            let mut v = vec![0; n];
            buf.read_exact(&mut v)
                .map_err(|e| crate::error::err_corrupt(format!("failed to read {n} bytes: {e}")))?;
            Ok(Some(v))
        }
        n => Err(crate::error::err_corrupt(format!("invalid length: {n}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    // mirrors the reference varint fixture table used across the Kafka client ecosystem
    const VARLONG_DATA: &[(&[u8], i64)] = &[
        (&[0x00], 0),
        (&[0x01], -1),
        (&[0x02], 1),
        (&[0x7E], 63),
        (&[0x7F], -64),
        (&[0x80, 0x01], 64),
        (&[0x81, 0x01], -65),
        (&[0xFE, 0x7F], 8191),
        (&[0xFF, 0x7F], -8192),
        (&[0x80, 0x80, 0x01], 8192),
        (&[0x81, 0x80, 0x01], -8193),
        (&[0xFE, 0xFF, 0x7F], 1048575),
        (&[0xFF, 0xFF, 0x7F], -1048576),
        (&[0x80, 0x80, 0x80, 0x01], 1048576),
        (&[0x81, 0x80, 0x80, 0x01], -1048577),
        (&[0xFE, 0xFF, 0xFF, 0x7F], 134217727),
        (&[0xFF, 0xFF, 0xFF, 0x7F], -134217728),
        (&[0x80, 0x80, 0x80, 0x80, 0x01], 134217728),
        (&[0x81, 0x80, 0x80, 0x80, 0x01], -134217729),
        (&[0xFE, 0xFF, 0xFF, 0xFF, 0x7F], 17179869183),
        (&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F], -17179869184),
        (&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01], 17179869184),
        (&[0x81, 0x80, 0x80, 0x80, 0x80, 0x01], -17179869185),
        (&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], 2199023255551),
        (&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], -2199023255552),
        (&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01], 2199023255552),
        (&[0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01], -2199023255553),
        (&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], 281474976710655),
        (&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], -281474976710656),
        (&[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01], 281474976710656),
        (&[0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01], -281474976710657),
        (&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], 36028797018963967),
        (&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F], -36028797018963968),
        (
            &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01],
            36028797018963968,
        ),
        (
            &[0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01],
            -36028797018963969,
        ),
        (
            &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F],
            4611686018427387903,
        ),
        (
            &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F],
            -4611686018427387904,
        ),
        (
            &[0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01],
            4611686018427387904,
        ),
        (
            &[0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x01],
            -4611686018427387905,
        ),
    ];

    #[test]
    fn test_varlong_table_round_trip() {
        for (bytes, value) in VARLONG_DATA {
            let mut cursor = Cursor::new(*bytes);
            let decoded = read_varlong(&mut cursor).unwrap();
            assert_eq!(decoded, *value, "decoding {bytes:?}");

            let mut out = vec![];
            write_varlong(&mut out, *value).unwrap();
            assert_eq!(&out, bytes, "encoding {value}");
            assert_eq!(out.len(), size_of_varlong(*value));
        }
    }

    #[test]
    fn test_varint_table_round_trip() {
        for (bytes, value) in VARLONG_DATA {
            if *value < i32::MIN as i64 || *value > i32::MAX as i64 {
                continue;
            }
            let value = *value as i32;
            let mut cursor = Cursor::new(*bytes);
            assert_eq!(read_varint(&mut cursor).unwrap(), value, "decoding {bytes:?}");

            let mut out = vec![];
            write_varint(&mut out, value).unwrap();
            assert_eq!(&out, bytes, "encoding {value}");
            assert_eq!(out.len(), size_of_varint(value));
        }
    }

    #[test]
    fn test_varint_i32_extremes() {
        for n in [0i32, 1, -1, i32::MAX, i32::MIN, 12345, -987654] {
            let mut out = vec![];
            write_varint(&mut out, n).unwrap();
            assert_eq!(out.len(), size_of_varint(n));
            let mut cursor = Cursor::new(out);
            assert_eq!(read_varint(&mut cursor).unwrap(), n);
        }
    }
}
