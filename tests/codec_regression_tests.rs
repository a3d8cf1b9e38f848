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

//! Regression tests against real batch bytes captured off a Kafka 11
//! broker, plus cross-module round trips that the per-file unit tests
//! don't cover on their own.

use kafka_records::records::default_batch::RecordBatchReader;
use kafka_records::records::legacy_batch::LegacyRecordBatchReader;
use kafka_records::records::legacy_batch::LegacyRecordBatchWriter;
use kafka_records::BatchIterator;
use kafka_records::CompressionType;
use kafka_records::Header;
use kafka_records::Record;
use kafka_records::RecordBatchWriter;

// Real live data from a Kafka 11 broker: three consecutive v2 batches,
// base offsets 0, 1 and 3, none compressed.
const BATCH_0: &[u8] = &[
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3B, 0x00, 0x00, 0x00, 0x01,
    0x02, 0x03, 0x18, 0xA2, 0x70, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x5D, 0xFF,
    0x7B, 0x06, 0x3C, 0x00, 0x00, 0x01, 0x5D, 0xFF, 0x7B, 0x06, 0x3C, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01, 0x12, 0x00, 0x00,
    0x00, 0x01, 0x06, 0x31, 0x32, 0x33, 0x00,
];
const BATCH_1: &[u8] = &[
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00, 0x02,
    0x02, 0xC8, 0x5C, 0xBD, 0x23, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x5D, 0xFF,
    0x7C, 0xDD, 0x6C, 0x00, 0x00, 0x01, 0x5D, 0xFF, 0x7C, 0xDE, 0x14, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x02, 0x0C, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x00, 0x0E, 0x00, 0xD0, 0x02, 0x02, 0x01, 0x00, 0x00,
];
const BATCH_2: &[u8] = &[
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x3B, 0x00, 0x00, 0x00, 0x02,
    0x02, 0x2E, 0x0B, 0x85, 0xB7, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x5D, 0xFF,
    0x7C, 0xE7, 0x9D, 0x00, 0x00, 0x01, 0x5D, 0xFF, 0x7C, 0xE7, 0x9D, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01, 0x12, 0x00, 0x00,
    0x00, 0x01, 0x06, 0x31, 0x32, 0x33, 0x00,
];

fn expect(offset: i64, timestamp: i64, value: &[u8]) -> (i64, i64, Option<Vec<u8>>) {
    (offset, timestamp, Some(value.to_vec()))
}

fn actual(records: &[Record]) -> Vec<(i64, i64, Option<Vec<u8>>)> {
    records
        .iter()
        .map(|r| (r.offset, r.timestamp.expect("v2 records always carry a timestamp"), r.value.clone()))
        .collect()
}

#[test]
fn test_read_broker_captured_batches_individually() {
    let reader = RecordBatchReader::new(BATCH_0).unwrap();
    assert_eq!(actual(&reader.records().unwrap()), vec![expect(0, 1503229838908, b"123")]);

    let reader = RecordBatchReader::new(BATCH_1).unwrap();
    assert_eq!(
        actual(&reader.records().unwrap()),
        vec![expect(1, 1503229959532, b""), expect(2, 1503229959700, b"")]
    );

    let reader = RecordBatchReader::new(BATCH_2).unwrap();
    assert_eq!(actual(&reader.records().unwrap()), vec![expect(3, 1503229962141, b"123")]);
}

#[test]
fn test_iterate_broker_captured_concatenation() {
    let mut buf = Vec::new();
    buf.extend_from_slice(BATCH_0);
    buf.extend_from_slice(BATCH_1);
    buf.extend_from_slice(BATCH_2);

    let iter = BatchIterator::new(&buf).unwrap();
    let batches: Vec<_> = iter.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(batches.len(), 3);

    let all_records: Vec<_> = batches.iter().flat_map(|b| b.records().unwrap()).collect();
    assert_eq!(
        actual(&all_records),
        vec![
            expect(0, 1503229838908, b"123"),
            expect(1, 1503229959532, b""),
            expect(2, 1503229959700, b""),
            expect(3, 1503229962141, b"123"),
        ]
    );
}

#[test]
fn test_default_batch_round_trip_every_compression() {
    for compression_type in [
        CompressionType::None,
        CompressionType::Gzip,
        CompressionType::Snappy,
        CompressionType::Lz4,
    ] {
        let mut writer = RecordBatchWriter::new(compression_type, true, 123456, 123, 9999, 10_100_010);
        let headers =
            vec![Header { key: "header1".into(), value: Some(b"aaa".to_vec()) }, Header {
                key: "header2".into(),
                value: Some(b"bbb".to_vec()),
            }];
        for offset in 0..10i64 {
            assert!(writer
                .append(offset, 9999999, Some(b"test"), Some(b"Super"), headers.clone())
                .unwrap());
        }
        let buf = writer.build().unwrap();

        let reader = RecordBatchReader::new(&buf).unwrap();
        reader.validate_crc().unwrap();
        assert!(reader.is_transactional());
        assert_eq!(reader.compression_type().unwrap(), compression_type);
        assert_eq!(reader.magic(), 2);
        assert_eq!(reader.base_offset(), 0);

        let records = reader.records().unwrap();
        for (offset, record) in records.iter().enumerate() {
            assert_eq!(record.offset, offset as i64);
            assert_eq!(record.timestamp, Some(9999999));
            assert_eq!(record.key.as_deref(), Some(b"test".as_slice()));
            assert_eq!(record.value.as_deref(), Some(b"Super".as_slice()));
            assert_eq!(record.headers, headers);
        }
    }
}

#[test]
fn test_legacy_batch_round_trip_every_magic_and_compression() {
    for magic in [0i8, 1] {
        for compression_type in [
            CompressionType::None,
            CompressionType::Gzip,
            CompressionType::Snappy,
            CompressionType::Lz4,
        ] {
            let mut writer = LegacyRecordBatchWriter::new(magic, compression_type, 1_000_000);
            for offset in 0..10i64 {
                assert!(writer.append(offset, 9999999, Some(b"test"), Some(b"Super"), &[]).unwrap());
            }
            let buf = writer.build().unwrap();

            let reader = LegacyRecordBatchReader::new(&buf).unwrap();
            let records = reader.records().unwrap();
            let expected_timestamp = if magic == 1 { Some(9999999) } else { None };
            for (offset, record) in records.iter().enumerate() {
                assert_eq!(record.offset, offset as i64);
                assert_eq!(record.timestamp, expected_timestamp);
                assert_eq!(record.key.as_deref(), Some(b"test".as_slice()));
                assert_eq!(record.value.as_deref(), Some(b"Super".as_slice()));
            }
        }
    }
}
