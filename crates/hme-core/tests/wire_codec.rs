//! Integration tests for the HME wire codec and chunk framing.
//!
//! These exercise the public codec API end to end: varints, length-prefixed
//! data, dictionaries and framed messages.

use std::io::Cursor;

use hme_core::protocol::codec::{write_dict, write_vdata, write_vint, write_vuint, Reader};
use hme_core::protocol::framing::{chunk_count, encode_chunked, read_chunked, MAX_CHUNK_SIZE};
use hme_core::{Dict, DictValue};

#[test]
fn test_signed_varint_round_trip_across_magnitudes() {
    let mut values = vec![0i64, 1, -1, i64::MAX, i64::MIN];
    for shift in 0..63 {
        let v = 1i64 << shift;
        values.extend([v, -v, v - 1, -(v - 1), v + 1]);
    }
    for value in values {
        let mut buf = Vec::new();
        write_vint(&mut buf, value);
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.read_vint().expect("decode"), value, "value {value}");
        assert!(reader.is_empty(), "all bytes consumed for {value}");
    }
}

#[test]
fn test_unsigned_varint_round_trip_across_magnitudes() {
    let mut values = vec![0u64, u64::MAX];
    for shift in 0..64 {
        let v = 1u64 << shift;
        values.extend([v, v - 1, v.wrapping_add(1)]);
    }
    for value in values {
        let mut buf = Vec::new();
        write_vuint(&mut buf, value);
        assert_eq!(Reader::new(&buf).read_vuint().expect("decode"), value);
    }
}

#[test]
fn test_length_prefixed_data_round_trip_including_chunk_boundaries() {
    for len in [0, 1, 127, 128, MAX_CHUNK_SIZE - 1, MAX_CHUNK_SIZE, MAX_CHUNK_SIZE + 1] {
        // Arrange
        let data: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
        let mut buf = Vec::new();
        write_vdata(&mut buf, &data);

        // Act: frame it, reassemble it, then decode the prefixed block
        let framed = encode_chunked(&buf);
        let body = read_chunked(&mut Cursor::new(framed)).expect("reassemble");
        let decoded = Reader::new(&body).read_vdata().expect("decode");

        // Assert
        assert_eq!(decoded, data, "length {len}");
    }
}

#[test]
fn test_chunk_framing_sizes_produce_expected_chunk_counts() {
    let cases = [
        (0, 0),
        (1, 1),
        (MAX_CHUNK_SIZE, 1),
        (MAX_CHUNK_SIZE + 1, 2),
        (3 * MAX_CHUNK_SIZE, 3),
    ];
    for (size, expected_chunks) in cases {
        // Arrange
        let data: Vec<u8> = (0..size).map(|i| (i % 253) as u8).collect();

        // Act
        let framed = encode_chunked(&data);

        // Assert: walk the headers and count non-terminator chunks
        let mut offset = 0;
        let mut chunks = 0;
        loop {
            let len = usize::from(u16::from_be_bytes([framed[offset], framed[offset + 1]]));
            offset += 2;
            if len == 0 {
                break;
            }
            assert!(len <= MAX_CHUNK_SIZE);
            chunks += 1;
            offset += len;
        }
        assert_eq!(offset, framed.len(), "terminator is last for size {size}");
        assert_eq!(chunks, expected_chunks, "size {size}");
        assert_eq!(chunk_count(size), expected_chunks);
        assert_eq!(read_chunked(&mut Cursor::new(framed)).expect("read"), data);
    }
}

#[test]
fn test_dict_encoding_sorts_keys_regardless_of_insertion_order() {
    // Arrange: two dicts built in opposite orders
    let keys = ["delta", "alpha", "charlie", "bravo"];
    let mut forward = Dict::new();
    for k in keys {
        forward.insert(k.to_string(), DictValue::Text(k.to_uppercase()));
    }
    let mut backward = Dict::new();
    for k in keys.iter().rev() {
        backward.insert(k.to_string(), DictValue::Text(k.to_uppercase()));
    }

    // Act
    let mut a = Vec::new();
    write_dict(&mut a, &forward);
    let mut b = Vec::new();
    write_dict(&mut b, &backward);

    // Assert: identical bytes, keys in ascending order
    assert_eq!(a, b);
    let mut reader = Reader::new(&a);
    let mut seen = Vec::new();
    loop {
        let key = reader.read_string().expect("key");
        if key.is_empty() {
            break;
        }
        assert_eq!(reader.read_u8().expect("tag"), 1);
        reader.read_string().expect("value");
        assert_eq!(reader.read_u8().expect("end of items"), 0);
        seen.push(key);
    }
    assert_eq!(seen, vec!["alpha", "bravo", "charlie", "delta"]);
}

#[test]
fn test_dict_decoding_scalars_lists_and_nesting() {
    // Arrange
    let mut nested = Dict::new();
    nested.insert("depth".into(), DictValue::Text("2".into()));
    let mut dict = Dict::new();
    dict.insert("single".into(), DictValue::Text("one".into()));
    dict.insert(
        "many".into(),
        DictValue::List(vec![DictValue::Text("a".into()), DictValue::Dict(nested.clone())]),
    );
    dict.insert("child".into(), DictValue::Dict(nested));

    // Act
    let mut buf = Vec::new();
    write_dict(&mut buf, &dict);
    let decoded = Reader::new(&buf).read_dict().expect("decode");

    // Assert
    assert_eq!(decoded, dict);
    assert_eq!(decoded.get("single").and_then(DictValue::as_text), Some("one"));
    assert!(matches!(decoded.get("many"), Some(DictValue::List(items)) if items.len() == 2));
}
