//! Field primitives decoded end to end, whole and split across reads

mod common;

use bytes::Bytes;
use codec::{SchemaBuilder, Uuid, Value};
use common::{events_chunked, events_whole, field, Event, Recorder};
use hex_literal::hex;

#[test]
fn test_little_endian_vectors() {
    let schema = SchemaBuilder::new()
        .uint16("short")
        .uint64("wide")
        .uint8("byte")
        .compile()
        .unwrap();

    let input = hex!("ff ed 21 43 65 87 a9 cb ed ff ff");
    let expected = vec![
        field("short", 0xffedu64),
        field("wide", 0xffed_cba9_8765_4321u64),
        field("byte", 255u64),
        Event::RecordEnd,
    ];
    assert_eq!(events_whole(&schema, &input), expected);
    assert_eq!(events_chunked(&schema, &input, &[1]), expected);
}

#[test]
fn test_wide_values_are_exact() {
    // Above 2^53 a float would round; u64 must not
    let schema = SchemaBuilder::new().uint64("v").compile().unwrap();
    let input = hex!("01 00 00 00 00 00 20 00");
    let events = events_whole(&schema, &input);
    assert_eq!(events[0], field("v", (1u64 << 53) + 1));
}

#[test]
fn test_odd_widths_and_signed_values() {
    let schema = SchemaBuilder::new()
        .uint("u24", 3)
        .int("i24", 3)
        .int8("i8")
        .int64("i64")
        .compile()
        .unwrap();
    let input = hex!("01 02 03  fe ff ff  80  ff ff ff ff ff ff ff ff");
    let expected = vec![
        field("u24", 0x030201u64),
        field("i24", -2i64),
        field("i8", -128i64),
        field("i64", -1i64),
        Event::RecordEnd,
    ];
    assert_eq!(events_chunked(&schema, &input, &[2, 3]), expected);
}

#[test]
fn test_uuid_structured_and_text() {
    let schema = SchemaBuilder::new()
        .uuid("id")
        .uuid_text("trace")
        .compile()
        .unwrap();
    let raw = hex!("67 e5 50 44 10 b1 42 6f 92 47 bb 68 0e 5f e0 c8");
    let mut input = raw.to_vec();
    input.extend_from_slice(&raw);

    let chunkings: [&[usize]; 3] = [&[32], &[1], &[5, 11]];
    for sizes in chunkings {
        let events = events_chunked(&schema, &input, sizes);
        assert_eq!(events[0], field("id", Uuid::from_bytes(raw)));
        assert_eq!(
            events[1],
            field("trace", "67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
    }
}

#[test]
fn test_fixed_length_bytes_and_text() {
    let schema = SchemaBuilder::new()
        .bytes("magic", 4)
        .text("name", 5)
        .bytes("none", 0)
        .compile()
        .unwrap();
    let input = b"FWR1hello";
    let expected = vec![
        field("magic", Bytes::from_static(b"FWR1")),
        field("name", "hello"),
        field("none", Bytes::new()),
        Event::RecordEnd,
    ];
    assert_eq!(events_whole(&schema, input), expected);
    assert_eq!(events_chunked(&schema, input, &[3]), expected);
}

#[test]
fn test_complete_range_is_a_slice_of_the_input() {
    let schema = SchemaBuilder::new().bytes("payload", 4).compile().unwrap();
    let input = Bytes::from_static(b"\x00abcd");
    let mut parser = schema.parser(Recorder::default());
    assert_eq!(parser.read_one(&input, 1, 5).unwrap(), 5);

    let values = parser.sink().values("payload");
    let payload = values[0].as_bytes().unwrap();
    // Zero-copy: the value points into the caller's buffer
    assert_eq!(payload.as_ptr(), input[1..].as_ptr());
}

#[test]
fn test_invalid_utf8_is_replaced() {
    let schema = SchemaBuilder::new().text("name", 3).compile().unwrap();
    let events = events_chunked(&schema, b"a\xffb", &[1]);
    assert_eq!(events[0], field("name", "a\u{fffd}b"));
}

#[test]
fn test_large_split_buffer_uses_bulk_join() {
    let schema = SchemaBuilder::new().bytes("blob", 300).compile().unwrap();
    let input: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
    let events = events_chunked(&schema, &input, &[7, 64, 1]);
    assert_eq!(events[0], field("blob", input.clone()));
}

#[test]
fn test_derived_fields_consume_nothing() {
    let schema = SchemaBuilder::new()
        .constant("version", 3u8)
        .uint16("flags")
        .mask("kind", "flags", 0x00f0)
        .flag("urgent", "flags", 0x8000)
        .flag("ack", "flags", 0x0001)
        .computed("kind_shifted", &["kind"], |inputs| {
            Value::UInt(inputs[0].as_u64().unwrap_or(0) >> 4)
        })
        .uint8("tail")
        .compile()
        .unwrap();

    let events = events_whole(&schema, &hex!("a0 80 07"));
    assert_eq!(
        events,
        vec![
            field("version", 3u64),
            field("flags", 0x80a0u64),
            field("kind", 0xa0u64),
            field("urgent", true),
            field("ack", false),
            field("kind_shifted", 0x0au64),
            field("tail", 7u64),
            Event::RecordEnd,
        ]
    );
}

#[test]
fn test_internal_fields_are_readable_but_silent() {
    let schema = SchemaBuilder::new()
        .uint8("len")
        .internal()
        .text_dyn("name", "len")
        .compile()
        .unwrap();
    assert_eq!(schema.fields().collect::<Vec<_>>(), vec!["name"]);

    let events = events_whole(&schema, b"\x02hi");
    assert_eq!(events, vec![field("name", "hi"), Event::RecordEnd]);
}
