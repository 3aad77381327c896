//! Value lifetimes across records, callbacks and parser lifecycle

mod common;

use bytes::Bytes;
use codec::{
    Callbacks, CompiledSchema, EngineConfig, Parser, SchemaBuilder, SchemaError, Value,
};
use common::{events_chunked, events_whole, feed_chunked, field, Event, Recorder};
use hex_literal::hex;
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;

fn optional_extra(persistent: bool) -> CompiledSchema {
    let extra = |b: SchemaBuilder| {
        let b = b.uint8("extra");
        if persistent {
            b.persistent()
        } else {
            b
        }
    };
    SchemaBuilder::new()
        .uint8("kind")
        .when("kind", 1u8, extra)
        .computed("extra_seen", &["extra"], |inputs| {
            Value::Bool(!inputs[0].is_empty())
        })
        .compile()
        .unwrap()
}

#[test]
fn test_skipped_branch_reads_empty_in_next_record() {
    let schema = optional_extra(false);
    let input = hex!("01 2a 00 01 09 00");
    let expected = vec![
        field("kind", 1u64),
        field("extra", 42u64),
        field("extra_seen", true),
        Event::RecordEnd,
        field("kind", 0u64),
        field("extra_seen", false),
        Event::RecordEnd,
        field("kind", 1u64),
        field("extra", 9u64),
        field("extra_seen", true),
        Event::RecordEnd,
        field("kind", 0u64),
        field("extra_seen", false),
        Event::RecordEnd,
    ];
    assert_eq!(events_whole(&schema, &input), expected);
    assert_eq!(events_chunked(&schema, &input, &[1]), expected);
}

#[test]
fn test_persistent_value_survives_records_until_reset() {
    let schema = optional_extra(true);
    let mut parser = schema.parser(Recorder::default());
    let input = Bytes::copy_from_slice(&hex!("01 2a 00 00"));

    parser.read_many(&input, 0, input.len()).unwrap();
    assert_eq!(
        parser.sink().values("extra_seen"),
        vec![Value::Bool(true), Value::Bool(true), Value::Bool(true)]
    );
    assert_eq!(parser.value("extra"), Some(&Value::UInt(42)));

    parser.reset();
    assert_eq!(parser.value("extra"), Some(&Value::Empty));
    parser.read_one(&input, 2, input.len()).unwrap();
    assert_eq!(parser.sink().values("extra_seen").last(), Some(&Value::Bool(false)));
}

#[test]
fn test_value_is_visible_until_its_last_reader() {
    let schema = SchemaBuilder::new()
        .uint8("a")
        .uint16("b")
        .computed("sum", &["a", "b"], |inputs| {
            let a = inputs[0].as_u64().unwrap_or(0);
            let b = inputs[1].as_u64().unwrap_or(0);
            Value::UInt(a + b)
        })
        .compile()
        .unwrap();
    let mut parser = schema.parser(Recorder::default());

    // Suspended inside `b`: `a` is still needed by `sum`
    let head = Bytes::copy_from_slice(&hex!("05 01"));
    parser.read_many(&head, 0, head.len()).unwrap();
    assert_eq!(parser.value("a"), Some(&Value::UInt(5)));
    assert_eq!(parser.value("b"), Some(&Value::Empty));
    assert_eq!(parser.value("missing"), None);

    let tail = Bytes::copy_from_slice(&hex!("01"));
    parser.read_many(&tail, 0, tail.len()).unwrap();
    assert_eq!(parser.sink().values("sum"), vec![Value::UInt(5 + 0x0101)]);
    // Record done: nothing carries over
    assert_eq!(parser.value("a"), Some(&Value::Empty));
}

#[test]
fn test_callbacks_and_record_end() {
    let schema = SchemaBuilder::new()
        .uint8("id")
        .text_dyn("name", "id")
        .compile()
        .unwrap();

    let names = Rc::new(RefCell::new(Vec::new()));
    let records = Rc::new(Cell::new(0usize));
    let callbacks = Callbacks::new()
        .on("name", {
            let names = Rc::clone(&names);
            move |value| names.borrow_mut().push(value.as_str().unwrap_or_default().to_string())
        })
        .on_record_end({
            let records = Rc::clone(&records);
            move || records.set(records.get() + 1)
        });

    let mut parser = schema.parser_with_callbacks(callbacks).unwrap();
    feed_chunked(&mut parser, b"\x02hi\x03abc\x00", &[2]).unwrap();
    assert_eq!(*names.borrow(), vec!["hi", "abc", ""]);
    assert_eq!(records.get(), 3);
}

#[test]
fn test_later_callback_replaces_earlier() {
    let schema = SchemaBuilder::new().uint8("v").compile().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::clone(&seen);
    let second = Rc::clone(&seen);
    let callbacks = Callbacks::new()
        .on("v", move |_| first.borrow_mut().push("first"))
        .on("v", move |_| second.borrow_mut().push("second"));

    let mut parser = schema.parser_with_callbacks(callbacks).unwrap();
    parser.feed(&Bytes::from_static(&[1, 2])).unwrap();
    assert_eq!(*seen.borrow(), vec!["second", "second"]);
}

#[test]
fn test_parsers_from_one_schema_are_independent() {
    let schema = SchemaBuilder::new().uint32("v").compile().unwrap();
    let mut a = schema.parser(Recorder::default());
    let mut b = schema.clone().parser(Recorder::default());

    a.feed(&Bytes::from_static(&[1, 0])).unwrap();
    b.feed(&Bytes::from_static(&[2, 0, 0, 0])).unwrap();
    a.feed(&Bytes::from_static(&[0, 0])).unwrap();

    assert_eq!(a.sink().values("v"), vec![Value::UInt(1)]);
    assert_eq!(b.sink().values("v"), vec![Value::UInt(2)]);
}

#[test]
fn test_compiled_schema_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CompiledSchema>();

    let schema = SchemaBuilder::new().uint16("v").compile().unwrap();
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let schema = schema.clone();
            std::thread::spawn(move || {
                let mut parser: Parser<Recorder> = schema.parser(Recorder::default());
                parser.feed(&Bytes::from(vec![i, 0])).unwrap();
                parser.into_sink().values("v")
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![Value::UInt(i as u64)]);
    }
}

#[test]
fn test_config_from_file_applies_to_schema() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "join_copy_threshold = 8\npointer_id_base = 1000").unwrap();
    let config = EngineConfig::from_file(file.path()).unwrap();

    let schema = SchemaBuilder::with_config(config.clone())
        .uint8("tag")
        .when("tag", 1u8, |b| b.bytes("blob", 20))
        .compile()
        .unwrap();
    assert_eq!(schema.config(), &config);
    assert!(schema.to_string().contains("#1000"), "{schema}");

    // Split above the threshold: same value either way
    let mut input = vec![1u8];
    input.extend(0..20u8);
    let expected = events_whole(&schema, &input);
    assert_eq!(events_chunked(&schema, &input, &[3]), expected);
}

#[test]
fn test_schema_errors_surface_at_compile() {
    let err = SchemaBuilder::new().uint8("type").compile().unwrap_err();
    assert_eq!(err, SchemaError::ReservedName { name: "type".into() });

    let err = SchemaBuilder::new()
        .uint8("a")
        .uint8("a")
        .compile()
        .unwrap_err();
    assert_eq!(err, SchemaError::DuplicateName { name: "a".into() });
}
