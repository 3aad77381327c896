//! Shared helpers for codec integration tests

#![allow(dead_code)]

use bytes::Bytes;
use codec::{CompiledSchema, FieldRef, ParseResult, Parser, Sink, Value};

/// One delivered parse event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Field(String, Value),
    RecordEnd,
}

/// Sink that records every event in order
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl Sink for Recorder {
    fn field(&mut self, field: FieldRef<'_>, value: &Value) {
        self.events
            .push(Event::Field(field.name.to_string(), value.clone()));
    }

    fn record_end(&mut self) {
        self.events.push(Event::RecordEnd);
    }
}

impl Recorder {
    /// Values delivered for `name`, in order
    pub fn values(&self, name: &str) -> Vec<Value> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Field(field, value) if field == name => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Field(field, _) => Some(field.as_str()),
                Event::RecordEnd => None,
            })
            .collect()
    }

    pub fn records(&self) -> usize {
        self.events
            .iter()
            .filter(|event| **event == Event::RecordEnd)
            .count()
    }
}

pub fn field(name: &str, value: impl Into<Value>) -> Event {
    Event::Field(name.to_string(), value.into())
}

/// Feed `data` as independent buffers of the given sizes, cycling through
/// `sizes`; every buffer is a fresh allocation, as a socket would deliver it
pub fn feed_chunked<S: Sink>(parser: &mut Parser<S>, data: &[u8], sizes: &[usize]) -> ParseResult<()> {
    let mut offset = 0;
    let mut sizes = sizes.iter().copied().filter(|&n| n > 0).cycle();
    while offset < data.len() {
        let size = sizes.next().unwrap_or(data.len());
        let end = (offset + size).min(data.len());
        let chunk = Bytes::copy_from_slice(&data[offset..end]);
        parser.read_many(&chunk, 0, chunk.len())?;
        offset = end;
    }
    Ok(())
}

/// Events from a single whole-buffer call
pub fn events_whole(schema: &CompiledSchema, data: &[u8]) -> Vec<Event> {
    let mut parser = schema.parser(Recorder::default());
    let bytes = Bytes::copy_from_slice(data);
    parser
        .read_many(&bytes, 0, bytes.len())
        .expect("whole-buffer parse");
    parser.into_sink().events
}

/// Events when the input arrives in chunks of the given sizes
pub fn events_chunked(schema: &CompiledSchema, data: &[u8], sizes: &[usize]) -> Vec<Event> {
    let mut parser = schema.parser(Recorder::default());
    feed_chunked(&mut parser, data, sizes).expect("chunked parse");
    parser.into_sink().events
}
