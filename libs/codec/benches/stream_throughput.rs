//! Stream throughput for whole buffers versus socket-sized fragments
//!
//! The fragmented cases measure what suspension and resumption cost compared
//! with the straight-line path through a record.

use bytes::Bytes;
use codec::{CompiledSchema, FieldRef, Len, SchemaBuilder, Sink, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

/// Counts deliveries without retaining values
#[derive(Default)]
struct CountingSink {
    fields: usize,
    records: usize,
}

impl Sink for CountingSink {
    fn field(&mut self, _field: FieldRef<'_>, value: &Value) {
        black_box(value);
        self.fields += 1;
    }

    fn record_end(&mut self) {
        self.records += 1;
    }
}

/// Tagged market-data style frame: header, optional body, level list
fn frame_schema() -> CompiledSchema {
    SchemaBuilder::new()
        .uint8("kind")
        .uint32("sequence")
        .uint64("timestamp_ns")
        .uint16("flags")
        .flag("snapshot", "flags", 0x0001)
        .switch("kind", |s| {
            s.case(1, |b| b.uuid("instrument"))
                .case(2, |b| b.uint8("name_len").internal().text_dyn("venue", "name_len"))
                .otherwise(|b| b.uint32("raw"))
        })
        .uint8("levels")
        .internal()
        .array("book", Len::Field("levels"), |e| e.int64("price").uint64("size"))
        .compile()
        .expect("frame schema compiles")
}

fn frame(kind: u8, sequence: u32) -> Vec<u8> {
    let mut out = vec![kind];
    out.extend_from_slice(&sequence.to_le_bytes());
    out.extend_from_slice(&1_700_000_000_000_000_000u64.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    match kind {
        1 => out.extend_from_slice(&[0x5a; 16]),
        2 => {
            out.push(8);
            out.extend_from_slice(b"exchange");
        }
        _ => out.extend_from_slice(&[0; 4]),
    }
    out.push(4);
    for level in 0..4i64 {
        out.extend_from_slice(&(100_000 + level).to_le_bytes());
        out.extend_from_slice(&(level as u64 * 10).to_le_bytes());
    }
    out
}

fn stream(records: u32) -> Bytes {
    let data: Vec<u8> = (0..records)
        .flat_map(|sequence| frame((sequence % 3) as u8, sequence))
        .collect();
    Bytes::from(data)
}

fn run_chunked(schema: &CompiledSchema, data: &Bytes, chunk: usize) -> usize {
    let mut parser = schema.parser(CountingSink::default());
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + chunk).min(data.len());
        parser
            .read_many(data, offset, end)
            .expect("benchmark stream parses");
        offset = end;
    }
    parser.into_sink().records
}

fn bench_whole_buffer(c: &mut Criterion) {
    let schema = frame_schema();
    let data = stream(1_000);

    let mut group = c.benchmark_group("whole_buffer");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("read_many", |b| {
        b.iter(|| {
            let mut parser = schema.parser(CountingSink::default());
            parser.read_many(black_box(&data), 0, data.len()).unwrap();
            black_box(parser.into_sink().fields)
        });
    });
    group.bench_function("read_one_loop", |b| {
        b.iter(|| {
            let mut parser = schema.parser(CountingSink::default());
            let mut offset = 0;
            while offset < data.len() {
                offset = parser.read_one(black_box(&data), offset, data.len()).unwrap();
            }
            black_box(parser.into_sink().records)
        });
    });
    group.finish();
}

fn bench_fragmented(c: &mut Criterion) {
    let schema = frame_schema();
    let data = stream(1_000);

    let mut group = c.benchmark_group("fragmented");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for chunk in [1usize, 7, 64, 1460] {
        group.bench_function(format!("chunk_{chunk}"), |b| {
            b.iter(|| black_box(run_chunked(&schema, &data, chunk)));
        });
    }
    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile_frame_schema", |b| {
        b.iter(|| black_box(frame_schema()));
    });
}

criterion_group!(benches, bench_whole_buffer, bench_fragmented, bench_compile);
criterion_main!(benches);
