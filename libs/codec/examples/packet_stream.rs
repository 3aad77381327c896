//! Parse a stream of framed packets delivered in arbitrary fragments
//!
//! Run with `RUST_LOG=codec=trace` to watch suspensions and resumptions.

use bytes::Bytes;
use codec::{Callbacks, Len, SchemaBuilder, SchemaResult, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn packet(kind: u8, sequence: u32, body: &[u8]) -> Vec<u8> {
    let mut out = vec![kind];
    out.extend_from_slice(&sequence.to_le_bytes());
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn main() -> SchemaResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let schema = SchemaBuilder::new()
        .uint8("kind")
        .uint32("sequence")
        .uint16("len")
        .internal()
        .switch("kind", |s| {
            s.case(1, |b| b.text_dyn("message", "len"))
                .case(2, |b| {
                    b.uint8("count")
                        .internal()
                        .array("samples", Len::Field("count"), |e| e.int16("sample"))
                })
                .otherwise(|b| b.bytes_dyn("opaque", "len"))
        })
        .compile()?;
    info!("compiled schema\n{schema}");

    let callbacks = Callbacks::new()
        .on("sequence", |value| info!(%value, "sequence"))
        .on("message", |value| info!(%value, "message"))
        .on("samples", |value| {
            let samples: Vec<i64> = value
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(|element| element.get("sample").and_then(Value::as_i64))
                .collect();
            info!(?samples, "samples");
        })
        .on("opaque", |value| info!(%value, "opaque"))
        .on_record_end(|| info!("record complete"));
    let mut parser = schema.parser_with_callbacks(callbacks)?;

    let mut wire = packet(1, 7, b"hello, stream");
    wire.extend(packet(2, 8, &[3, 0x10, 0x00, 0xff, 0xff, 0x00, 0x80]));
    wire.extend(packet(9, 9, &[0xde, 0xad, 0xbe, 0xef]));

    // Fragments the way a socket might hand them over
    for fragment in wire.chunks(5) {
        let fragment = Bytes::copy_from_slice(fragment);
        if let Err(err) = parser.feed(&fragment) {
            tracing::error!(%err, "stream failed");
            break;
        }
    }
    info!(resume_id = %parser.resume_id(), "stream drained");
    Ok(())
}
