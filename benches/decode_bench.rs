//! Criterion benchmarks for minipb
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use minipb::*;

fn schema() -> Arc<Schema> {
    let mut b = SchemaBuilder::new();
    let batch = b.message("Batch");
    let trade = b.message("Trade");
    b.field(batch, FieldSpec::new(1, "trades", FieldType::Message(trade)).repeated())
        .field(batch, FieldSpec::new(2, "venue", FieldType::String));
    b.field(trade, FieldSpec::new(1, "seq", FieldType::UInt32))
        .field(trade, FieldSpec::new(2, "ts_ns", FieldType::Fixed64))
        .field(trade, FieldSpec::new(3, "price", FieldType::SInt64))
        .field(trade, FieldSpec::new(4, "qty", FieldType::UInt32))
        .field(trade, FieldSpec::new(5, "symbol", FieldType::String))
        .field(trade, FieldSpec::new(6, "fills", FieldType::Int32).repeated());
    b.build().unwrap()
}

fn batch(schema: &Schema, trades: usize) -> Vec<u8> {
    let layout = &schema.messages()[0];
    let trade = &schema.messages()[1];
    let f = |n| trade.field_by_number(n).unwrap();

    let mut msg = layout.new_message();
    msg.set(layout.field_by_number(2).unwrap(), Value::string(b"XNAS"))
        .unwrap();
    for i in 0..trades {
        let t = msg
            .append_message(layout.field_by_number(1).unwrap(), schema)
            .unwrap();
        t.set(f(1), Value::UInt32(i as u32)).unwrap();
        t.set(f(2), Value::UInt64(1_700_000_000_000_000_000 + i as u64 * 1000))
            .unwrap();
        t.set(f(3), Value::Int64(50_000_000 + (i as i64 % 10_000) - 5_000))
            .unwrap();
        t.set(f(4), Value::UInt32(1 + (i as u32 % 999))).unwrap();
        if i % 4 == 0 {
            t.set(f(5), Value::string(["AAPL", "TSLA", "MSFT", "GOOGL"][(i / 4) % 4].as_bytes()))
                .unwrap();
        }
        for k in 0..(i % 3) {
            t.append(f(6), Value::Int32(k as i32)).unwrap();
        }
    }
    encode(&msg, schema).unwrap()
}

fn bench_decode(c: &mut Criterion) {
    let schema = schema();
    let bytes = batch(&schema, 64);
    let layout = &schema.messages()[0];

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("fresh_message", |b| {
        b.iter(|| {
            let mut msg = layout.new_message();
            decode(black_box(&bytes), &mut msg, &schema, &mut Arena::new()).unwrap();
            black_box(msg);
        });
    });

    let mut msg = layout.new_message();
    let mut arena = Arena::new();
    group.bench_function("recycled_message", |b| {
        b.iter(|| {
            msg.clear();
            decode(black_box(&bytes), &mut msg, &schema, &mut arena).unwrap();
        });
    });

    let generic = DecodeOptions {
        fast_path: false,
        ..DecodeOptions::default()
    };
    let mut msg = layout.new_message();
    group.bench_function("recycled_generic_only", |b| {
        b.iter(|| {
            msg.clear();
            decode_with(black_box(&bytes), &mut msg, &schema, &mut arena, &generic).unwrap();
        });
    });

    let mut msg = layout.new_message();
    let mut bulk = Arena::with_ownership(Ownership::Arena);
    group.bench_function("arena_ownership", |b| {
        b.iter(|| {
            msg.clear();
            decode(black_box(&bytes), &mut msg, &schema, &mut bulk).unwrap();
            bulk.reset();
        });
    });

    group.finish();
}

fn bench_batch_sizes(c: &mut Criterion) {
    let schema = schema();
    let layout = &schema.messages()[0];
    let mut group = c.benchmark_group("batch_sizes");

    for trades in [1, 16, 256, 4096] {
        let bytes = batch(&schema, trades);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        let mut msg = layout.new_message();
        let mut arena = Arena::new();
        group.bench_with_input(BenchmarkId::new("decode_recycled", trades), &bytes, |b, bytes| {
            b.iter(|| {
                msg.clear();
                decode(black_box(bytes), &mut msg, &schema, &mut arena).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_encode_and_copy(c: &mut Criterion) {
    let schema = schema();
    let bytes = batch(&schema, 64);
    let layout = &schema.messages()[0];
    let mut msg = layout.new_message();
    decode(&bytes, &mut msg, &schema, &mut Arena::new()).unwrap();

    c.bench_function("encode_batch", |b| {
        let mut encoder = WireEncoder::new();
        let mut status = Status::new();
        b.iter(|| {
            run_handlers(black_box(&msg), &schema, &mut encoder, &mut status);
            black_box(encoder.as_slice().len());
        });
    });

    c.bench_function("copy_batch", |b| {
        let mut target = Some(layout.new_message());
        let mut status = Status::new();
        b.iter(|| {
            let mut dest = target.take().unwrap_or_else(|| layout.new_message());
            dest.clear();
            let mut sink = CopySink::new(&schema, dest);
            run_handlers(black_box(&msg), &schema, &mut sink, &mut status);
            target = Some(sink.into_message());
        });
    });
}

criterion_group!(
    benches,
    bench_decode,
    bench_batch_sizes,
    bench_encode_and_copy
);
criterion_main!(benches);
