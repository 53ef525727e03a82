//! Criterion benchmarks for the HME wire codec.
//!
//! Measures varint, dictionary and chunk-framing throughput, plus the encode
//! and decode cost of the commands an application sends most often.
//!
//! Run with:
//! ```bash
//! cargo bench --package hme-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hme_core::protocol::codec::{write_dict, write_vint, Reader};
use hme_core::protocol::framing::{encode_chunked, read_chunked};
use hme_core::protocol::messages::{decode_command, decode_event, encode_command, encode_event};
use hme_core::{ids, Command, Dict, DictValue, Event, KeyAction};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn make_view_add() -> Command {
    Command::ViewAdd {
        parent: ids::ROOT_VIEW,
        x: 64,
        y: 48,
        width: 512,
        height: 384,
        visible: true,
    }
}

fn make_set_bounds() -> Command {
    Command::ViewSetBounds {
        x: 100,
        y: 200,
        width: 320,
        height: 40,
        animation: ids::NULL,
    }
}

fn make_add_text() -> Command {
    Command::AddText {
        font: 2049,
        color: 2050,
        text: "The quick brown fox jumps over the lazy dog".to_string(),
    }
}

fn make_params(entries: usize) -> Dict {
    let mut dict = Dict::new();
    for i in 0..entries {
        dict.insert(format!("key{i:03}"), DictValue::Text(format!("value-{i}")));
    }
    dict
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");
    for value in [0i64, 63, -64, 8191, 1 << 40, i64::MIN] {
        group.bench_with_input(BenchmarkId::new("encode", value), &value, |b, &value| {
            b.iter(|| {
                let mut buf = Vec::with_capacity(10);
                write_vint(&mut buf, black_box(value));
                buf
            })
        });
        let mut bytes = Vec::new();
        write_vint(&mut bytes, value);
        group.bench_with_input(BenchmarkId::new("decode", value), &bytes, |b, bytes| {
            b.iter(|| Reader::new(black_box(bytes)).read_vint().expect("decode"))
        });
    }
    group.finish();
}

fn bench_dict(c: &mut Criterion) {
    let mut group = c.benchmark_group("dict");
    for entries in [1usize, 16, 128] {
        let dict = make_params(entries);
        group.bench_with_input(BenchmarkId::new("encode", entries), &dict, |b, dict| {
            b.iter(|| {
                let mut buf = Vec::new();
                write_dict(&mut buf, black_box(dict));
                buf
            })
        });
        let mut bytes = Vec::new();
        write_dict(&mut bytes, &dict);
        group.bench_with_input(BenchmarkId::new("decode", entries), &bytes, |b, bytes| {
            b.iter(|| Reader::new(black_box(bytes)).read_dict().expect("decode"))
        });
    }
    group.finish();
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");
    for size in [16usize, 0xFFFE, 256 * 1024] {
        let data = vec![0x5Au8; size];
        group.bench_with_input(BenchmarkId::new("encode", size), &data, |b, data| {
            b.iter(|| encode_chunked(black_box(data)))
        });
        let framed = encode_chunked(&data);
        group.bench_with_input(BenchmarkId::new("read", size), &framed, |b, framed| {
            b.iter(|| read_chunked(&mut black_box(framed.as_slice())).expect("read"))
        });
    }
    group.finish();
}

/// Encode and decode of the commands sent on every screen update.
fn bench_commands(c: &mut Criterion) {
    let commands = [
        ("ViewAdd", make_view_add()),
        ("ViewSetBounds", make_set_bounds()),
        ("AddText", make_add_text()),
    ];
    let mut group = c.benchmark_group("command");
    for (name, command) in commands {
        group.bench_with_input(BenchmarkId::new("encode", name), &command, |b, command| {
            b.iter(|| encode_command(black_box(2048), black_box(command)).expect("encode"))
        });
        let bytes = encode_command(2048, &command).expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| decode_command(black_box(bytes)).expect("decode"))
        });
    }
    group.finish();
}

fn bench_key_event(c: &mut Criterion) {
    let bytes = encode_event(&Event::Key {
        resource: ids::ROOT_STREAM,
        action: KeyAction::Press,
        code: 33,
        rawcode: 0,
    });
    c.bench_function("decode_key_event", |b| {
        b.iter(|| decode_event(black_box(&bytes)).expect("decode"))
    });
}

criterion_group!(
    benches,
    bench_varint,
    bench_dict,
    bench_framing,
    bench_commands,
    bench_key_event
);
criterion_main!(benches);
