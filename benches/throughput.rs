use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use wsjtx_relay::{
    adif::{reader::AdiReader, writer::AdiWriter},
    contact::{ContactRecord, FieldValue},
    proto::{MAGIC, frame::FrameWriter, message},
};

fn status_frame() -> Vec<u8> {
    let mut w = FrameWriter::new();
    w.u32(MAGIC)
        .u32(2)
        .u32(message::KIND_STATUS)
        .string(Some("WSJT-X"))
        .u64(14_074_000)
        .string(Some("FT8"))
        .string(Some("JA1XYZ"))
        .string(Some("-12"))
        .string(Some("FT8"))
        .bool(true)
        .bool(false)
        .bool(true)
        .u32(1500)
        .u32(1500)
        .string(Some("W1ABC"))
        .string(Some("FN42"))
        .string(Some("PM95"))
        .bool(false)
        .string(None)
        .bool(false)
        .u8(0)
        .u32(50)
        .u32(15)
        .string(Some("Default"))
        .string(Some("CQ W1ABC FN42"));
    w.into_bytes()
}

fn contact(i: u64) -> ContactRecord {
    let mut rec = ContactRecord::new();
    rec.insert("call", FieldValue::Text(format!("K{i}ABC")));
    rec.insert("band", FieldValue::Text("20M".to_string()));
    rec.insert("mode", FieldValue::Text("FT8".to_string()));
    rec.insert("freq", FieldValue::Number(14.074));
    rec.insert("gridsquare", FieldValue::Text("FN42".to_string()));
    rec.insert("rst_sent", FieldValue::Text("-10".to_string()));
    rec.insert("rst_rcvd", FieldValue::Text("-12".to_string()));
    rec
}

fn bench_decode_status(c: &mut Criterion) {
    let frame = status_frame();
    c.bench_function("decode_status", |b| {
        b.iter(|| message::decode(&frame).expect("decode"));
    });
}

fn bench_encode_logged_adif(c: &mut Criterion) {
    let rec = contact(1);
    c.bench_function("encode_logged_adif", |b| {
        b.iter(|| message::encode_logged_adif(&rec));
    });
}

fn bench_adif_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("adif_read");

    for n in [10u64, 100u64, 1000u64] {
        let mut writer = AdiWriter::new("bench", None);
        for i in 0..n {
            writer.write_record(&contact(i));
        }
        let text = writer.into_string();

        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| AdiReader::new(text.as_bytes()).read_all().expect("parse"));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_status,
    bench_encode_logged_adif,
    bench_adif_read
);
criterion_main!(benches);
