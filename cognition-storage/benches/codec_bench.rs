use chrono::DateTime;
use cognition_model::{LogRecord, Record};
use cognition_storage::{CellCursor, RowCodec, StorageResult};
use cognition_types::{Cell, RowKeyLayout};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

fn make_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let mut record = LogRecord::with_uuid(format!("{i:08x}-0000-4000-8000-000000000000"));
            let millis = 1_700_000_000_000 + i as i64;
            record.set_date(DateTime::from_timestamp_millis(millis).unwrap_or_default());
            for f in 0..8 {
                record.set_value(format!("field{f}"), format!("value-{i}-{f}"));
            }
            record.add_metadata_value("ingest.host", "node-1");
            record.into()
        })
        .collect()
}

fn encode_all(codec: &RowCodec, records: &[Record]) -> Vec<Cell> {
    let mut cells: Vec<Cell> = records
        .iter()
        .flat_map(|r| codec.encode(r).unwrap())
        .collect();
    cells.sort();
    cells
}

fn bench_codec(c: &mut Criterion) {
    let codec = RowCodec::builtin(RowKeyLayout::new("evt_", 36).unwrap());
    let mut group = c.benchmark_group("row_codec");

    for &n in &[16usize, 1024, 16_384] {
        let records = make_records(n);
        let cells = encode_all(&codec, &records);

        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("encode", n), &records, |b, records| {
            b.iter(|| {
                for record in records {
                    black_box(codec.encode(record).unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("group_and_decode", n), &cells, |b, cells| {
            b.iter_batched(
                || cells.clone(),
                |cells| {
                    let decoded = codec
                        .records(CellCursor::from_cells(cells), true)
                        .collect::<StorageResult<Vec<_>>>()
                        .unwrap();
                    assert_eq!(decoded.len(), n);
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
