//! Performance benchmarks for the per-file hot paths of dirmon.
//!
//! **Benchmarks Included:**
//! - `file_filter`: include/exclude regex evaluation per directory entry
//! - `csv_parse`: CSV parsing throughput at 100, 1000 and 10000 rows
//!
//! **Run benchmarks:**
//! ```bash
//! cargo bench                     # Run all benchmarks
//! cargo bench -- csv_parse        # CSV parser only
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dirmon::ingest::{CsvParser, ParserConfig, RecordParser};
use dirmon::monitor::FileFilter;

/// Build a CSV document with a header and `rows` data rows.
fn generate_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("host,region,cpu,mem,healthy\n");
    for i in 0..rows {
        out.push_str(&format!(
            "host{},{},{}.{},{},{}\n",
            i % 50,
            if i % 2 == 0 { "west" } else { "east" },
            i % 100,
            i % 10,
            i * 1024,
            i % 3 != 0
        ));
    }
    out.into_bytes()
}

fn bench_file_filter(c: &mut Criterion) {
    let filter = FileFilter::new(&[r"\.csv$", r"\.csv\.gz$"], &[r"^\.", r"\.tmp$", r"^partial_"])
        .expect("valid patterns");
    let names: Vec<String> = (0..1000)
        .map(|i| match i % 4 {
            0 => format!("export_{i}.csv"),
            1 => format!("export_{i}.csv.gz"),
            2 => format!("partial_{i}.csv"),
            _ => format!("upload_{i}.tmp"),
        })
        .collect();

    let mut group = c.benchmark_group("file_filter");
    group.throughput(Throughput::Elements(names.len() as u64));
    group.bench_function("1000_names", |b| {
        b.iter(|| {
            names
                .iter()
                .filter(|name| filter.is_eligible(black_box(name)))
                .count()
        });
    });
    group.finish();
}

fn bench_csv_parse(c: &mut Criterion) {
    let config = ParserConfig {
        tag_columns: vec!["host".to_string(), "region".to_string()],
        ..ParserConfig::default()
    };
    let parser = CsvParser::new(config).expect("valid parser config");

    let mut group = c.benchmark_group("csv_parse");
    group.sample_size(10);
    group.measurement_time(std::time::Duration::from_secs(5));

    for rows in &[100usize, 1000, 10000] {
        let data = generate_csv(*rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| parser.parse(black_box(data)).expect("well-formed csv"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_file_filter, bench_csv_parse);
criterion_main!(benches);
