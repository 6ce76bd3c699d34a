use std::hint::black_box;

use bencher::field_lines;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use micro_body_parser::header::{HeaderFields, parse_field_line};

fn benchmark_field_lines(criterion: &mut Criterion) {
    let lines = field_lines();
    let size: usize = lines.iter().map(|line| line.len()).sum();

    let mut group = criterion.benchmark_group("field_line");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("part_header_block", |b| {
        b.iter(|| {
            let mut fields = HeaderFields::new();
            for line in &lines {
                parse_field_line(black_box(line), &mut fields).expect("bench input should be valid field lines");
            }
            black_box(fields)
        });
    });

    group.finish();
}

criterion_group!(field_line, benchmark_field_lines);
criterion_main!(field_line);
