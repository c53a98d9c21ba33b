//! # Schema Benchmarks
//!
//! Performance benchmarks for relata-core fact extraction.
//!
//! Run with: `cargo bench -p relata-core`
//!
//! The interesting comparison is `value` vs `inline` over integer-valued
//! attributes: `inline` is the boxing-free fast path the rule evaluator
//! uses when building dense indexes.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use relata_core::{
    Attr, EntityMapping, Reflect, Schema, SchemaBuilder, StructLayout,
};
use std::hint::black_box;
use std::sync::LazyLock;

const DESC_ID: Attr = Attr::Named("desc-id");
const NAME: Attr = Attr::Named("name");
const SEQ: Attr = Attr::Named("seq-num");

struct Row {
    id: u64,
    seq: Option<i64>,
    name: String,
}

impl Reflect for Row {
    fn layout() -> &'static StructLayout {
        static LAYOUT: LazyLock<StructLayout> = LazyLock::new(|| {
            StructLayout::of::<Row>()
                .unsigned("id", |row: &Row| row.id)
                .signed_opt("seq", |row: &Row| row.seq)
                .text("name", |row: &Row| &row.name)
                .finish()
        });
        &LAYOUT
    }
}

fn row_schema() -> Schema {
    SchemaBuilder::new("bench")
        .entity::<Row>(
            EntityMapping::new()
                .field(DESC_ID, "id")
                .field(SEQ, "seq")
                .field(NAME, "name"),
        )
        .build()
        .expect("bench schema")
}

fn make_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|index| Row {
            id: index as u64,
            seq: Some(index as i64),
            name: format!("row-{index}"),
        })
        .collect()
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_schema_construction(c: &mut Criterion) {
    c.bench_function("schema_construction", |b| {
        b.iter(|| black_box(row_schema()));
    });
}

fn bench_inline_extraction(c: &mut Criterion) {
    let schema = row_schema();
    let entity = schema.entity_type::<Row>().expect("row schema");
    let desc_id = schema.ordinal(DESC_ID).expect("desc-id");
    let field = &entity.fields_for(desc_id)[0];

    let mut group = c.benchmark_group("inline_extraction");
    for size in [100, 10000] {
        let rows = make_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| {
                let mut sum = 0u64;
                for row in rows {
                    if let Some(raw) = field.inline(black_box(row)) {
                        sum = sum.wrapping_add(raw);
                    }
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

fn bench_value_extraction(c: &mut Criterion) {
    let schema = row_schema();
    let entity = schema.entity_type::<Row>().expect("row schema");
    let desc_id = schema.ordinal(DESC_ID).expect("desc-id");
    let field = &entity.fields_for(desc_id)[0];

    let mut group = c.benchmark_group("value_extraction");
    for size in [100, 10000] {
        let rows = make_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| {
                let mut seen = 0usize;
                for row in rows {
                    if field.value(black_box(row)).is_some() {
                        seen += 1;
                    }
                }
                black_box(seen)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_schema_construction,
    bench_inline_extraction,
    bench_value_extraction
);
criterion_main!(benches);
