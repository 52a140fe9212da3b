//! Selection-projection benchmarks.
//!
//! Measures the scan pipeline for:
//! - Unfiltered projection of every record
//! - INTEGER and STRING filters at varying selectivity
//! - Scaling with source relation size

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use relscan::{
    AttrDef, CompareOp, Database, DatabaseConfig, RelationSchema, SelectRequest, Value,
};

/// Creates `emp(name: STRING(16), id: INTEGER, salary: FLOAT)` with `rows`
/// random records and an empty `out(id: INTEGER, name: STRING(16))`.
fn create_database(rows: usize) -> Database {
    let mut rng = StdRng::seed_from_u64(42);
    let mut db = Database::new(DatabaseConfig::new()).unwrap();
    db.create_relation(
        RelationSchema::new(
            "emp",
            vec![
                AttrDef::string("name", 16),
                AttrDef::integer("id"),
                AttrDef::float("salary"),
            ],
        )
        .unwrap(),
    )
    .unwrap();
    reset_output(&mut db);

    for i in 0..rows {
        let name = format!("person{:06}", rng.gen_range(0..rows));
        db.insert_values(
            "emp",
            &[
                Value::String(name),
                Value::Integer(i as i32),
                Value::Float(rng.gen_range(1000.0..9000.0)),
            ],
        )
        .unwrap();
    }
    db
}

fn reset_output(db: &mut Database) {
    if db.catalog().relation_exists("out") {
        db.drop_relation("out").unwrap();
    }
    db.create_relation(
        RelationSchema::new("out", vec![AttrDef::integer("id"), AttrDef::string("name", 16)])
            .unwrap(),
    )
    .unwrap();
}

fn projection() -> SelectRequest {
    SelectRequest::new("out").project("emp", "id").project("emp", "name")
}

/// Benchmark unfiltered select over 10k records
fn bench_select_all(c: &mut Criterion) {
    let mut db = create_database(10_000);
    let request = projection();

    c.bench_function("select_all_10k", |b| {
        b.iter(|| {
            let summary = db.select(black_box(&request)).unwrap();
            reset_output(&mut db);
            summary
        });
    });
}

/// Benchmark filtered select at different selectivities
fn bench_select_filtered(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_filtered_10k");
    let mut db = create_database(10_000);

    for (label, request) in [
        ("int_eq", projection().filter("emp", "id", CompareOp::Eq, "5000")),
        ("int_lt_10pct", projection().filter("emp", "id", CompareOp::Lt, "1000")),
        ("int_gte_50pct", projection().filter("emp", "id", CompareOp::Gte, "5000")),
        ("float_gt", projection().filter("emp", "salary", CompareOp::Gt, "5000.0")),
        ("string_lt", projection().filter("emp", "name", CompareOp::Lt, "person005000")),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let summary = db.select(black_box(&request)).unwrap();
                reset_output(&mut db);
                summary
            });
        });
    }

    group.finish();
}

/// Benchmark scaling with source size
fn bench_select_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_scaling");

    for rows in [100, 1_000, 10_000, 50_000] {
        let mut db = create_database(rows);
        let request = projection().filter("emp", "id", CompareOp::Ne, "0");
        group.bench_with_input(BenchmarkId::from_parameter(rows), &request, |b, request| {
            b.iter(|| {
                let summary = db.select(black_box(request)).unwrap();
                reset_output(&mut db);
                summary
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_select_all,
    bench_select_filtered,
    bench_select_scaling
);
criterion_main!(benches);
