use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgcrud::{Filters, Select, Table, Whitelist, build_where};
use serde_json::json;

/// A table with `n` columns named `col0 .. col{n-1}` plus `id`.
fn wide_table(n: usize) -> Table {
    let columns: Vec<String> = std::iter::once("id".to_owned())
        .chain((0..n).map(|i| format!("col{i}")))
        .collect();
    Table::new("t", columns).unwrap()
}

/// `{"col0": 0, "col1": {"operator": ">", "value": 1}, "col2": {"operator": "IN", ...}, ...}`
fn filter_json(n: usize) -> serde_json::Value {
    let map = (0..n)
        .map(|i| {
            let value = match i % 3 {
                0 => json!(i),
                1 => json!({"operator": ">", "value": i}),
                _ => json!({"operator": "IN", "value": [i, i + 1]}),
            };
            (format!("col{i}"), value)
        })
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(map)
}

fn bench_build_where(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters/build_where");

    for n in [1, 5, 10, 50] {
        let table = wide_table(n);
        let spec = filter_json(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &spec, |b, spec| {
            b.iter(|| {
                let filters = Filters::from_json(&table, spec).unwrap();
                black_box(build_where(&filters, 1).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_select_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("read/select_render");

    for n in [1, 10, 50] {
        let table = wide_table(n);
        let filters = Filters::from_json(&table, &filter_json(n)).unwrap();
        let select = Select::from(&table).alias("x").filter(filters);
        group.bench_with_input(BenchmarkId::from_parameter(n), &select, |b, select| {
            b.iter(|| black_box(select.build_sql().unwrap().to_sql()));
        });
    }

    group.finish();
}

fn bench_whitelist_pick(c: &mut Criterion) {
    let mut group = c.benchmark_group("whitelist/pick");

    for n in [5, 20, 100] {
        let table = wide_table(n);
        let fields: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
        let whitelist = Whitelist::new(&table, &fields).unwrap();
        let input = pgcrud::Record::from_json(filter_json(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            b.iter(|| black_box(whitelist.pick(input)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_where, bench_select_render, bench_whitelist_pick);
criterion_main!(benches);
