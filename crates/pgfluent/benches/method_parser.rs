use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgfluent::dynamic::parse_call;
use pgfluent::{EntityMetadata, EntityQb, FieldMeta, FieldType, args};
use std::sync::Arc;

/// Entity with `n` string fields named `field0` .. `fieldN`, plus `createdAt`.
fn wide_entity(n: usize) -> Arc<EntityMetadata> {
    let mut builder = EntityMetadata::builder("Wide")
        .table("wide")
        .field(FieldMeta::new("id", FieldType::BigInt).id())
        .field(FieldMeta::new("created_at", FieldType::DateTime));
    for i in 0..n {
        builder = builder.field(FieldMeta::new(format!("field{i}"), FieldType::String));
    }
    Arc::new(builder.build().expect("valid metadata"))
}

const METHODS: &[&str] = &[
    "field0Equal",
    "orField0NotIn",
    "andCreatedAtGreaterThanEqual",
    "filterByField0",
    "orderDescByCreatedAt",
    "field0IsNotEmpty",
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("method_parser/parse");

    for n in [1, 10, 50] {
        let meta = wide_entity(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &meta, |b, meta| {
            b.iter(|| {
                for method in METHODS {
                    black_box(parse_call(meta, black_box(method), 1).ok());
                }
            });
        });
    }

    group.finish();
}

fn bench_compile_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("method_parser/compile_and_render");

    for calls in [1, 5, 20] {
        let meta = wide_entity(calls);
        group.bench_with_input(BenchmarkId::from_parameter(calls), &calls, |b, &calls| {
            b.iter(|| {
                let mut qb = EntityQb::new(Arc::clone(&meta)).select_from_entity(None);
                for i in 0..calls {
                    let method = format!("andField{i}In");
                    qb.apply(&method, args![vec!["a", "b", "c"]])
                        .expect("known field");
                }
                black_box(qb.build().expect("renders"));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_compile_and_render);
criterion_main!(benches);
