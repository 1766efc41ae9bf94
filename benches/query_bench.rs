//! Performance benchmarks for building and querying a ~20k declaration graph
//!
//! 100 namespaces x 20 classes x 9 methods, every class deriving from the
//! previous class of its namespace.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use declgraph::record::{ChildKind, ChildRecord, fields};
use declgraph::{
    DeclGraph, DeclKind, GraphBuilder, Matcher, Record, RecordKind, RecordStream, Traversal,
    TypeMatcher,
};
use std::hint::black_box;

const NAMESPACES: usize = 100;
const CLASSES: usize = 20;
const METHODS: usize = 9;

fn synthetic_unit() -> RecordStream {
    let mut records = vec![
        Record::new(RecordKind::Namespace, "_1").with_literal(fields::NAME, "::"),
        Record::new(RecordKind::FundamentalType, "_2").with_literal(fields::NAME, "int"),
        Record::new(RecordKind::PointerType, "_3").with_ref(fields::TYPE, "_2"),
    ];
    let mut next = 4;
    let mut fresh = || {
        let id = format!("_{next}");
        next += 1;
        id
    };

    for n in 0..NAMESPACES {
        let namespace = fresh();
        records.push(
            Record::new(RecordKind::Namespace, namespace.as_str())
                .with_literal(fields::NAME, format!("ns{n}"))
                .with_ref(fields::CONTEXT, "_1"),
        );

        let mut previous: Option<String> = None;
        for c in 0..CLASSES {
            let class = fresh();
            let mut record = Record::new(RecordKind::Class, class.as_str())
                .with_literal(fields::NAME, format!("C{c}"))
                .with_ref(fields::CONTEXT, namespace.as_str());
            if let Some(base) = &previous {
                record = record.with_child(
                    ChildRecord::new(ChildKind::Base)
                        .with_ref(fields::TYPE, base.as_str())
                        .with_literal(fields::ACCESS, "public"),
                );
            }
            records.push(record);

            for m in 0..METHODS {
                let returns = if m % 3 == 0 { "_3" } else { "_2" };
                let mut method = Record::new(RecordKind::Method, fresh().as_str())
                    .with_literal(fields::NAME, format!("m{m}"))
                    .with_ref(fields::CONTEXT, class.as_str())
                    .with_ref(fields::RETURNS, returns)
                    .with_literal(fields::ACCESS, if m % 2 == 0 { "public" } else { "private" });
                if m == 0 {
                    method = method.with_flag(fields::VIRTUAL);
                }
                records.push(method);
            }
            previous = Some(class);
        }
    }

    RecordStream::new(records)
}

fn synthetic_graph() -> DeclGraph {
    let mut builder = GraphBuilder::default();
    builder
        .add_unit(synthetic_unit())
        .expect("synthetic unit builds");
    builder.freeze()
}

fn bench_build(c: &mut Criterion) {
    let stream = synthetic_unit();

    c.bench_function("build_and_freeze_20k", |b| {
        b.iter_batched(
            || stream.clone(),
            |stream| {
                let mut builder = GraphBuilder::default();
                builder.add_unit(stream).unwrap();
                black_box(builder.freeze());
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("merge_same_unit_twice_20k", |b| {
        b.iter_batched(
            || (stream.clone(), stream.clone()),
            |(first, second)| {
                let mut builder = GraphBuilder::default();
                builder.add_unit(first).unwrap();
                builder.add_unit(second).unwrap();
                black_box(builder.decl_count());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_queries(c: &mut Criterion) {
    let graph = synthetic_graph();
    let by_name = Matcher::name("m4") & Matcher::kind(DeclKind::MemberFunction);

    c.bench_function("find_all_by_name_indexed", |b| {
        let traversal = Traversal::new(&graph);
        b.iter(|| black_box(traversal.find_all(black_box(&by_name))));
    });

    c.bench_function("find_all_by_name_scan", |b| {
        let traversal = Traversal::new(&graph).use_name_index(false);
        b.iter(|| black_box(traversal.find_all(black_box(&by_name))));
    });

    c.bench_function("find_one_qualified", |b| {
        let matcher = Matcher::name("ns57::C13::m8");
        b.iter(|| black_box(graph.query().find_one(black_box(&matcher)).unwrap()));
    });

    c.bench_function("has_base_class_deep_chain", |b| {
        let matcher = Matcher::kind(DeclKind::Class) & Matcher::has_base(Matcher::name("C0"));
        b.iter(|| black_box(Traversal::new(&graph).count(black_box(&matcher))));
    });

    c.bench_function("public_methods_returning_pointers", |b| {
        let matcher = Matcher::kind(DeclKind::MemberFunction)
            & Matcher::access(declgraph::Access::Public)
            & Matcher::ReturnType(TypeMatcher::pointer_to(TypeMatcher::fundamental("int")));
        b.iter(|| black_box(graph.query().count(black_box(&matcher))));
    });
}

criterion_group!(benches, bench_build, bench_queries);
criterion_main!(benches);
