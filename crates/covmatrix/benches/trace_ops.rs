//! Trace Operations Benchmarks
//!
//! Benchmarks for dump parsing, per-test splitting and component selection.
//!
//! Run with: `cargo bench --bench trace_ops`

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fmt::Write;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use covmatrix::prelude::*;
use tempfile::TempDir;

/// Dump with `tests` test methods, each calling `methods` shared methods
fn synthetic_dump(tests: usize, methods: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<coverage>\n<package name=\"bench\">\n");
    xml.push_str("<class name=\"SuiteTest\">\n");
    for t in 0..tests {
        let id = t + 1;
        writeln!(
            xml,
            r#"<meth name="test{t}" vmsig="()V" id="{id}" extra_slots="{}" count="1" HitInformation="[[1,-1,{t},-1,-1,-1]]"/>"#,
            id + 100_000
        )
        .unwrap();
    }
    xml.push_str("</class>\n<class name=\"Impl\">\n");
    for m in 0..methods {
        let id = tests + m + 1;
        let hits: Vec<String> = (0..tests)
            .map(|t| format!("[2,{},{},{},{t},-1]", t + 1, t + 1, t + 1))
            .collect();
        writeln!(
            xml,
            r#"<meth name="m{m}" vmsig="(ILjava/lang/String;)V" id="{id}" extra_slots="{}" count="{}" HitInformation="[{}]"/>"#,
            id + 100_000,
            2 * tests,
            hits.join(",")
        )
        .unwrap();
    }
    xml.push_str("</class>\n</package>\n</coverage>\n");
    xml
}

fn bench_catalogue(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalogue_build");

    for methods in [100, 1000, 5000] {
        let xml = synthetic_dump(10, methods);
        group.bench_with_input(BenchmarkId::from_parameter(methods), &xml, |bench, xml| {
            bench.iter(|| {
                let catalogue = MethodCatalogue::from_markup(black_box(xml), &ReaderConfig::default()).unwrap();
                black_box(catalogue);
            });
        });
    }

    group.finish();
}

fn bench_parse_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_file");

    for methods in [100, 1000] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.xml");
        std::fs::write(&path, synthetic_dump(20, methods)).unwrap();
        let reader = TraceReader::from_files(vec![path.clone()], &ReaderConfig::default()).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(methods), &path, |bench, path| {
            bench.iter(|| black_box(reader.parse_file(path).unwrap()));
        });
    }

    group.finish();
}

fn bench_split_and_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_and_select");

    for tests in [10, 50] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("result.xml");
        std::fs::write(&path, synthetic_dump(tests, 200)).unwrap();
        let reader = TraceReader::from_files(vec![path.clone()], &ReaderConfig::default()).unwrap();
        let trace = reader.parse_file(&path).unwrap();
        let triggers = TriggerTests::new(["bench.SuiteTest.test0"]);
        let bugs = vec!["bench.Impl.m0(int;String)".to_string()];

        group.bench_with_input(BenchmarkId::new("split", tests), &trace, |bench, trace| {
            bench.iter(|| black_box(trace.split_to_subtraces()));
        });

        let traces = trace.split_to_subtraces();
        group.bench_with_input(BenchmarkId::new("select", tests), &traces, |bench, traces| {
            let selector = DifferentialSelector::default();
            bench.iter(|| black_box(selector.select(traces, &triggers, &bugs)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_catalogue, bench_parse_file, bench_split_and_select);

criterion_main!(benches);
