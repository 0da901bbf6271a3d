#![allow(clippy::unwrap_used)]

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use xmlmap::{from_value, parse, Map, Value};

fn catalog(items: usize) -> String {
    let mut markup = String::from("<catalog>");
    for i in 0..items {
        markup.push_str(&format!(
            "<Car-Model id=\"{i}\"><name>model {i}</name><doors>4</doors><extra/></Car-Model>"
        ));
    }
    markup.push_str("</catalog>");
    markup
}

fn bench_parse(c: &mut Criterion) {
    let input = catalog(500);

    c.bench_function("parse_catalog", |b| b.iter(|| parse(black_box(&input)).unwrap()));
}

fn bench_roundtrip(c: &mut Criterion) {
    let root = parse(&catalog(500)).unwrap();

    c.bench_function("to_value", |b| b.iter(|| black_box(&root).to_value()));

    let value: Value = Map::new().with("catalog", root.to_value()).into();
    c.bench_function("from_value", |b| {
        b.iter(|| from_value(black_box(&value)).unwrap())
    });
}

fn bench_paths(c: &mut Criterion) {
    let root = parse(&catalog(500)).unwrap();

    c.bench_function("sget_indexed", |b| {
        b.iter(|| root.sget(black_box("car_model.250.name")).text())
    });
}

criterion_group!(benches, bench_parse, bench_roundtrip, bench_paths);
criterion_main!(benches);
