use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use invoker::catalog::SearchOrder;
use invoker::chain::{self, Chain};
use invoker::coerce::coerce;
use invoker::datatype::{EnumDescriptor, TypeTag};
use invoker::executor::Invoker;
use invoker::samples::sample_catalog;
use invoker::trace::TraceSink;

fn tokens(line: &str) -> Vec<String> {
    line.split(' ').map(String::from).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let flags = EnumDescriptor::new("Flags", [("None", 0), ("Read", 1), ("Write", 2), ("Execute", 4)]).unwrap();
    let flags = TypeTag::enumeration(&flags);
    let ints = TypeTag::array_of(TypeTag::Int);
    let long: String = format!("[{}]", (0..1000).map(|i| i.to_string()).collect::<Vec<_>>().join(","));

    c.bench_function("coerce int", |b| b.iter(|| coerce(black_box("-12345"), &TypeTag::Int)));
    c.bench_function("coerce flags", |b| b.iter(|| coerce(black_box("Read|Write|Execute"), &flags)));
    c.bench_function("coerce array 3", |b| b.iter(|| coerce(black_box("[1,2,3]"), &ints)));
    c.bench_function("coerce array 1k", |b| b.iter(|| coerce(black_box(&long), &ints)));

    let catalog = sample_catalog().unwrap();
    let invoker = Invoker::new(&catalog, SearchOrder::default());

    c.bench_function("resolve primary", |b| {
        b.iter(|| {
            let mut sink = TraceSink::buffered();
            let found = invoker.resolve(None, black_box("Normal"), &mut sink.begin_step());
            found.unwrap()
        })
    });
    c.bench_function("resolve secondary", |b| {
        b.iter(|| {
            let mut sink = TraceSink::buffered();
            let found = invoker.resolve(None, black_box("InvokeTestPlugins"), &mut sink.begin_step());
            found.unwrap()
        })
    });

    let overload = tokens("Normal.Test_Overload abc");
    c.bench_function("invoke overload", |b| {
        b.iter(|| {
            let mut sink = TraceSink::buffered();
            let value = invoker.invoke_with_args(black_box(&overload), &mut sink.begin_step());
            value.unwrap()
        })
    });

    let line = tokens("-batchmode -invoke Normal.Test_ReturnValue 10 -next Normal.Test_Array [1,2,3] -next Normal.Test_Flags Read|Write");
    c.bench_function("parse chain", |b| b.iter(|| Chain::parse(black_box(&line), "-invoke").unwrap()));
    c.bench_function("run chain", |b| {
        b.iter(|| {
            let mut sink = TraceSink::buffered();
            chain::run_with(&invoker, black_box(&line), "-invoke", &mut sink).exit_code()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
