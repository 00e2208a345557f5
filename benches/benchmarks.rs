use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use context_select::runtime::Component;
use context_select::{create_scoped_store, read_selected, Listener, SelectorOptions, Store};

#[derive(Clone)]
struct State {
    counter: usize,
    name: String,
}

fn store_creation_benchmark(c: &mut Criterion) {
    c.bench_function("store_creation", |b| {
        b.iter(|| {
            let store: Store<i32> = Store::new(black_box(42));
            store
        });
    });
}

fn store_read_benchmark(c: &mut Criterion) {
    let store: Store<i32> = Store::new(42);

    c.bench_function("store_read", |b| {
        b.iter(|| {
            black_box(store.get_snapshot());
        });
    });
}

fn store_noop_write_benchmark(c: &mut Criterion) {
    let store = Store::new(State {
        counter: 0,
        name: "test".to_string(),
    });
    let _sub = store.subscribe(Listener::new(|| {}));

    c.bench_function("store_noop_write", |b| {
        b.iter(|| {
            store.set_state(|state| black_box(Arc::clone(state)));
        });
    });
}

fn store_subscribe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_notify");

    for listener_count in [1, 10, 100].iter() {
        let store = Store::new(State {
            counter: 0,
            name: "test".to_string(),
        });

        let _subs: Vec<_> = (0..*listener_count)
            .map(|_| {
                store.subscribe(Listener::new(|| {
                    // Empty listener
                }))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(listener_count),
            listener_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    store.set_state(|state| {
                        Arc::new(State {
                            counter: black_box(i),
                            name: state.name.clone(),
                        })
                    });
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn selected_unrelated_write_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("selected_unrelated_write");

    for view_count in [1, 10, 100].iter() {
        let (scope, provider) = create_scoped_store(State {
            counter: 0,
            name: "test".to_string(),
        });
        let mut views: Vec<_> = (0..*view_count)
            .map(|_| {
                Component::new(move |cx| {
                    read_selected(
                        cx,
                        &scope,
                        |state: &State| state.name.len(),
                        SelectorOptions::default(),
                    )
                })
            })
            .collect();

        provider.provide(|| {
            for view in &mut views {
                let _ = view.render();
            }
        });

        group.bench_with_input(
            BenchmarkId::from_parameter(view_count),
            view_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    provider.store().set_state(|state| {
                        Arc::new(State {
                            counter: black_box(i),
                            name: state.name.clone(),
                        })
                    });
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    store_creation_benchmark,
    store_read_benchmark,
    store_noop_write_benchmark,
    store_subscribe_benchmark,
    selected_unrelated_write_benchmark,
);
criterion_main!(benches);
