//! Benchmarks for the object factory container

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use object_factory::{
    AnyObject, Arguments, BoxError, Component, Constructor, Container, Dependency, InjectionTarget,
    Qualifier, Qualifiers, Registration,
};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct SmallService {
    value: i32,
}

#[allow(dead_code)]
struct MediumService {
    name: String,
    values: Vec<i32>,
}

trait Handler: Send + Sync {
    fn id(&self) -> usize;
}

struct NumberedHandler(usize);

impl Handler for NumberedHandler {
    fn id(&self) -> usize {
        self.0
    }
}

struct Repository {
    small: Arc<SmallService>,
}

impl InjectionTarget for Repository {}

impl Component for Repository {
    fn constructor() -> Constructor {
        Constructor::inject(vec![Dependency::object::<SmallService>()])
    }

    fn construct(mut args: Arguments) -> Result<Self, BoxError> {
        Ok(Repository {
            small: args.next_object()?,
        })
    }
}

fn populated() -> Container {
    let container = Container::new();
    container
        .register(Registration::producer(|_| Ok(SmallService { value: 42 })))
        .unwrap();
    container
        .register(Registration::producer(|_| {
            Ok(MediumService {
                name: "test".to_string(),
                values: vec![1, 2, 3, 4, 5],
            })
        }))
        .unwrap();
    container
        .register(Registration::producer(|_| Ok(SmallService { value: 7 })).qualifier(Qualifier::named("secondary")))
        .unwrap();
    container.register(Registration::<Repository>::component()).unwrap();
    container
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("producer", |b| {
        b.iter(|| {
            let container = Container::new();
            container
                .register(Registration::producer(|_| Ok(SmallService { value: 42 })))
                .unwrap();
            black_box(container)
        })
    });

    group.bench_function("instance_qualified", |b| {
        b.iter(|| {
            let container = Container::new();
            container
                .register(Registration::instance(SmallService { value: 42 }).qualifier(Qualifier::named("primary")))
                .unwrap();
            black_box(container)
        })
    });

    group.bench_function("register_and_initialize_4", |b| {
        b.iter(|| {
            let container = populated();
            container.initialize().unwrap();
            black_box(container)
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    group.throughput(Throughput::Elements(1));

    let container = populated();
    container.initialize().unwrap();
    let secondary = Qualifiers::from(Qualifier::named("secondary"));

    group.bench_function("get_singleton", |b| {
        b.iter(|| black_box(container.get_object::<SmallService>().unwrap()))
    });

    group.bench_function("get_qualified", |b| {
        b.iter(|| black_box(container.get_object_with::<SmallService>(&secondary).unwrap()))
    });

    group.bench_function("get_component", |b| {
        b.iter(|| black_box(container.get_object::<Repository>().unwrap().small.value))
    });

    group.bench_function("get_container", |b| {
        b.iter(|| black_box(container.get_object::<Container>().unwrap()))
    });

    group.bench_function("try_get_not_found", |b| {
        b.iter(|| black_box(container.try_get_object::<String>()))
    });

    group.bench_function("contains_check", |b| {
        b.iter(|| black_box(container.contains::<MediumService>()))
    });

    group.finish();
}

fn bench_prototype_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("prototype");
    group.throughput(Throughput::Elements(1));

    let container = Container::new();
    container
        .register(Registration::producer(|_| Ok(SmallService { value: 42 })).prototype())
        .unwrap();

    group.bench_function("get_prototype", |b| {
        b.iter(|| black_box(container.get_object::<SmallService>().unwrap()))
    });

    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");

    for count in [4usize, 16, 64] {
        let container = Container::new();
        for id in 0..count {
            container
                .register(Registration::producer(move |_| Ok(NumberedHandler(id))).expose::<dyn Handler>(|h| h))
                .unwrap();
        }
        container.initialize().unwrap();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("iterate_trait", count), &container, |b, container| {
            b.iter(|| {
                let handlers = container.select::<dyn Handler>(&Qualifiers::new()).unwrap();
                let sum: usize = handlers.iter().map(|h| h.unwrap().id()).sum();
                black_box(sum)
            })
        });
        group.bench_with_input(BenchmarkId::new("select_wildcard", count), &container, |b, container| {
            b.iter(|| black_box(container.select::<AnyObject>(&Qualifiers::new()).unwrap().len()))
        });
    }

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = populated();
        container.initialize().unwrap();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = container.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.get_object::<SmallService>().unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_prototype_resolution,
    bench_selection,
    bench_concurrent,
);

criterion_main!(benches);
