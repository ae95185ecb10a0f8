use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tideq::{FileQueueService, MemoryQueueService, QueueService};
use tokio::runtime::Runtime;

/// Benchmark: push into an in-memory queue
fn bench_memory_push(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_push");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("push_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = MemoryQueueService::new();
                for _ in 0..1000 {
                    service.push("bench", black_box("payload")).await.unwrap();
                }
            });
        });
    });
    group.finish();
}

/// Benchmark: pull + delete cycles, which scan past in-flight messages
fn bench_memory_pull_delete(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_pull_delete");

    for depth in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*depth as u64));
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            b.iter(|| {
                rt.block_on(async {
                    let service = MemoryQueueService::new();
                    for _ in 0..depth {
                        service.push("bench", "payload").await.unwrap();
                    }
                    while let Some(message) = service.pull("bench").await.unwrap() {
                        black_box(service.delete("bench", &message.receipt()).await.unwrap());
                    }
                });
            });
        });
    }
    group.finish();
}

/// Benchmark: contended pulls from several tasks
fn bench_memory_concurrent_pull(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("memory_concurrent_pull");

    for consumers in [1, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(consumers),
            consumers,
            |b, &consumers| {
                b.iter(|| {
                    rt.block_on(async {
                        let service = Arc::new(MemoryQueueService::new());
                        for _ in 0..1000 {
                            service.push("bench", "payload").await.unwrap();
                        }
                        let handles: Vec<_> = (0..consumers)
                            .map(|_| {
                                let service = service.clone();
                                tokio::spawn(async move {
                                    while service.pull("bench").await.unwrap().is_some() {}
                                })
                            })
                            .collect();
                        for handle in handles {
                            handle.await.unwrap();
                        }
                    });
                });
            },
        );
    }
    group.finish();
}

/// Benchmark: full read-modify-write cycles on the file backend
fn bench_file_roundtrip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("file_roundtrip");
    group.sample_size(20);

    for depth in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            b.iter(|| {
                rt.block_on(async {
                    let root = tempfile::tempdir().unwrap();
                    let service =
                        FileQueueService::new(root.path(), Duration::from_secs(30)).unwrap();
                    for _ in 0..depth {
                        service.push("bench", "payload").await.unwrap();
                    }
                    while let Some(message) = service.pull("bench").await.unwrap() {
                        black_box(service.delete("bench", &message.receipt()).await.unwrap());
                    }
                });
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_memory_push,
    bench_memory_pull_delete,
    bench_memory_concurrent_pull,
    bench_file_roundtrip
);
criterion_main!(benches);
