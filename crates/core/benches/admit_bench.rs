//! Schedule/admit throughput on the in-memory store

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lull_core::{
    Coordinator, DebounceConfig, ExecutionId, KeySpec, MemoryTicketStore, RecordingScheduler,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn coordinator() -> (Coordinator, Arc<RecordingScheduler>) {
    let scheduler = Arc::new(RecordingScheduler::new());
    let coordinator = Coordinator::new(
        "Bench",
        DebounceConfig::new(Duration::from_secs(60)),
        Arc::new(MemoryTicketStore::new()),
        scheduler.clone(),
    )
    .expect("valid task type");
    (coordinator, scheduler)
}

fn bench_schedule(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let (coordinator, scheduler) = coordinator();
    let spec = KeySpec::indices([0, 1]);

    c.bench_function("schedule_index_key", |b| {
        b.iter(|| {
            rt.block_on(async {
                let receipt = coordinator
                    .schedule(vec![json!("u1"), json!(42)], &spec)
                    .await
                    .expect("schedule");
                black_box(receipt);
            });
            scheduler.drain();
        });
    });
}

fn bench_admit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    let (coordinator, scheduler) = coordinator();
    let spec = KeySpec::literal("u1");

    c.bench_function("admit_executed", |b| {
        b.iter(|| {
            rt.block_on(async {
                let receipt = coordinator
                    .schedule_with_id(vec![], &spec, ExecutionId::from("fixed"))
                    .await
                    .expect("schedule");
                let outcome = coordinator
                    .admit(receipt.key.as_str(), "fixed", || async {
                        Ok::<_, anyhow::Error>(1u64)
                    })
                    .await
                    .expect("admit");
                black_box(outcome);
            });
            scheduler.drain();
        });
    });

    c.bench_function("admit_superseded", |b| {
        rt.block_on(async {
            coordinator
                .schedule_with_id(vec![], &spec, ExecutionId::from("current"))
                .await
                .expect("schedule");
        });

        b.iter(|| {
            rt.block_on(async {
                let outcome = coordinator
                    .admit("Bench:u1", "stale", || async { Ok::<_, anyhow::Error>(1u64) })
                    .await
                    .expect("admit");
                black_box(outcome);
            });
        });
    });
}

criterion_group!(benches, bench_schedule, bench_admit);
criterion_main!(benches);
