//! Benchmarks for the dispatch loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stepflow::context::StepContext;
use stepflow::core::Event;
use stepflow::steps::{FnStep, StepOutput};
use stepflow::workflow::Workflow;

async fn forward(event: Event, ctx: StepContext) -> anyhow::Result<StepOutput> {
    let hops = event.get("hops").and_then(serde_json::Value::as_u64).unwrap_or(0) + 1;
    ctx.store().set("hops", &hops)?;
    let next = match ctx.step_name().strip_prefix("hop_") {
        Some(index) => format!("t{}", index.parse::<usize>()? + 1),
        None => "t1".to_string(),
    };
    Ok(Event::new(next).with_field("hops", hops).into())
}

async fn finish(event: Event, _ctx: StepContext) -> anyhow::Result<StepOutput> {
    Ok(StepOutput::stop(event.get("hops").cloned().unwrap_or_default()))
}

/// `start` -> `t1` -> ... -> `t{len}` -> `stop`
fn chain(len: usize) -> Workflow {
    let mut builder = Workflow::builder("chain")
        .step(FnStep::new("hop_0", "start", forward).emits("t1"));
    for i in 1..len {
        builder = builder.step(
            FnStep::new(format!("hop_{i}"), format!("t{i}"), forward).emits(format!("t{}", i + 1)),
        );
    }
    builder
        .step(FnStep::new("finish", format!("t{len}"), finish).emits("stop"))
        .build()
        .expect("valid chain")
}

fn dispatch_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("dispatch");

    for len in [1usize, 10, 50] {
        let workflow = chain(len);
        group.bench_with_input(BenchmarkId::new("chain", len), &workflow, |b, workflow| {
            b.iter(|| {
                runtime.block_on(async {
                    let result = workflow.run(Event::start()).expect("start").await;
                    black_box(result.expect("run"))
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, dispatch_benchmark);
criterion_main!(benches);
