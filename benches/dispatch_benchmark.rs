/*!
 * Dispatch Benchmarks
 *
 * Semaphore ping-pong latency through the dispatcher, plus the raw cost of
 * the ready queue and delta queue operations on the hot path
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rtk::scheduler::{DelayReason, DeltaQueue, ReadyQueue};
use rtk::{Kernel, KernelConfig, Pid, ProcessClass};

fn bench_ping_pong(c: &mut Criterion) {
    let mut group = c.benchmark_group("ping_pong");
    group.sample_size(10);

    for rounds in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rounds), &rounds, |b, &rounds| {
            let config = KernelConfig::manual().with_invariant_checks(false);
            let kernel = Kernel::new(config).unwrap();
            kernel.start_scheduler().unwrap();

            b.iter(|| {
                let ping = kernel.create_semaphore(1);
                let pong = kernel.create_semaphore(0);

                let players: Vec<_> = [(ping, pong), (pong, ping)]
                    .into_iter()
                    .map(|(mine, theirs)| {
                        kernel
                            .spawn("player", ProcessClass::TimeSliced, move |ctx| {
                                for _ in 0..rounds {
                                    ctx.wait(mine)?;
                                    ctx.signal(theirs)?;
                                }
                                Ok(())
                            })
                            .unwrap()
                    })
                    .collect();

                for pid in players {
                    kernel.join(pid).unwrap();
                }
                kernel.destroy_semaphore(ping).unwrap();
                kernel.destroy_semaphore(pong).unwrap();
            });

            kernel.stop_scheduler().unwrap();
        });
    }

    group.finish();
}

fn bench_ready_queue(c: &mut Criterion) {
    c.bench_function("ready_queue_mixed_classes", |b| {
        let mut queue = ReadyQueue::unbounded();
        b.iter(|| {
            for i in 0..64u32 {
                let class = if i % 3 == 0 {
                    ProcessClass::RealTime
                } else {
                    ProcessClass::TimeSliced
                };
                queue.requeue(class, Pid(i));
            }
            while let Some(next) = queue.dequeue_next() {
                black_box(next);
            }
        });
    });
}

fn bench_delta_queue(c: &mut Criterion) {
    c.bench_function("delta_queue_schedule_advance", |b| {
        let mut queue = DeltaQueue::new();
        b.iter(|| {
            for i in 0..64u32 {
                queue.schedule(Pid(i), u64::from(i * 7 % 23), DelayReason::Quantum);
            }
            while !queue.is_empty() {
                black_box(queue.advance(1));
            }
        });
    });
}

criterion_group!(benches, bench_ping_pong, bench_ready_queue, bench_delta_queue);
criterion_main!(benches);
