//! State machine run benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fsmkit_core::{GraphDefinition, LockPolicy, State, StateGraph, StateMachine, Transition};
use fsmkit_workflows::sub_order;
use std::sync::Arc;
use std::thread;

fn create_chain(len: u8) -> StateMachine {
    let mut builder = StateMachine::builder()
        .name("chain")
        .start(State(0))
        .end([State(len)]);
    for i in 0..=len {
        builder = builder.state(State(i), format!("state_{}", i));
    }
    for i in 0..len {
        builder = builder.transition(Transition::new(
            State(i),
            format!("NEXT_{}", i),
            State(i + 1),
        ));
    }
    builder.build().unwrap()
}

fn bench_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_build");

    group.bench_function("sub_order", |b| {
        b.iter(|| black_box(sub_order::machine().unwrap()))
    });

    group.bench_function("chain_50", |b| b.iter(|| black_box(create_chain(50))));

    // Definition parsing plus validation
    let json = sub_order::machine()
        .unwrap()
        .graph()
        .to_definition()
        .to_json()
        .unwrap();
    group.bench_function("from_json", |b| {
        b.iter(|| {
            let definition = GraphDefinition::from_json(black_box(&json)).unwrap();
            black_box(StateGraph::from_definition(definition).unwrap())
        })
    });

    group.finish();
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("machine_run");
    group.throughput(Throughput::Elements(1));

    let machine = sub_order::machine().unwrap();
    group.bench_function("uncontended", |b| {
        b.iter(|| black_box(machine.run(sub_order::WAIT_SHIP, sub_order::SHIP).unwrap()))
    });

    group.bench_function("no_transition", |b| {
        b.iter(|| black_box(machine.run(sub_order::WAIT_SHIP, sub_order::PAY).is_err()))
    });

    group.bench_function("run_for", |b| {
        b.iter(|| {
            black_box(
                machine
                    .run_for("order-1", sub_order::WAIT_SHIP, sub_order::SHIP)
                    .unwrap(),
            )
        })
    });

    let chain = create_chain(50);
    group.throughput(Throughput::Elements(50));
    group.bench_function("chain_walk_50", |b| {
        b.iter(|| {
            let mut state = chain.graph().start();
            for i in 0..50 {
                state = chain.run(state, &format!("NEXT_{}", i)).unwrap();
            }
            black_box(state)
        })
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("machine_contended");
    const RUNS_PER_THREAD: usize = 1000;

    for policy in [LockPolicy::Machine, LockPolicy::PerEntity] {
        let machine = Arc::new(sub_order::builder().lock_policy(policy).build().unwrap());

        for threads in [2usize, 4, 8] {
            group.throughput(Throughput::Elements((threads * RUNS_PER_THREAD) as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", policy), threads),
                &threads,
                |b, &threads| {
                    b.iter(|| {
                        let handles: Vec<_> = (0..threads)
                            .map(|t| {
                                let machine = Arc::clone(&machine);
                                thread::spawn(move || {
                                    let entity = format!("entity-{}", t);
                                    for _ in 0..RUNS_PER_THREAD {
                                        let _ = machine.run_for(
                                            &entity,
                                            sub_order::WAIT_SHIP,
                                            sub_order::SHIP,
                                        );
                                    }
                                })
                            })
                            .collect();
                        for handle in handles {
                            handle.join().unwrap();
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_graph_build, bench_run, bench_contended);

criterion_main!(benches);
