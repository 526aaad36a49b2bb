use std::io;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use zeroplay_core::{Environment, TicTacToe};
use zeroplay_mcts::MctsConfig;
use zeroplay_nn::{Network, UniformNetwork};
use zeroplay_selfplay::{ActorGroup, RecordSink, SelfPlayConfig, ZeroActor};

/// One synchronous tic-tac-toe episode per iteration at several simulation counts
fn bench_single_game(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_game");
    let mut network = Network::single_step(UniformNetwork::new(9));

    for num_sims in [1, 10, 30].iter() {
        let config = MctsConfig::default()
            .with_simulations(*num_sims)
            .with_c_puct(1.5)
            .with_temperature(1.0)
            .with_dirichlet_noise(0.3, 0.25);

        group.bench_with_input(BenchmarkId::from_parameter(num_sims), num_sims, |b, _| {
            let mut actor = ZeroActor::new(
                TicTacToe::new(),
                config.clone(),
                9,
                1.0,
                StdRng::seed_from_u64(0),
            );
            b.iter(|| {
                actor.reset();
                while !actor.env().is_terminal() {
                    actor.think(&mut network).expect("search failed");
                    actor.commit_action().expect("move failed");
                }
                black_box(actor.record(false))
            });
        });
    }

    group.finish();
}

/// Throughput of the worker pool, one CPU or GPU phase per iteration
fn bench_scheduler_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_round");

    for num_games in [8, 64].iter() {
        let config = SelfPlayConfig::default()
            .with_parallel_games(*num_games)
            .with_threads(4)
            .with_mcts(MctsConfig::default().with_simulations(16))
            .with_seed(0);
        let networks = vec![Network::single_step(UniformNetwork::new(9))];
        let actors = ActorGroup::new(
            config,
            TicTacToe::new,
            networks,
            RecordSink::new(io::sink()),
        )
        .expect("failed to start workers");

        group.bench_with_input(BenchmarkId::from_parameter(num_games), num_games, |b, _| {
            b.iter(|| actors.run_round());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_game, bench_scheduler_round);
criterion_main!(benches);
