//! Barrier-phased self-play scheduler.
//!
//! Every round the orchestrator releases all workers through the start
//! barrier, each worker runs exactly one phase function, and the round ends
//! when all of them reach the finish barrier. Rounds alternate between a CPU
//! phase (tree work, request submission) and a GPU phase (one batched call
//! per network replica). Ownership is partitioned by phase: an actor is
//! touched by exactly one worker per CPU phase, a replica's outputs are
//! written by exactly one worker per GPU phase.

use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread;

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use zeroplay_core::Environment;
use zeroplay_nn::{InferenceKind, Network, NetworkOutput};

use crate::actor::{PendingEval, ZeroActor};
use crate::config::SelfPlayConfig;
use crate::error::{Result, SelfPlayError};
use crate::sink::RecordSink;

/// Outputs of one replica's latest batched call
#[derive(Debug, Default)]
pub struct Batch {
    kind: Option<InferenceKind>,
    outputs: Vec<NetworkOutput>,
}

impl Batch {
    pub fn new(kind: InferenceKind, outputs: Vec<NetworkOutput>) -> Self {
        Self {
            kind: Some(kind),
            outputs,
        }
    }

    pub fn kind(&self) -> Option<InferenceKind> {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Output answering `pending`
    ///
    /// # Panics
    ///
    /// If the batch was produced by a different kind of call or has no such
    /// slot: the round bookkeeping is broken.
    pub fn output_for(&self, pending: &PendingEval) -> &NetworkOutput {
        assert_eq!(
            self.kind,
            Some(pending.kind),
            "pending {:?} request consumed from a {:?} batch",
            pending.kind,
            self.kind
        );
        match self.outputs.get(pending.slot) {
            Some(output) => output,
            None => panic!(
                "batch slot {} out of range ({} outputs)",
                pending.slot,
                self.outputs.len()
            ),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the orchestrator and every worker
pub struct SharedSchedulerState<E: Environment> {
    actors: Vec<Mutex<ZeroActor<E>>>,
    networks: Vec<Mutex<Network>>,
    outputs: Vec<RwLock<Batch>>,
    next_actor: AtomicUsize,
    cpu_phase: AtomicBool,
    round: AtomicU64,
    games_finished: AtomicUsize,
    sink: RecordSink,
    config: SelfPlayConfig,
}

impl<E: Environment> SharedSchedulerState<E> {
    /// Validate the configuration and create one actor per parallel game
    pub fn new(
        config: SelfPlayConfig,
        make_env: impl Fn() -> E,
        networks: Vec<Network>,
        sink: RecordSink,
    ) -> Result<Self> {
        config.validate()?;
        if networks.len() != config.num_devices {
            return Err(SelfPlayError::Config(
                "one network replica per device is required",
            ));
        }

        let policy_size = make_env().policy_size();
        for network in &networks {
            if network.action_size() != policy_size {
                return Err(SelfPlayError::ActionSizeMismatch {
                    network: network.action_size(),
                    environment: policy_size,
                });
            }
        }

        let actors = (0..config.num_parallel_games)
            .map(|i| {
                let rng = match config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => StdRng::from_entropy(),
                };
                Mutex::new(ZeroActor::new(
                    make_env(),
                    config.mcts.clone(),
                    policy_size,
                    config.disable_resign_ratio,
                    rng,
                ))
            })
            .collect();

        Ok(Self {
            actors,
            outputs: (0..networks.len())
                .map(|_| RwLock::new(Batch::default()))
                .collect(),
            networks: networks.into_iter().map(Mutex::new).collect(),
            next_actor: AtomicUsize::new(0),
            cpu_phase: AtomicBool::new(true),
            round: AtomicU64::new(0),
            games_finished: AtomicUsize::new(0),
            sink,
            config,
        })
    }

    pub fn num_actors(&self) -> usize {
        self.actors.len()
    }

    pub fn num_replicas(&self) -> usize {
        self.networks.len()
    }

    /// Replica serving `actor_id`, fixed for the process lifetime
    pub fn replica_for(&self, actor_id: usize) -> usize {
        actor_id % self.networks.len()
    }

    pub fn is_cpu_phase(&self) -> bool {
        self.cpu_phase.load(Ordering::Acquire)
    }

    /// Rounds started so far; the first round is round 1
    pub fn round(&self) -> u64 {
        self.round.load(Ordering::Acquire)
    }

    pub fn games_finished(&self) -> usize {
        self.games_finished.load(Ordering::Relaxed)
    }

    pub fn sink(&self) -> &RecordSink {
        &self.sink
    }

    pub fn config(&self) -> &SelfPlayConfig {
        &self.config
    }

    /// Lock an actor for inspection between rounds
    pub fn actor(&self, actor_id: usize) -> MutexGuard<'_, ZeroActor<E>> {
        lock(&self.actors[actor_id])
    }

    fn next_actor_index(&self) -> usize {
        self.next_actor.fetch_add(1, Ordering::AcqRel)
    }

    /// Take an actor claimed through the cursor
    ///
    /// # Panics
    ///
    /// If another worker holds it: the cursor handed the same index twice.
    fn claim_actor(&self, actor_id: usize) -> MutexGuard<'_, ZeroActor<E>> {
        match self.actors[actor_id].try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                panic!("actor {actor_id} claimed by two workers in one phase")
            }
        }
    }

    fn begin_round(&self) {
        self.next_actor.store(0, Ordering::Release);
        self.round.fetch_add(1, Ordering::AcqRel);
    }

    fn end_round(&self) {
        self.cpu_phase.fetch_xor(true, Ordering::AcqRel);
    }
}

/// Log and abort the process when a worker unwinds
struct AbortOnPanic {
    worker_id: usize,
}

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("worker {} panicked, aborting", self.worker_id);
            process::abort();
        }
    }
}

fn fatal(context: &str, err: SelfPlayError) -> ! {
    error!("{context}: {err}");
    panic!("{context}: {err}");
}

/// One pool thread; runs a CPU or GPU phase per round
pub(crate) struct Worker<E: Environment> {
    id: usize,
    shared: Arc<SharedSchedulerState<E>>,
    start: Arc<Barrier>,
    finish: Arc<Barrier>,
}

impl<E: Environment> Worker<E> {
    fn run(self) -> ! {
        let _guard = AbortOnPanic { worker_id: self.id };
        loop {
            self.start.wait();
            if self.shared.is_cpu_phase() {
                self.do_cpu_job();
            } else {
                self.do_gpu_job();
            }
            self.finish.wait();
        }
    }

    /// Claim actors until the cursor runs out: consume the previous output,
    /// settle finished searches and queue the next request
    pub(crate) fn do_cpu_job(&self) {
        let shared = &self.shared;
        let round = shared.round();

        loop {
            let actor_id = shared.next_actor_index();
            if actor_id >= shared.num_actors() {
                break;
            }
            let network_id = shared.replica_for(actor_id);
            let mut actor = shared.claim_actor(actor_id);

            if let Some(pending) = actor.pending_eval() {
                let batch = shared.outputs[network_id]
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Err(err) = actor.after_nn_evaluation(batch.output_for(&pending)) {
                    fatal(&format!("actor {actor_id} evaluation"), err);
                }
                drop(batch);
                if let Err(err) = self.handle_search_end(actor_id, &mut actor) {
                    fatal(&format!("actor {actor_id} move"), err);
                }
            }

            let mut network = lock(&shared.networks[network_id]);
            if let Err(err) = actor.before_nn_evaluation(&mut network, round) {
                fatal(&format!("actor {actor_id} request"), err);
            }
        }
    }

    /// One batched call against this worker's replica
    pub(crate) fn do_gpu_job(&self) {
        let shared = &self.shared;
        if self.id >= shared.num_replicas() || self.id >= shared.num_actors() {
            return;
        }

        let mut network = lock(&shared.networks[self.id]);
        // Actors search in lockstep, so actor 0 tells which call is due
        let kind = if network.supports_single_step() {
            InferenceKind::SingleStep
        } else if shared.actor(0).tree().root().visit_count == 0 {
            InferenceKind::Initial
        } else {
            InferenceKind::Recurrent
        };

        match network.infer(kind) {
            Ok(outputs) => {
                let mut batch = shared.outputs[self.id]
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                *batch = Batch::new(kind, outputs);
            }
            Err(err) => fatal(&format!("replica {} inference", self.id), err.into()),
        }
    }

    /// Resign, finish or continue the episode once a search is decided
    fn handle_search_end(&self, actor_id: usize, actor: &mut ZeroActor<E>) -> Result<()> {
        if !actor.is_search_done() {
            return Ok(());
        }
        let shared = &self.shared;

        let is_resign = actor.is_resign(shared.config.resign_threshold)?;
        if !is_resign {
            actor.commit_action()?;
        }
        if actor_id == 0 {
            debug!("\n{}", actor.display_board());
        }

        if is_resign || actor.env().is_terminal() {
            let record = actor.record(is_resign);
            shared.sink.write_record(&record)?;
            let finished = shared.games_finished.fetch_add(1, Ordering::Relaxed) + 1;
            info!(
                "game {finished} finished by actor {actor_id}: {} moves, result {}{}",
                record.len(),
                record.tag("RE").unwrap_or("?"),
                if is_resign { " (resign)" } else { "" }
            );
            actor.reset();
        } else {
            actor.reset_search();
        }
        Ok(())
    }
}

/// Orchestrator owning the worker pool
pub struct ActorGroup<E: Environment> {
    shared: Arc<SharedSchedulerState<E>>,
    start: Arc<Barrier>,
    finish: Arc<Barrier>,
    num_threads: usize,
}

impl<E: Environment> ActorGroup<E> {
    /// Create the actors and spawn the worker pool
    ///
    /// `networks` holds one replica per device. Workers are detached and live
    /// for the rest of the process. Every check runs before the first spawn;
    /// failing to spawn a worker aborts the process.
    pub fn new(
        config: SelfPlayConfig,
        make_env: impl Fn() -> E,
        networks: Vec<Network>,
        sink: RecordSink,
    ) -> Result<Self> {
        let shared = Arc::new(SharedSchedulerState::new(config, make_env, networks, sink)?);
        let num_threads = shared.config.total_threads();

        // Workers plus the orchestrator
        let start = Arc::new(Barrier::new(num_threads + 1));
        let finish = Arc::new(Barrier::new(num_threads + 1));
        for id in 0..num_threads {
            let worker = Worker {
                id,
                shared: Arc::clone(&shared),
                start: Arc::clone(&start),
                finish: Arc::clone(&finish),
            };
            // Workers already spawned would wait on the start barrier forever
            if let Err(err) = thread::Builder::new()
                .name(format!("selfplay-worker-{id}"))
                .spawn(move || worker.run())
            {
                error!("failed to spawn worker {id}: {err}, aborting");
                process::abort();
            }
        }

        info!(
            "self-play started: {} games, {} threads, {} replicas, {} simulations",
            shared.num_actors(),
            num_threads,
            shared.num_replicas(),
            shared.config.mcts.num_simulations
        );

        Ok(Self {
            shared,
            start,
            finish,
            num_threads,
        })
    }

    pub fn shared(&self) -> &SharedSchedulerState<E> {
        &self.shared
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Run one phase on every worker and wait for all of them
    pub fn run_round(&self) {
        self.shared.begin_round();
        self.start.wait();
        self.finish.wait();
        self.shared.end_round();
    }

    /// Generate episodes until the process is terminated
    pub fn run(&self) -> ! {
        loop {
            self.run_round();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use zeroplay_core::TicTacToe;
    use zeroplay_mcts::MctsConfig;
    use zeroplay_nn::UniformNetwork;

    fn pending(slot: usize, kind: InferenceKind) -> PendingEval {
        PendingEval {
            slot,
            kind,
            round: 1,
        }
    }

    fn batch(kind: InferenceKind, n: usize) -> Batch {
        Batch::new(
            kind,
            (0..n)
                .map(|i| NetworkOutput::from_logits(vec![0.0; 2], i as f32 / 10.0))
                .collect(),
        )
    }

    #[test]
    fn batch_answers_matching_slot() {
        let batch = batch(InferenceKind::SingleStep, 3);
        assert_eq!(batch.len(), 3);
        let output = batch.output_for(&pending(2, InferenceKind::SingleStep));
        assert!((output.value - 0.2).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn batch_slot_out_of_range_panics() {
        batch(InferenceKind::SingleStep, 1).output_for(&pending(1, InferenceKind::SingleStep));
    }

    #[test]
    #[should_panic(expected = "consumed from")]
    fn batch_kind_mismatch_panics() {
        batch(InferenceKind::Initial, 2).output_for(&pending(0, InferenceKind::Recurrent));
    }

    #[test]
    #[should_panic]
    fn empty_batch_has_no_kind() {
        Batch::default().output_for(&pending(0, InferenceKind::SingleStep));
    }

    fn shared(config: SelfPlayConfig) -> Result<SharedSchedulerState<TicTacToe>> {
        let networks = (0..config.num_devices)
            .map(|_| Network::single_step(UniformNetwork::new(9)))
            .collect();
        SharedSchedulerState::new(config, TicTacToe::new, networks, RecordSink::new(io::sink()))
    }

    #[test]
    fn actors_map_to_replicas_round_robin() {
        let state = shared(
            SelfPlayConfig::default()
                .with_parallel_games(5)
                .with_devices(2)
                .with_mcts(MctsConfig::default().with_simulations(2)),
        )
        .unwrap();
        assert_eq!(state.num_actors(), 5);
        assert_eq!(state.num_replicas(), 2);
        let replicas: Vec<usize> = (0..5).map(|i| state.replica_for(i)).collect();
        assert_eq!(replicas, vec![0, 1, 0, 1, 0]);
        assert!(state.is_cpu_phase());
        assert_eq!(state.round(), 0);
    }

    #[test]
    fn replica_count_must_match_devices() {
        let networks = vec![Network::single_step(UniformNetwork::new(9))];
        let result = SharedSchedulerState::new(
            SelfPlayConfig::default().with_devices(2),
            TicTacToe::new,
            networks,
            RecordSink::new(io::sink()),
        );
        assert!(matches!(result, Err(SelfPlayError::Config(_))));
    }

    #[test]
    fn action_size_must_match_environment() {
        let networks = vec![Network::single_step(UniformNetwork::new(10))];
        let result = SharedSchedulerState::new(
            SelfPlayConfig::default(),
            TicTacToe::new,
            networks,
            RecordSink::new(io::sink()),
        );
        assert!(matches!(
            result,
            Err(SelfPlayError::ActionSizeMismatch {
                network: 10,
                environment: 9
            })
        ));
    }

    #[test]
    fn group_rejects_bad_setup_before_spawning() {
        let result = ActorGroup::new(
            SelfPlayConfig::default().with_devices(2).with_threads(2),
            TicTacToe::new,
            vec![Network::single_step(UniformNetwork::new(9))],
            RecordSink::new(io::sink()),
        );
        assert!(matches!(result, Err(SelfPlayError::Config(_))));

        let result = ActorGroup::new(
            SelfPlayConfig::default().with_parallel_games(0),
            TicTacToe::new,
            vec![Network::single_step(UniformNetwork::new(9))],
            RecordSink::new(io::sink()),
        );
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "claimed by two workers")]
    fn double_claim_panics() {
        let state = shared(SelfPlayConfig::default().with_parallel_games(1)).unwrap();
        let _first = state.claim_actor(0);
        let _second = state.claim_actor(0);
    }

    #[test]
    fn cursor_hands_out_each_index_once() {
        let state = shared(SelfPlayConfig::default().with_parallel_games(3)).unwrap();
        state.begin_round();
        let claimed: Vec<usize> = (0..4).map(|_| state.next_actor_index()).collect();
        assert_eq!(claimed, vec![0, 1, 2, 3]);
        state.end_round();
        assert!(!state.is_cpu_phase());
        state.begin_round();
        assert_eq!(state.next_actor_index(), 0);
        assert_eq!(state.round(), 2);
    }
}
