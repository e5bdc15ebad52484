//! Game task: owns the engine and drives it at the simulation rate

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::interval;
use tracing::info;

use crate::util::time::SIMULATION_TPS;
use crate::ws::outbox::Outbox;

use super::engine::{GameEngine, GameSettings};
use super::round::RoundPhase;
use super::PlayerInput;

/// Inbound queue depth shared by all connections
const INPUT_QUEUE_CAPACITY: usize = 1024;

/// Counters published by the game task after each tick
#[derive(Debug, Default)]
pub struct GameStats {
    tick: AtomicU64,
    groups: AtomicUsize,
    phase: AtomicU8,
}

/// Handle to the running game task
#[derive(Clone)]
pub struct GameHandle {
    pub input_tx: mpsc::Sender<PlayerInput>,
    stats: Arc<GameStats>,
}

impl GameHandle {
    pub fn tick(&self) -> u64 {
        self.stats.tick.load(Ordering::Relaxed)
    }

    pub fn group_count(&self) -> usize {
        self.stats.groups.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> RoundPhase {
        RoundPhase::from_u8(self.stats.phase.load(Ordering::Relaxed))
    }
}

/// The authoritative game loop
pub struct GameServer {
    engine: GameEngine,
    input_rx: mpsc::Receiver<PlayerInput>,
    stats: Arc<GameStats>,
}

impl GameServer {
    pub fn new(settings: GameSettings, outbox: Arc<Outbox>) -> (Self, GameHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let stats = Arc::new(GameStats::default());

        let handle = GameHandle {
            input_tx,
            stats: stats.clone(),
        };
        let server = Self {
            engine: GameEngine::new(settings, outbox),
            input_rx,
            stats,
        };
        (server, handle)
    }

    /// Run the tick loop until every input sender is dropped
    pub async fn run(mut self) {
        info!(tps = SIMULATION_TPS, "Game loop started");

        let tick_duration = Duration::from_micros(1_000_000 / SIMULATION_TPS as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            if !self.process_inputs() {
                break;
            }
            self.engine.run_tick();
            self.publish_stats();
        }

        info!(tick = self.engine.tick(), "Game loop stopped");
    }

    /// Drain the input queue. Returns false once all senders are gone.
    fn process_inputs(&mut self) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(input) => self.engine.handle_input(input),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn publish_stats(&self) {
        self.stats.tick.store(self.engine.tick(), Ordering::Relaxed);
        self.stats
            .groups
            .store(self.engine.registry().len(), Ordering::Relaxed);
        self.stats
            .phase
            .store(self.engine.phase().as_u8(), Ordering::Relaxed);
    }
}
