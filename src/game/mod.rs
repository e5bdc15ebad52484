//! Game simulation modules

pub mod builder;
pub mod collision;
pub mod combat;
pub mod engine;
pub mod maze;
pub mod physics;
pub mod round;
pub mod scheduler;
pub mod scoreboard;
pub mod server;
pub mod snapshot;
pub mod world;

pub use engine::{GameEngine, GameSettings};
pub use round::RoundPhase;
pub use server::{GameHandle, GameServer};

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Client message queued for the game task
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub identity: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
