//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameHandle, GameServer};
use crate::ws::Outbox;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub outbox: Arc<Outbox>,
    pub game: GameHandle,
}

impl AppState {
    /// Build the state together with the game task it talks to. The caller
    /// spawns the returned server.
    pub fn new(config: Config) -> (Self, GameServer) {
        let config = Arc::new(config);
        let outbox = Arc::new(Outbox::new());
        let (server, game) = GameServer::new(config.game.clone(), outbox.clone());

        let state = Self {
            config,
            outbox,
            game,
        };
        (state, server)
    }
}
