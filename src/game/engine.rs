//! The authoritative game core: seats, round lifecycle, world and collisions.
//!
//! Everything here runs synchronously on the game task. Inputs are applied
//! between ticks and never concurrently with a physics step.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::matchmaking::{GroupError, GroupRegistry, Seat};
use crate::util::time::{secs_to_ticks, tick_delta, unix_millis, SIMULATION_TPS, SNAPSHOT_TPS};
use crate::ws::outbox::Outbox;
use crate::ws::protocol::{ClientMsg, InputAction, ServerMsg};

use super::builder::{ArenaSize, Layout, WorldBuilder};
use super::collision::{self, CollisionEffect};
use super::combat::{CombatSystem, HandlingStats, Impact, WeaponStats};
use super::maze::MazeConfig;
use super::physics::{ArcadePhysics, PhysicsEngine};
use super::round::{Admission, RoundLifecycle, RoundPhase, Withdrawal};
use super::scheduler::{Scheduler, Task};
use super::snapshot::SnapshotBuilder;
use super::world::{BodyTuning, Entity, EntityId, EntityKind, Ship, World};
use super::PlayerInput;

/// Game rules and tuning
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub staging_seconds: u32,
    pub winning_score: u32,
    /// Seed for the game RNG; random when unset
    pub seed: Option<u64>,
    pub arena: ArenaSize,
    pub maze: MazeConfig,
    pub layouts: Vec<Layout>,
    pub tuning: BodyTuning,
    pub weapon: WeaponStats,
    pub handling: HandlingStats,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            staging_seconds: 5,
            winning_score: 5,
            seed: None,
            arena: ArenaSize::default(),
            maze: MazeConfig::default(),
            layouts: Layout::ALL.to_vec(),
            tuning: BodyTuning::default(),
            weapon: WeaponStats::default(),
            handling: HandlingStats::default(),
        }
    }
}

pub struct GameEngine {
    settings: GameSettings,
    tick: u64,
    registry: GroupRegistry,
    round: RoundLifecycle,
    world: World,
    physics: Box<dyn PhysicsEngine>,
    builder: WorldBuilder,
    scheduler: Scheduler,
    rng: ChaCha8Rng,
    outbox: Arc<Outbox>,
    snapshots: SnapshotBuilder,
}

impl GameEngine {
    pub fn new(settings: GameSettings, outbox: Arc<Outbox>) -> Self {
        let physics = Box::new(ArcadePhysics::new(
            settings.arena.width,
            settings.arena.height,
        ));
        let seed = settings.seed.unwrap_or_else(rand::random);
        info!(seed, "Game engine created");

        Self {
            tick: 0,
            registry: GroupRegistry::new(),
            round: RoundLifecycle::new(),
            world: World::new(settings.tuning.clone()),
            physics,
            builder: WorldBuilder::with_layouts(
                settings.layouts.clone(),
                settings.maze.clone(),
                settings.arena,
            ),
            scheduler: Scheduler::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            outbox,
            snapshots: SnapshotBuilder::new(SIMULATION_TPS / SNAPSHOT_TPS),
            settings,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    pub fn round(&self) -> &RoundLifecycle {
        &self.round
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Apply one client message
    pub fn handle_input(&mut self, input: PlayerInput) {
        let identity = input.identity;
        trace!(
            identity = %identity,
            lag_ms = unix_millis().saturating_sub(input.received_at),
            "Input received"
        );

        match input.msg {
            ClientMsg::Join { code, display_name } => {
                self.handle_join(identity, &code, &display_name);
            }
            ClientMsg::Ready => self.handle_ready(identity),
            ClientMsg::SwapRole => self.handle_swap(identity),
            ClientMsg::Leave => self.handle_leave(identity),
            ClientMsg::Input { action } => self.handle_control(identity, action),
            ClientMsg::Ping { t } => {
                self.outbox.send(identity, ServerMsg::Pong { t });
            }
        }
    }

    /// Advance one simulation tick
    pub fn run_tick(&mut self) {
        self.tick += 1;

        for task in self.scheduler.drain_due(self.tick) {
            match task {
                Task::BeginRound => self.begin_round(),
                Task::Expire(id) => {
                    if self.world.remove(self.physics.as_mut(), id).is_none() {
                        trace!(entity_id = id, "Expired entity already gone");
                    }
                }
            }
        }

        if self.round.phase() == RoundPhase::Active {
            self.physics.step(tick_delta());
            self.world.refresh_from_physics(self.physics.as_ref());

            for contact in self.physics.drain_contacts() {
                match collision::resolve(&self.world, contact) {
                    Some(effect) => self.apply(effect),
                    None => trace!(?contact, "Contact ignored"),
                }
            }
        }

        let forced = self.snapshots.is_forced();
        if self.snapshots.should_send() && (forced || self.round.phase() == RoundPhase::Active) {
            let snapshot = self.snapshots.build(self.tick, &self.world);
            self.outbox.broadcast(&ServerMsg::WorldUpdate { snapshot });
        }
    }

    fn handle_join(&mut self, identity: Uuid, code: &str, display_name: &str) {
        let switching = self
            .registry
            .code_of(identity)
            .is_some_and(|current| current != code.trim());
        if switching {
            // The current seat is kept unless the target accepts
            if let Err(e) = self.registry.can_join(code, identity) {
                self.reject_join(identity, e);
                return;
            }
            self.handle_leave(identity);
        }

        let name = match display_name.trim() {
            "" => format!("Player_{}", &identity.to_string()[..8]),
            name => name.to_string(),
        };

        match self.registry.join_or_create(code, identity, &name) {
            Ok(seat) => {
                let code = code.trim();
                info!(code, identity = %identity, seat = ?seat, "Seat assigned");
                if !self.registry.get(code).is_some_and(|g| g.occupied) {
                    self.outbox.send(identity, ServerMsg::WaitingForPlayer);
                }
                self.notify_group(code);
            }
            Err(e) => self.reject_join(identity, e),
        }
    }

    fn reject_join(&self, identity: Uuid, error: GroupError) {
        match error {
            GroupError::Full(code) => {
                warn!(code = %code, identity = %identity, "Join rejected, group full");
                self.outbox.send(identity, ServerMsg::GroupFull);
            }
            e @ GroupError::InvalidCode => {
                self.outbox
                    .send(identity, ServerMsg::error("invalid_code", e.to_string()));
            }
        }
    }

    fn handle_ready(&mut self, identity: Uuid) {
        let Some(code) = self.registry.code_of(identity).map(str::to_owned) else {
            self.outbox
                .send(identity, ServerMsg::error("not_in_group", "Join a group first"));
            return;
        };

        let ready = self.registry.toggle_ready(&code, identity);
        self.notify_group(&code);
        if ready {
            self.admit(&code);
        } else {
            self.withdraw(&code);
        }
    }

    fn handle_swap(&mut self, identity: Uuid) {
        let Some(code) = self.registry.code_of(identity).map(str::to_owned) else {
            self.outbox
                .send(identity, ServerMsg::error("not_in_group", "Join a group first"));
            return;
        };
        if self.registry.swap_seats(&code) {
            debug!(code = %code, mid_round = self.round.is_admitted(&code), "Seats swapped");
            self.notify_group(&code);
        }
    }

    fn handle_leave(&mut self, identity: Uuid) {
        let Some(departure) = self.registry.leave(identity) else {
            return;
        };
        info!(
            code = %departure.code,
            identity = %identity,
            seat = ?departure.seat,
            group_deleted = departure.group_deleted,
            "Seat vacated"
        );

        // Bullet timers stay scheduled and expire as no-ops
        let removed = self.world.remove_where(self.physics.as_mut(), |e| match &e.kind {
            EntityKind::Ship(ship) => ship.owner == identity,
            EntityKind::Bullet(bullet) => bullet.owner == identity,
            _ => false,
        });
        if removed > 0 {
            debug!(identity = %identity, removed, "Removed departed player's entities");
        }

        self.withdraw(&departure.code);
        if !departure.group_deleted {
            self.notify_group(&departure.code);
        }
    }

    fn handle_control(&mut self, identity: Uuid, action: InputAction) {
        if self.round.phase() != RoundPhase::Active {
            return;
        }
        let Some(ship) = self.world.ship_of(identity).map(|e| e.id) else {
            return;
        };

        match action {
            InputAction::Fire => {
                if let Some(bullet) = CombatSystem::fire(
                    &mut self.world,
                    self.physics.as_mut(),
                    ship,
                    self.tick,
                    &self.settings.weapon,
                ) {
                    self.expire_later(bullet);
                }
            }
            _ => {
                CombatSystem::steer(
                    &self.world,
                    self.physics.as_mut(),
                    ship,
                    action,
                    &self.settings.handling,
                );
            }
        }
    }

    /// A group's seats are both ready
    fn admit(&mut self, code: &str) {
        match self.round.on_group_ready(code) {
            Admission::StartStaging => {
                let delay = secs_to_ticks(self.settings.staging_seconds as f32);
                let task = self.scheduler.schedule(self.tick, delay, Task::BeginRound);
                self.round.begin_staging(task, self.tick + delay);
                info!(code, seconds = self.settings.staging_seconds, "Staging started");
                self.outbox.broadcast(&ServerMsg::GameStaging {
                    countdown_seconds: self.settings.staging_seconds,
                });
            }
            Admission::Queued => {
                info!(code, "Group queued for next round");
                let msg = ServerMsg::GameStaging {
                    countdown_seconds: self.staging_seconds_left(),
                };
                self.send_group(code, &msg);
            }
            Admission::JoinActive => {
                info!(code, "Group joined active round");
                self.enter_round(code);
                self.send_scoreboards();
            }
            Admission::Unchanged => {}
        }
    }

    /// Take a group out of the pending or admitted set
    fn withdraw(&mut self, code: &str) {
        match self.round.withdraw(code) {
            Withdrawal::Pending { now_empty: true } => {
                if let Some(task) = self.round.reset() {
                    self.scheduler.cancel(task);
                }
                info!(code, "Staging cancelled, no ready groups left");
            }
            Withdrawal::Pending { now_empty: false } => {
                debug!(code, "Group left the staging queue");
            }
            Withdrawal::Admitted { now_empty } => {
                self.registry.set_round_active(code, false);
                self.world.remove_where(self.physics.as_mut(), |e| {
                    e.as_ship().is_some_and(|s| s.group_code == code)
                });
                info!(code, "Group withdrawn from round");

                if now_empty {
                    self.clear_world();
                    self.round.reset();
                    self.snapshots.force_next();
                    info!("Round abandoned, no groups left");
                } else {
                    self.send_scoreboards();
                }
            }
            Withdrawal::NotEntered => {}
        }
    }

    /// Countdown elapsed: build the world and spawn a ship per group
    fn begin_round(&mut self) {
        let codes = self.round.activate();
        if codes.is_empty() {
            info!("Countdown elapsed with no ready groups");
            return;
        }

        self.clear_world();
        match self
            .builder
            .build(&mut self.world, self.physics.as_mut(), &mut self.rng)
        {
            Ok(layout) => info!(layout = ?layout, groups = codes.len(), "Round started"),
            Err(e) => {
                error!(error = %e, "Could not build round world");
                self.round.reset();
                return;
            }
        }

        for code in &codes {
            self.enter_round(code);
        }
        self.send_scoreboards();
    }

    /// Spawn a group's ship and tell both seats
    fn enter_round(&mut self, code: &str) {
        if self.world.ship_of_group(code).is_some() {
            return;
        }
        let Some(group) = self.registry.get(code) else {
            return;
        };
        let (Some(owner), Some(viewer)) = (group.controller.identity, group.viewer.identity) else {
            return;
        };
        let ship = Ship {
            owner,
            group_code: code.to_string(),
            controller_name: group.controller.name.clone().unwrap_or_default(),
            viewer_name: group.viewer.name.clone().unwrap_or_default(),
            score: self.round.scoreboard.score(code).unwrap_or(0),
            won: false,
            last_shot_tick: 0,
        };

        let ship_id = self
            .world
            .add_ship(self.physics.as_mut(), ship, self.builder.spawn());
        self.registry.set_round_active(code, true);
        debug!(code, ship_id, "Ship spawned");

        let winning_score = self.settings.winning_score;
        self.outbox.send(
            owner,
            ServerMsg::GameBegin {
                ship_id,
                is_viewer: false,
                winning_score,
            },
        );
        self.outbox.send(
            viewer,
            ServerMsg::GameBegin {
                ship_id,
                is_viewer: true,
                winning_score,
            },
        );
    }

    fn apply(&mut self, effect: CollisionEffect) {
        match effect {
            CollisionEffect::Explode { bullet, barrier } => {
                match CombatSystem::explode(&mut self.world, self.physics.as_mut(), bullet, barrier)
                {
                    Impact::Absorbed { overlay } => self.expire_later(overlay),
                    Impact::Destroyed => debug!(barrier_id = barrier, "Barrier destroyed"),
                    Impact::Stale => trace!(bullet_id = bullet, "Stale bullet impact"),
                }
            }
            CollisionEffect::ResetShip(ship) => {
                let spawn = self.builder.spawn();
                if let Some(new_id) = self.world.respawn_ship(self.physics.as_mut(), ship, spawn) {
                    debug!(ship_id = ship, new_id, "Ship reset to spawn");
                }
            }
            CollisionEffect::Goal(ship) => self.goal(ship),
        }
    }

    fn goal(&mut self, ship_id: EntityId) {
        let Some(code) = self
            .world
            .get(ship_id)
            .and_then(Entity::as_ship)
            .map(|s| s.group_code.clone())
        else {
            return;
        };
        let Some(score) = self.round.scoreboard.increment(&code) else {
            debug!(code = %code, "Goal by a group outside the round");
            return;
        };
        if let Some(EntityKind::Ship(ship)) = self.world.get_mut(ship_id).map(|e| &mut e.kind) {
            ship.score = score;
            ship.won = true;
        }
        info!(code = %code, score, "Goal");
        self.send_scoreboards();

        if score >= self.settings.winning_score {
            self.finish_round(&code);
        } else {
            self.regenerate();
        }
    }

    /// New layout after a non-winning goal, ships back at the spawn point
    fn regenerate(&mut self) {
        self.builder.clear(&mut self.world, self.physics.as_mut());
        match self
            .builder
            .build(&mut self.world, self.physics.as_mut(), &mut self.rng)
        {
            Ok(layout) => info!(layout = ?layout, "World regenerated"),
            Err(e) => {
                error!(error = %e, "Regeneration refused");
                return;
            }
        }

        let spawn = self.builder.spawn();
        for id in self.world.ids_where(|e| e.as_ship().is_some()) {
            let Some(new_id) = self.world.respawn_ship(self.physics.as_mut(), id, spawn) else {
                continue;
            };
            if let Some(EntityKind::Ship(ship)) = self.world.get_mut(new_id).map(|e| &mut e.kind) {
                ship.won = false;
            }
        }
    }

    /// Winning score reached: clear the world and send everyone back to wait
    fn finish_round(&mut self, winner: &str) {
        let winner_names: Vec<String> = self
            .registry
            .get(winner)
            .map(|g| {
                [&g.controller.name, &g.viewer.name]
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        self.clear_world();
        let admitted: Vec<String> = self.round.admitted().iter().cloned().collect();
        self.round.reset();

        for code in &admitted {
            self.registry.reset_ready(code);
            self.registry.set_round_active(code, false);
            let won = ServerMsg::GameWon {
                winner_names: winner_names.clone(),
                is_self: code == winner,
            };
            self.send_group(code, &won);
            self.send_group(code, &ServerMsg::WaitingForPlayer);
            self.notify_group(code);
        }

        self.snapshots.force_next();
        info!(winner, groups = admitted.len(), "Round finished");
    }

    /// Remove every entity. Pending expiry tasks become no-ops.
    fn clear_world(&mut self) {
        self.world.remove_where(self.physics.as_mut(), |_| true);
    }

    fn expire_later(&mut self, id: EntityId) {
        self.scheduler.schedule(
            self.tick,
            self.settings.weapon.bullet_lifetime_ticks,
            Task::Expire(id),
        );
    }

    fn staging_seconds_left(&self) -> u32 {
        let tps = SIMULATION_TPS as u64;
        let left = self
            .round
            .staging_due()
            .map_or(0, |due| due.saturating_sub(self.tick));
        left.div_ceil(tps) as u32
    }

    fn send_group(&self, code: &str, msg: &ServerMsg) {
        if let Some(group) = self.registry.get(code) {
            self.outbox.send_all(&group.members(), msg);
        }
    }

    /// Push the group's seat state to both seats
    fn notify_group(&self, code: &str) {
        if let Some(group) = self.registry.get(code) {
            self.outbox
                .send_all(&group.members(), &ServerMsg::GroupUpdate(group.view()));
        }
    }

    fn send_scoreboards(&self) {
        for code in self.round.admitted() {
            if let Some(msg) = self.round.scoreboard.message_for(&self.registry, code) {
                self.send_group(code, &msg);
            }
        }
    }

    /// Seat an identity holds, for callers outside the engine
    pub fn seat_of(&self, identity: Uuid) -> Option<Seat> {
        let code = self.registry.code_of(identity)?;
        self.registry.get(code)?.seat_of(identity)
    }
}
