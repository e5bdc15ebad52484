//! Entities of the shared world and their physics bodies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::physics::{
    BodyDesc, BodyHandle, PhysicsEngine, Shape, Vec2, GROUP_BARRIER, GROUP_BULLET,
    GROUP_FINISH_LINE, GROUP_SHIP,
};

/// World entity id, never reused within a process
pub type EntityId = u32;

/// Tunables for ship and bullet bodies
#[derive(Debug, Clone)]
pub struct BodyTuning {
    pub ship_size: f32,
    pub ship_mass: f32,
    pub ship_damping: f32,
    pub bullet_radius: f32,
    pub bullet_mass: f32,
    pub barrier_mass: f32,
}

impl Default for BodyTuning {
    fn default() -> Self {
        Self {
            ship_size: 0.4,
            ship_mass: 1.0,
            ship_damping: 0.7,
            bullet_radius: 0.03,
            bullet_mass: 0.05,
            barrier_mass: 100_000.0,
        }
    }
}

/// Barrier tint sent to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierColor {
    White,
    Blue,
}

/// Ship data carried across respawns
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub owner: Uuid,
    pub group_code: String,
    pub controller_name: String,
    pub viewer_name: String,
    pub score: u32,
    pub won: bool,
    /// Tick of the last shot, 0 = never fired
    pub last_shot_tick: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bullet {
    /// Identity of the ship owner that fired it
    pub owner: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Barrier {
    pub breakable: bool,
    pub color: BarrierColor,
    pub width: f32,
    pub height: f32,
    /// Impact overlay spawned by a shot, removed after a lifetime
    pub transient: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishLine {
    pub width: f32,
    pub height: f32,
}

/// Entity variants
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Ship(Ship),
    Bullet(Bullet),
    Barrier(Barrier),
    FinishLine(FinishLine),
}

/// A world object; its physics body is owned exclusively by the entity
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub body: BodyHandle,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub kind: EntityKind,
}

impl Entity {
    pub fn as_ship(&self) -> Option<&Ship> {
        match &self.kind {
            EntityKind::Ship(ship) => Some(ship),
            _ => None,
        }
    }

    pub fn is_barrier_or_finish(&self) -> bool {
        matches!(self.kind, EntityKind::Barrier(_) | EntityKind::FinishLine(_))
    }
}

/// The shared world. Physics is passed in per call; the world only keeps
/// handles.
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
    tuning: BodyTuning,
}

impl World {
    pub fn new(tuning: BodyTuning) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
            tuning,
        }
    }

    pub fn tuning(&self) -> &BodyTuning {
        &self.tuning
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Reverse lookup from a physics body to its entity (linear scan)
    pub fn entity_by_body(&self, body: BodyHandle) -> Option<&Entity> {
        self.entities.values().find(|e| e.body == body)
    }

    /// Ship owned by `owner`, if one is in the world
    pub fn ship_of(&self, owner: Uuid) -> Option<&Entity> {
        self.entities
            .values()
            .find(|e| e.as_ship().is_some_and(|s| s.owner == owner))
    }

    pub fn ship_of_group(&self, code: &str) -> Option<&Entity> {
        self.entities
            .values()
            .find(|e| e.as_ship().is_some_and(|s| s.group_code == code))
    }

    pub fn ids_where(&self, pred: impl Fn(&Entity) -> bool) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| pred(e))
            .map(|e| e.id)
            .collect()
    }

    fn insert(
        &mut self,
        physics: &mut dyn PhysicsEngine,
        desc: BodyDesc,
        shape: Shape,
        group: u32,
        mask: u32,
        kind: EntityKind,
    ) -> EntityId {
        let body = physics.create_body(desc);
        physics.add_shape(body, shape, group, mask);
        let id = self.next_id;
        self.next_id += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                body,
                position: desc.position,
                velocity: desc.velocity,
                angle: desc.angle,
                kind,
            },
        );
        id
    }

    pub fn add_ship(&mut self, physics: &mut dyn PhysicsEngine, ship: Ship, at: Vec2) -> EntityId {
        let desc = BodyDesc {
            damping: self.tuning.ship_damping,
            ..BodyDesc::at(self.tuning.ship_mass, at)
        };
        let shape = Shape::Circle {
            radius: self.tuning.ship_size,
        };
        self.insert(
            physics,
            desc,
            shape,
            GROUP_SHIP,
            GROUP_BARRIER | GROUP_FINISH_LINE,
            EntityKind::Ship(ship),
        )
    }

    pub fn add_bullet(
        &mut self,
        physics: &mut dyn PhysicsEngine,
        owner: Uuid,
        position: Vec2,
        velocity: Vec2,
    ) -> EntityId {
        let desc = BodyDesc {
            velocity,
            ..BodyDesc::at(self.tuning.bullet_mass, position)
        };
        let shape = Shape::Circle {
            radius: self.tuning.bullet_radius,
        };
        self.insert(
            physics,
            desc,
            shape,
            GROUP_BULLET,
            GROUP_BARRIER,
            EntityKind::Bullet(Bullet { owner }),
        )
    }

    pub fn add_barrier(
        &mut self,
        physics: &mut dyn PhysicsEngine,
        position: Vec2,
        barrier: Barrier,
    ) -> EntityId {
        let desc = BodyDesc::at(self.tuning.barrier_mass, position);
        let shape = Shape::Box {
            width: barrier.width,
            height: barrier.height,
        };
        self.insert(
            physics,
            desc,
            shape,
            GROUP_BARRIER,
            GROUP_BULLET | GROUP_SHIP,
            EntityKind::Barrier(barrier),
        )
    }

    pub fn add_finish_line(
        &mut self,
        physics: &mut dyn PhysicsEngine,
        position: Vec2,
        width: f32,
        height: f32,
    ) -> EntityId {
        let desc = BodyDesc::at(self.tuning.barrier_mass, position);
        self.insert(
            physics,
            desc,
            Shape::Box { width, height },
            GROUP_FINISH_LINE,
            GROUP_SHIP,
            EntityKind::FinishLine(FinishLine { width, height }),
        )
    }

    /// Remove an entity and destroy its body. Removing a missing id is a no-op.
    pub fn remove(&mut self, physics: &mut dyn PhysicsEngine, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        physics.remove_body(entity.body);
        Some(entity)
    }

    pub fn remove_where(
        &mut self,
        physics: &mut dyn PhysicsEngine,
        pred: impl Fn(&Entity) -> bool,
    ) -> usize {
        let ids = self.ids_where(pred);
        for id in &ids {
            self.remove(physics, *id);
        }
        ids.len()
    }

    /// Destroy a ship's body and recreate it at `spawn` with zero velocity
    /// and angle, keeping score, names and group. Returns the new id.
    pub fn respawn_ship(
        &mut self,
        physics: &mut dyn PhysicsEngine,
        id: EntityId,
        spawn: Vec2,
    ) -> Option<EntityId> {
        let ship = self.get(id)?.as_ship()?.clone();
        self.remove(physics, id);
        Some(self.add_ship(physics, ship, spawn))
    }

    /// Copy kinematic state back from the engine after a step
    pub fn refresh_from_physics(&mut self, physics: &dyn PhysicsEngine) {
        for entity in self.entities.values_mut() {
            if let Some(state) = physics.body(entity.body) {
                entity.position = state.position;
                entity.velocity = state.velocity;
                entity.angle = state.angle;
            }
        }
    }
}
