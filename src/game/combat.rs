//! Ship handling, firing and bullet impacts

use tracing::trace;

use crate::ws::protocol::InputAction;

use super::physics::{PhysicsEngine, Vec2};
use super::world::{Barrier, BarrierColor, EntityId, EntityKind, World};

/// Weapon tuning shared by every ship
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Muzzle speed added to the ship's velocity
    pub bullet_speed: f32,
    /// Ticks between shots
    pub cooldown_ticks: u64,
    /// Ticks before a bullet or impact overlay is removed
    pub bullet_lifetime_ticks: u64,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            bullet_speed: 2.0,
            cooldown_ticks: 30,
            bullet_lifetime_ticks: 60,
        }
    }
}

/// Ship handling tuning
#[derive(Debug, Clone, Copy)]
pub struct HandlingStats {
    pub thrust: f32,
    /// Radians per turn input
    pub turn_speed: f32,
}

impl Default for HandlingStats {
    fn default() -> Self {
        Self {
            thrust: 4.0,
            turn_speed: 0.035,
        }
    }
}

/// Outcome of a bullet striking a barrier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    /// Breakable barrier destroyed
    Destroyed,
    /// Permanent barrier kept; an overlay was spawned and must be expired
    Absorbed { overlay: EntityId },
    /// Bullet or barrier already gone
    Stale,
}

pub struct CombatSystem;

impl CombatSystem {
    /// Cooldown check. A ship that never fired may always fire.
    pub fn can_fire(last_shot_tick: u64, now: u64, stats: &WeaponStats) -> bool {
        last_shot_tick == 0 || now >= last_shot_tick + stats.cooldown_ticks
    }

    /// Apply a movement input to a ship's body. Returns false for `Fire` or a
    /// missing ship.
    pub fn steer(
        world: &World,
        physics: &mut dyn PhysicsEngine,
        ship: EntityId,
        action: InputAction,
        handling: &HandlingStats,
    ) -> bool {
        let Some(entity) = world.get(ship).filter(|e| e.as_ship().is_some()) else {
            return false;
        };
        let heading = Vec2::from_angle(entity.angle);
        match action {
            InputAction::Up => physics.apply_force(entity.body, heading.scale(handling.thrust)),
            InputAction::Down => physics.apply_force(entity.body, heading.scale(-handling.thrust)),
            InputAction::Left => physics.rotate(entity.body, handling.turn_speed),
            InputAction::Right => physics.rotate(entity.body, -handling.turn_speed),
            InputAction::Fire => return false,
        }
        true
    }

    /// Spawn a bullet ahead of the ship's nose if the cooldown allows.
    /// Returns the bullet id; the caller schedules its expiry.
    pub fn fire(
        world: &mut World,
        physics: &mut dyn PhysicsEngine,
        ship: EntityId,
        now: u64,
        stats: &WeaponStats,
    ) -> Option<EntityId> {
        let nose = world.tuning().ship_size;
        let entity = world.get_mut(ship)?;
        let (position, velocity, angle) = (entity.position, entity.velocity, entity.angle);
        let EntityKind::Ship(data) = &mut entity.kind else {
            return None;
        };
        if !Self::can_fire(data.last_shot_tick, now, stats) {
            return None;
        }
        data.last_shot_tick = now;
        let owner = data.owner;

        let heading = Vec2::from_angle(angle);
        let bullet = world.add_bullet(
            physics,
            owner,
            position.add(heading.scale(nose)),
            velocity.add(heading.scale(stats.bullet_speed)),
        );
        trace!(ship_id = ship, bullet_id = bullet, "Bullet fired");
        Some(bullet)
    }

    /// Consume the bullet and break or mark the barrier it hit
    pub fn explode(
        world: &mut World,
        physics: &mut dyn PhysicsEngine,
        bullet: EntityId,
        barrier: EntityId,
    ) -> Impact {
        let hit = match world.get(barrier).map(|e| (&e.kind, e.position)) {
            Some((EntityKind::Barrier(b), position)) => (b.clone(), position),
            _ => return Impact::Stale,
        };
        if world.remove(physics, bullet).is_none() {
            return Impact::Stale;
        }

        let (hit, position) = hit;
        if hit.breakable {
            world.remove(physics, barrier);
            return Impact::Destroyed;
        }
        if hit.transient {
            return Impact::Destroyed;
        }

        let overlay = world.add_barrier(
            physics,
            position,
            Barrier {
                breakable: false,
                color: BarrierColor::White,
                width: hit.width,
                height: hit.height,
                transient: true,
            },
        );
        Impact::Absorbed { overlay }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::ArcadePhysics;
    use crate::game::world::{BodyTuning, Ship};
    use uuid::Uuid;

    fn setup() -> (ArcadePhysics, World, EntityId) {
        let mut physics = ArcadePhysics::new(16.0, 9.0);
        let mut world = World::new(BodyTuning::default());
        let ship = Ship {
            owner: Uuid::new_v4(),
            group_code: "ABCD".into(),
            controller_name: "ann".into(),
            viewer_name: "bob".into(),
            score: 0,
            won: false,
            last_shot_tick: 0,
        };
        let id = world.add_ship(&mut physics, ship, Vec2::ZERO);
        (physics, world, id)
    }

    fn barrier(breakable: bool) -> Barrier {
        Barrier {
            breakable,
            color: if breakable {
                BarrierColor::Blue
            } else {
                BarrierColor::White
            },
            width: 1.0,
            height: 2.0,
            transient: false,
        }
    }

    #[test]
    fn fire_respects_cooldown() {
        let (mut physics, mut world, ship) = setup();
        let stats = WeaponStats::default();

        assert!(CombatSystem::fire(&mut world, &mut physics, ship, 5, &stats).is_some());
        assert!(CombatSystem::fire(&mut world, &mut physics, ship, 34, &stats).is_none());
        assert!(CombatSystem::fire(&mut world, &mut physics, ship, 35, &stats).is_some());
        assert_eq!(world.len(), 3);
    }

    #[test]
    fn bullet_leaves_from_the_nose() {
        let (mut physics, mut world, ship) = setup();
        let bullet =
            CombatSystem::fire(&mut world, &mut physics, ship, 1, &WeaponStats::default()).unwrap();
        let entity = world.get(bullet).unwrap();
        assert!((entity.position.x - 0.4).abs() < 1e-6);
        assert!((entity.velocity.x - 2.0).abs() < 1e-6);
        assert!(matches!(entity.kind, EntityKind::Bullet(_)));
    }

    #[test]
    fn steering_turns_and_thrusts() {
        let (mut physics, mut world, ship) = setup();
        let handling = HandlingStats::default();
        assert!(CombatSystem::steer(&world, &mut physics, ship, InputAction::Left, &handling));
        assert!(CombatSystem::steer(&world, &mut physics, ship, InputAction::Up, &handling));
        assert!(!CombatSystem::steer(&world, &mut physics, ship, InputAction::Fire, &handling));

        physics.step(1.0 / 60.0);
        world.refresh_from_physics(&physics);
        let entity = world.get(ship).unwrap();
        assert!((entity.angle - 0.035).abs() < 1e-6);
        assert!(entity.velocity.x > 0.0);
    }

    #[test]
    fn permanent_barrier_absorbs_bullet() {
        let (mut physics, mut world, ship) = setup();
        let wall = world.add_barrier(&mut physics, Vec2::new(3.0, 0.0), barrier(false));
        let bullet =
            CombatSystem::fire(&mut world, &mut physics, ship, 1, &WeaponStats::default()).unwrap();

        let Impact::Absorbed { overlay } =
            CombatSystem::explode(&mut world, &mut physics, bullet, wall)
        else {
            panic!("expected overlay");
        };
        assert!(!world.contains(bullet));
        assert!(world.contains(wall));
        let EntityKind::Barrier(b) = &world.get(overlay).unwrap().kind else {
            panic!("overlay is a barrier");
        };
        assert!(b.transient);
        assert_eq!((b.width, b.height), (1.0, 2.0));
        assert_eq!(world.get(overlay).unwrap().position, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn breakable_barrier_is_destroyed() {
        let (mut physics, mut world, ship) = setup();
        let wall = world.add_barrier(&mut physics, Vec2::new(3.0, 0.0), barrier(true));
        let bullet =
            CombatSystem::fire(&mut world, &mut physics, ship, 1, &WeaponStats::default()).unwrap();

        assert_eq!(
            CombatSystem::explode(&mut world, &mut physics, bullet, wall),
            Impact::Destroyed
        );
        assert!(!world.contains(bullet));
        assert!(!world.contains(wall));
        assert_eq!(
            CombatSystem::explode(&mut world, &mut physics, bullet, wall),
            Impact::Stale
        );
    }
}
