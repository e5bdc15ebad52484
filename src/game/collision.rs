//! Maps raw contact pairs to world effects

use super::physics::Contact;
use super::world::{EntityId, EntityKind, World};

/// What a contact does to the world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEffect {
    /// Bullet hit a barrier. The bullet is consumed; the barrier goes only
    /// if breakable.
    Explode { bullet: EntityId, barrier: EntityId },
    /// Ship touched a barrier and returns to the spawn point
    ResetShip(EntityId),
    /// Ship reached the finish line
    Goal(EntityId),
}

/// Resolve a contact against the live world. Pairs with a side that no
/// longer maps to an entity, or with no rule, resolve to `None`.
pub fn resolve(world: &World, contact: Contact) -> Option<CollisionEffect> {
    let a = world.entity_by_body(contact.a)?;
    let b = world.entity_by_body(contact.b)?;

    dispatch(a.id, &a.kind, b.id, &b.kind).or_else(|| dispatch(b.id, &b.kind, a.id, &a.kind))
}

fn dispatch(
    first: EntityId,
    first_kind: &EntityKind,
    second: EntityId,
    second_kind: &EntityKind,
) -> Option<CollisionEffect> {
    match (first_kind, second_kind) {
        (EntityKind::Bullet(_), EntityKind::Barrier(_)) => Some(CollisionEffect::Explode {
            bullet: first,
            barrier: second,
        }),
        (EntityKind::Ship(_), EntityKind::Barrier(_)) => Some(CollisionEffect::ResetShip(first)),
        (EntityKind::Ship(_), EntityKind::FinishLine(_)) => Some(CollisionEffect::Goal(first)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::{ArcadePhysics, BodyHandle, Vec2};
    use crate::game::world::{Barrier, BarrierColor, BodyTuning, Ship};
    use uuid::Uuid;

    struct Fixture {
        physics: ArcadePhysics,
        world: World,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                physics: ArcadePhysics::new(16.0, 9.0),
                world: World::new(BodyTuning::default()),
            }
        }

        fn body(&self, id: EntityId) -> BodyHandle {
            self.world.get(id).unwrap().body
        }

        fn ship(&mut self) -> EntityId {
            let ship = Ship {
                owner: Uuid::new_v4(),
                group_code: "ABCD".into(),
                controller_name: "ann".into(),
                viewer_name: "bob".into(),
                score: 0,
                won: false,
                last_shot_tick: 0,
            };
            self.world.add_ship(&mut self.physics, ship, Vec2::ZERO)
        }

        fn barrier(&mut self) -> EntityId {
            let barrier = Barrier {
                breakable: false,
                color: BarrierColor::White,
                width: 1.0,
                height: 1.0,
                transient: false,
            };
            self.world.add_barrier(&mut self.physics, Vec2::ZERO, barrier)
        }
    }

    #[test]
    fn dispatch_is_order_independent() {
        let mut fx = Fixture::new();
        let bullet = fx
            .world
            .add_bullet(&mut fx.physics, Uuid::new_v4(), Vec2::ZERO, Vec2::ZERO);
        let barrier = fx.barrier();
        let expected = Some(CollisionEffect::Explode { bullet, barrier });

        let (hb, hw) = (fx.body(bullet), fx.body(barrier));
        assert_eq!(resolve(&fx.world, Contact { a: hb, b: hw }), expected);
        assert_eq!(resolve(&fx.world, Contact { a: hw, b: hb }), expected);
    }

    #[test]
    fn ship_contacts() {
        let mut fx = Fixture::new();
        let ship = fx.ship();
        let barrier = fx.barrier();
        let finish = fx
            .world
            .add_finish_line(&mut fx.physics, Vec2::ZERO, 1.0, 1.0);

        assert_eq!(
            resolve(&fx.world, Contact { a: fx.body(barrier), b: fx.body(ship) }),
            Some(CollisionEffect::ResetShip(ship))
        );
        assert_eq!(
            resolve(&fx.world, Contact { a: fx.body(ship), b: fx.body(finish) }),
            Some(CollisionEffect::Goal(ship))
        );
    }

    #[test]
    fn stale_or_unmatched_pairs_are_ignored() {
        let mut fx = Fixture::new();
        let ship = fx.ship();
        let other = fx.ship();
        let barrier = fx.barrier();
        let (hs, hw) = (fx.body(ship), fx.body(barrier));

        assert_eq!(
            resolve(&fx.world, Contact { a: hs, b: fx.body(other) }),
            None
        );

        fx.world.remove(&mut fx.physics, barrier);
        assert_eq!(resolve(&fx.world, Contact { a: hs, b: hw }), None);
    }
}
