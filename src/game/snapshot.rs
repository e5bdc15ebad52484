//! World snapshots for network transmission

use serde::{Deserialize, Serialize};

use super::world::{BarrierColor, Entity, EntityId, EntityKind, World};

/// Full authoritative world state at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub entities: Vec<EntitySnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub angle: f32,
    #[serde(flatten)]
    pub kind: KindSnapshot,
}

/// Kind-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindSnapshot {
    Ship {
        group_code: String,
        controller_name: String,
        viewer_name: String,
        score: u32,
    },
    Bullet,
    Barrier {
        breakable: bool,
        color: BarrierColor,
        width: f32,
        height: f32,
    },
    FinishLine {
        width: f32,
        height: f32,
    },
}

impl From<&Entity> for EntitySnapshot {
    fn from(entity: &Entity) -> Self {
        let kind = match &entity.kind {
            EntityKind::Ship(ship) => KindSnapshot::Ship {
                group_code: ship.group_code.clone(),
                controller_name: ship.controller_name.clone(),
                viewer_name: ship.viewer_name.clone(),
                score: ship.score,
            },
            EntityKind::Bullet(_) => KindSnapshot::Bullet,
            EntityKind::Barrier(barrier) => KindSnapshot::Barrier {
                breakable: barrier.breakable,
                color: barrier.color,
                width: barrier.width,
                height: barrier.height,
            },
            EntityKind::FinishLine(finish) => KindSnapshot::FinishLine {
                width: finish.width,
                height: finish.height,
            },
        };
        Self {
            id: entity.id,
            x: entity.position.x,
            y: entity.position.y,
            vel_x: entity.velocity.x,
            vel_y: entity.velocity.y,
            angle: entity.angle,
            kind,
        }
    }
}

/// Decides when snapshots go out and builds them
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
    forced: bool,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
            forced: false,
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.forced || self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            self.forced = false;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.forced = true;
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn build(&self, tick: u64, world: &World) -> WorldSnapshot {
        WorldSnapshot {
            tick,
            entities: world.iter().map(EntitySnapshot::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::physics::{ArcadePhysics, Vec2};
    use crate::game::world::BodyTuning;

    #[test]
    fn sends_every_interval() {
        let mut builder = SnapshotBuilder::new(6);
        let sent: Vec<bool> = (0..12).map(|_| builder.should_send()).collect();
        assert_eq!(sent.iter().filter(|s| **s).count(), 2);
        assert!(sent[5] && sent[11]);
    }

    #[test]
    fn forced_snapshot_goes_out_next_tick() {
        let mut builder = SnapshotBuilder::new(6);
        assert!(!builder.should_send());
        builder.force_next();
        assert!(builder.should_send());
        assert!(!builder.should_send());
    }

    #[test]
    fn entities_are_tagged_by_kind() {
        let mut physics = ArcadePhysics::new(16.0, 9.0);
        let mut world = World::new(BodyTuning::default());
        world.add_finish_line(&mut physics, Vec2::new(6.5, -3.75), 1.0, 1.0);

        let snapshot = SnapshotBuilder::new(6).build(42, &world);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["tick"], 42);
        assert_eq!(json["entities"][0]["kind"], "finish_line");
        assert_eq!(json["entities"][0]["x"], 6.5);
    }
}
