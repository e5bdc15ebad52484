//! Physics collaborator: the engine interface the game consumes, plus a
//! small arcade implementation used by the server

use std::collections::{HashMap, HashSet};

/// Collision group bits
pub const GROUP_SHIP: u32 = 1 << 1;
pub const GROUP_BULLET: u32 = 1 << 2;
pub const GROUP_BARRIER: u32 = 1 << 3;
pub const GROUP_FINISH_LINE: u32 = 1 << 4;

/// Opaque handle to a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// 2D vector in world units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians)
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k)
    }

    pub fn add(self, other: Vec2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// Body creation parameters
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub mass: f32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    /// Fraction of velocity lost per second
    pub damping: f32,
}

impl BodyDesc {
    pub fn at(mass: f32, position: Vec2) -> Self {
        Self {
            mass,
            position,
            velocity: Vec2::ZERO,
            angle: 0.0,
            damping: 0.0,
        }
    }
}

/// Collision geometry, centered on the body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { width: f32, height: f32 },
    Circle { radius: f32 },
}

/// Kinematic state read back from the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
}

/// A begin-contact event between two bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

/// Rigid-body engine consumed by the game world
pub trait PhysicsEngine: Send {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    fn add_shape(&mut self, handle: BodyHandle, shape: Shape, group: u32, mask: u32);
    /// Returns false if the body did not exist
    fn remove_body(&mut self, handle: BodyHandle) -> bool;
    fn step(&mut self, dt: f32);
    /// Contacts that began during the steps since the last drain
    fn drain_contacts(&mut self) -> Vec<Contact>;
    fn body(&self, handle: BodyHandle) -> Option<BodyState>;
    /// Force applied during the next step, in world axes
    fn apply_force(&mut self, handle: BodyHandle, force: Vec2);
    fn rotate(&mut self, handle: BodyHandle, delta: f32);
    fn body_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Collider {
    shape: Shape,
    group: u32,
    mask: u32,
}

#[derive(Debug, Clone)]
struct Body {
    mass: f32,
    position: Vec2,
    velocity: Vec2,
    angle: f32,
    damping: f32,
    force: Vec2,
    colliders: Vec<Collider>,
}

/// Explicit-Euler engine with box/circle overlap tests and arena clamping.
///
/// Contacts are sensor-style: overlapping bodies are reported, never pushed
/// apart.
pub struct ArcadePhysics {
    bodies: HashMap<BodyHandle, Body>,
    next_handle: u64,
    half_width: f32,
    half_height: f32,
    touching: HashSet<(BodyHandle, BodyHandle)>,
    contacts: Vec<Contact>,
}

impl ArcadePhysics {
    /// Engine confined to a `width x height` arena centered on the origin
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            bodies: HashMap::new(),
            next_handle: 1,
            half_width: width / 2.0,
            half_height: height / 2.0,
            touching: HashSet::new(),
            contacts: Vec::new(),
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            if body.mass > 0.0 {
                body.velocity = body.velocity.add(body.force.scale(dt / body.mass));
            }
            body.force = Vec2::ZERO;

            // p2-style damping: v *= (1 - d)^dt
            let keep = (1.0 - body.damping.clamp(0.0, 1.0)).powf(dt);
            body.velocity = body.velocity.scale(keep);
            body.position = body.position.add(body.velocity.scale(dt));

            if body.position.x > self.half_width {
                body.position.x = self.half_width;
                body.velocity.x = 0.0;
            } else if body.position.x < -self.half_width {
                body.position.x = -self.half_width;
                body.velocity.x = 0.0;
            }
            if body.position.y > self.half_height {
                body.position.y = self.half_height;
                body.velocity.y = 0.0;
            } else if body.position.y < -self.half_height {
                body.position.y = -self.half_height;
                body.velocity.y = 0.0;
            }
        }
    }

    fn detect_contacts(&mut self) {
        let mut handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        handles.sort_unstable();

        let mut now_touching = HashSet::new();
        for i in 0..handles.len() {
            for j in (i + 1)..handles.len() {
                let (ha, hb) = (handles[i], handles[j]);
                let (Some(a), Some(b)) = (self.bodies.get(&ha), self.bodies.get(&hb)) else {
                    continue;
                };
                if bodies_overlap(a, b) {
                    now_touching.insert((ha, hb));
                    if !self.touching.contains(&(ha, hb)) {
                        self.contacts.push(Contact { a: ha, b: hb });
                    }
                }
            }
        }
        self.touching = now_touching;
    }
}

impl PhysicsEngine for ArcadePhysics {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            Body {
                mass: desc.mass,
                position: desc.position,
                velocity: desc.velocity,
                angle: desc.angle,
                damping: desc.damping,
                force: Vec2::ZERO,
                colliders: Vec::new(),
            },
        );
        handle
    }

    fn add_shape(&mut self, handle: BodyHandle, shape: Shape, group: u32, mask: u32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.colliders.push(Collider { shape, group, mask });
        }
    }

    fn remove_body(&mut self, handle: BodyHandle) -> bool {
        self.touching.retain(|(a, b)| *a != handle && *b != handle);
        self.bodies.remove(&handle).is_some()
    }

    fn step(&mut self, dt: f32) {
        self.integrate(dt);
        self.detect_contacts();
    }

    fn drain_contacts(&mut self) -> Vec<Contact> {
        std::mem::take(&mut self.contacts)
    }

    fn body(&self, handle: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&handle).map(|b| BodyState {
            position: b.position,
            velocity: b.velocity,
            angle: b.angle,
        })
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec2) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.force = body.force.add(force);
        }
    }

    fn rotate(&mut self, handle: BodyHandle, delta: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.angle = (body.angle + delta).rem_euclid(std::f32::consts::TAU);
        }
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

fn bodies_overlap(a: &Body, b: &Body) -> bool {
    a.colliders.iter().any(|ca| {
        b.colliders.iter().any(|cb| {
            (ca.group & cb.mask) != 0
                && (cb.group & ca.mask) != 0
                && shapes_overlap(ca.shape, a.position, cb.shape, b.position)
        })
    })
}

fn shapes_overlap(sa: Shape, pa: Vec2, sb: Shape, pb: Vec2) -> bool {
    match (sa, sb) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            let dx = pa.x - pb.x;
            let dy = pa.y - pb.y;
            let combined = ra + rb;
            dx * dx + dy * dy <= combined * combined
        }
        (Shape::Box { width, height }, Shape::Circle { radius }) => {
            circle_box_overlap(pb, radius, pa, width, height)
        }
        (Shape::Circle { radius }, Shape::Box { width, height }) => {
            circle_box_overlap(pa, radius, pb, width, height)
        }
        (
            Shape::Box {
                width: wa,
                height: ha,
            },
            Shape::Box {
                width: wb,
                height: hb,
            },
        ) => (pa.x - pb.x).abs() * 2.0 <= wa + wb && (pa.y - pb.y).abs() * 2.0 <= ha + hb,
    }
}

fn circle_box_overlap(center: Vec2, radius: f32, box_pos: Vec2, width: f32, height: f32) -> bool {
    let nearest_x = center.x.clamp(box_pos.x - width / 2.0, box_pos.x + width / 2.0);
    let nearest_y = center.y.clamp(box_pos.y - height / 2.0, box_pos.y + height / 2.0);
    let dx = center.x - nearest_x;
    let dy = center.y - nearest_y;
    dx * dx + dy * dy <= radius * radius
}
