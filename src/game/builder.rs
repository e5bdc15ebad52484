//! Layout selection and world population

use rand::Rng;
use tracing::{debug, warn};

use super::maze::{GridPos, Maze, MazeCell, MazeConfig, MazeGenerator};
use super::physics::{PhysicsEngine, Vec2};
use super::world::{Barrier, BarrierColor, Entity, World};

/// Walls are drawn at this fraction of their grid cell so corridors stay navigable
const UNDERSIZE: f32 = 2.0;

/// Default ship spawn point for hand-authored layouts
pub const DEFAULT_SPAWN: Vec2 = Vec2::new(-6.5, 3.75);

/// Selectable world layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    EmptyArena,
    SingleBlock,
    OverUnder,
    SCurve,
    SideRoom,
    Crossroads,
    STunnel,
    Spiral,
    Generated,
}

impl Layout {
    pub const ALL: [Layout; 9] = [
        Layout::EmptyArena,
        Layout::SingleBlock,
        Layout::OverUnder,
        Layout::SCurve,
        Layout::SideRoom,
        Layout::Crossroads,
        Layout::STunnel,
        Layout::Spiral,
        Layout::Generated,
    ];
}

/// Failure to rebuild the world
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{remaining} barriers or finish lines still in the world")]
    StaleBarriers { remaining: usize },
}

/// Playable arena size in world units
#[derive(Debug, Clone, Copy)]
pub struct ArenaSize {
    pub width: f32,
    pub height: f32,
}

impl Default for ArenaSize {
    fn default() -> Self {
        Self {
            width: 16.0,
            height: 9.0,
        }
    }
}

/// Populates the world with barriers and a finish line
pub struct WorldBuilder {
    layouts: Vec<Layout>,
    previous: Option<Layout>,
    generator: MazeGenerator,
    arena: ArenaSize,
    spawn: Vec2,
}

impl WorldBuilder {
    pub fn new(maze: MazeConfig, arena: ArenaSize) -> Self {
        Self::with_layouts(Layout::ALL.to_vec(), maze, arena)
    }

    pub fn with_layouts(layouts: Vec<Layout>, maze: MazeConfig, arena: ArenaSize) -> Self {
        Self {
            layouts,
            previous: None,
            generator: MazeGenerator::new(maze),
            arena,
            spawn: DEFAULT_SPAWN,
        }
    }

    /// Where ships spawn in the current layout
    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    /// Uniform pick among the layouts, re-rolled until it differs from the
    /// previous pick when more than one layout is configured
    pub fn choose_layout<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Layout {
        let choice = match self.layouts.len() {
            0 => Layout::EmptyArena,
            1 => self.layouts[0],
            n => loop {
                let candidate = self.layouts[rng.gen_range(0..n)];
                if Some(candidate) != self.previous {
                    break candidate;
                }
            },
        };
        self.previous = Some(choice);
        choice
    }

    /// Remove every barrier and finish line
    pub fn clear(&self, world: &mut World, physics: &mut dyn PhysicsEngine) -> usize {
        world.remove_where(physics, Entity::is_barrier_or_finish)
    }

    /// Populate an empty world with a freshly chosen layout. Refuses when
    /// barriers from a previous layout are still present.
    pub fn build<R: Rng + ?Sized>(
        &mut self,
        world: &mut World,
        physics: &mut dyn PhysicsEngine,
        rng: &mut R,
    ) -> Result<Layout, BuildError> {
        let remaining = world.iter().filter(|e| e.is_barrier_or_finish()).count();
        if remaining > 0 {
            return Err(BuildError::StaleBarriers { remaining });
        }

        let layout = self.choose_layout(rng);
        self.spawn = DEFAULT_SPAWN;
        let mut placer = Placer { world, physics };

        match layout {
            Layout::EmptyArena => empty_arena(&mut placer),
            Layout::SingleBlock => single_block(&mut placer),
            Layout::OverUnder => over_under(&mut placer),
            Layout::SCurve => s_curve(&mut placer),
            Layout::SideRoom => side_room(&mut placer),
            Layout::Crossroads => crossroads(&mut placer),
            Layout::STunnel => s_tunnel(&mut placer),
            Layout::Spiral => spiral(&mut placer),
            Layout::Generated => {
                let maze = self.generator.generate(rng);
                if maze.is_empty() || !maze.is_reachable(maze.entry, maze.exit) {
                    warn!("Maze generation refused, falling back to empty arena");
                    empty_arena(&mut placer);
                } else {
                    debug!(
                        breakable = maze.count(MazeCell::Breakable),
                        maze = ?maze.to_strings(),
                        "Generated maze"
                    );
                    self.spawn = place_maze(&mut placer, &maze, self.arena);
                }
            }
        }
        Ok(layout)
    }
}

/// Short-lived borrow of the world and physics while placing a layout
struct Placer<'a> {
    world: &'a mut World,
    physics: &'a mut dyn PhysicsEngine,
}

impl Placer<'_> {
    fn barrier(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.block(x, y, width, height, false);
    }

    fn block(&mut self, x: f32, y: f32, width: f32, height: f32, breakable: bool) {
        let barrier = Barrier {
            breakable,
            color: if breakable {
                BarrierColor::Blue
            } else {
                BarrierColor::White
            },
            width,
            height,
            transient: false,
        };
        self.world
            .add_barrier(self.physics, Vec2::new(x, y), barrier);
    }

    fn finish_line(&mut self, x: f32, y: f32) {
        self.world
            .add_finish_line(self.physics, Vec2::new(x, y), 1.0, 1.0);
    }
}

fn empty_arena(p: &mut Placer) {
    p.finish_line(6.5, -3.75);
}

fn single_block(p: &mut Placer) {
    p.barrier(-5.0, 1.5, 1.0, 3.0);
    p.finish_line(6.5, -3.75);
}

fn over_under(p: &mut Placer) {
    p.barrier(-5.0, 1.5, 1.0, 7.0);
    p.barrier(5.0, -1.5, 1.0, 7.0);
    p.barrier(0.0, -3.0, 1.0, 4.0);
    p.barrier(0.0, 3.0, 1.0, 4.0);
    p.finish_line(6.5, -3.75);
}

fn s_curve(p: &mut Placer) {
    p.barrier(-1.5, 2.0, 13.0, 1.0);
    p.barrier(1.5, -2.0, 13.0, 1.0);
    p.finish_line(6.5, -3.75);
}

fn side_room(p: &mut Placer) {
    p.barrier(-1.5, 2.0, 13.0, 1.0);
    p.barrier(0.0, -3.0, 1.0, 4.0);
    p.finish_line(-6.5, -3.75);
}

fn crossroads(p: &mut Placer) {
    for x in [5.0, 2.5, 0.0, -2.5, -5.0] {
        for y in [3.0, 0.0, -3.0] {
            // the finish line takes the bottom-right crossing
            if x == 5.0 && y == -3.0 {
                continue;
            }
            p.barrier(x, y, 1.0, 1.0);
        }
    }
    p.finish_line(5.0, -3.0);
}

fn s_tunnel(p: &mut Placer) {
    p.barrier(0.0, 5.0, 11.0, 1.0);
    p.barrier(0.0, -5.0, 11.0, 1.0);
    p.barrier(5.0, -1.0, 1.0, 6.0);
    p.barrier(-5.0, 1.0, 1.0, 6.0);
    p.barrier(-1.0, -1.5, 7.0, 1.0);
    p.barrier(1.0, 1.5, 7.0, 1.0);
    p.finish_line(6.5, -3.75);
}

fn spiral(p: &mut Placer) {
    p.barrier(0.0, 7.0, 11.0, 1.0);
    p.barrier(0.0, -7.0, 11.0, 1.0);
    p.barrier(6.0, 0.0, 1.0, 13.0);
    p.barrier(-5.0, 1.0, 1.0, 6.0);
    p.barrier(2.0, 0.5, 1.0, 3.0);
    p.barrier(-1.0, -1.5, 7.0, 1.0);
    p.barrier(0.0, 1.5, 5.0, 1.0);
    p.finish_line(0.0, 0.0);
}

/// Scale the maze's interior onto the arena. Each solid cell becomes an
/// undersized block; connectors fill the gaps towards solid neighbours and
/// towards the arena edge. Returns the spawn point at the maze entry.
fn place_maze(p: &mut Placer, maze: &Maze, arena: ArenaSize) -> Vec2 {
    let (w, h) = (maze.width as f32, maze.height as f32);
    let block_w = arena.width / (2.0 * w - 1.0);
    let block_h = arena.height / (2.0 * h - 1.0);
    let (bw, bh) = (block_w / UNDERSIZE, block_h / UNDERSIZE);
    let to_world = |pos: GridPos| {
        Vec2::new(
            block_w * (pos.x as f32 - w),
            -block_h * (pos.y as f32 - h),
        )
    };

    let last_x = 2 * maze.width - 1;
    let last_y = 2 * maze.height - 1;
    for x in 1..=last_x {
        for y in 1..=last_y {
            let cell = maze.cell(x, y);
            if !cell.is_solid() {
                continue;
            }
            let breakable = cell == MazeCell::Breakable;
            let Vec2 { x: cx, y: cy } = to_world(GridPos { x, y });
            p.block(cx, cy, bw, bh, breakable);

            if x != last_x && maze.cell(x + 1, y).is_solid() {
                p.block(cx + block_w / 2.0, cy, bw, bh, breakable);
            }
            if y != last_y && maze.cell(x, y + 1).is_solid() {
                p.block(cx, cy - block_h / 2.0, bw, bh, breakable);
            }
            if x == 1 {
                p.block(cx - block_w / 2.0 + bw / 4.0, cy, bw / 2.0, bh, breakable);
            }
            if x == last_x {
                p.block(cx + block_w / 2.0 - bw / 4.0, cy, bw / 2.0, bh, breakable);
            }
            if y == 1 {
                p.block(cx, cy + block_h / 2.0 - bh / 4.0, bw, bh / 2.0, breakable);
            }
            if y == last_y {
                p.block(cx, cy - block_h / 2.0 + bh / 4.0, bw, bh / 2.0, breakable);
            }
        }
    }

    let exit = to_world(maze.exit);
    p.finish_line(exit.x, exit.y);
    to_world(maze.entry)
}
