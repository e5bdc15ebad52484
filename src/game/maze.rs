//! Procedural maze generation
//!
//! A randomized depth-first backtracker carves a perfect maze over a
//! `width x height` cell graph. The graph is then expanded into a
//! `(2w+1) x (2h+1)` wall/corridor matrix, a few walls are knocked out to
//! add shortcuts, and some wall cells are marked breakable.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

/// Preferred corridor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown maze bias {0:?}, expected horizontal or vertical")]
pub struct ParseBiasError(String);

impl std::str::FromStr for Bias {
    type Err = ParseBiasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            _ => Err(ParseBiasError(s.to_string())),
        }
    }
}

/// Maze generation settings
#[derive(Debug, Clone)]
pub struct MazeConfig {
    /// Logical cells per row
    pub width: usize,
    /// Logical cells per column
    pub height: usize,
    /// Pixel size of one matrix cell, used by the size guard
    pub wall_size: usize,
    pub bias: Option<Bias>,
    /// Soft target for walls knocked out after carving
    pub remove_walls: usize,
    /// Attempt budget for wall removal
    pub max_walls_remove: usize,
    /// Breakable markers to place
    pub breakable_count: usize,
    /// Carving step budget (0 = unlimited)
    pub max_steps: usize,
    /// Max side of the rendering surface in pixels (0 = unlimited)
    pub max_canvas_dimension: usize,
    /// Max area of the rendering surface in pixels (0 = unlimited)
    pub max_canvas_area: usize,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            width: 6,
            height: 4,
            wall_size: 10,
            bias: None,
            remove_walls: 2,
            max_walls_remove: 300,
            breakable_count: 7,
            max_steps: 0,
            max_canvas_dimension: 0,
            max_canvas_area: 0,
        }
    }
}

impl MazeConfig {
    /// Size-sanity check on the rendering surface the maze would need
    pub fn is_valid_size(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let canvas_width = (self.width * 2 + 1) * self.wall_size;
        let canvas_height = (self.height * 2 + 1) * self.wall_size;

        let max = self.max_canvas_dimension;
        if max > 0 && (max <= canvas_width || max <= canvas_height) {
            return false;
        }
        !(self.max_canvas_area > 0 && self.max_canvas_area <= canvas_width * canvas_height)
    }
}

/// One matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MazeCell {
    Corridor,
    Wall,
    Breakable,
}

impl MazeCell {
    pub fn symbol(self) -> char {
        match self {
            Self::Corridor => '0',
            Self::Wall => '1',
            Self::Breakable => '2',
        }
    }

    pub fn is_solid(self) -> bool {
        !matches!(self, Self::Corridor)
    }
}

/// Matrix coordinate (column, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

/// A generated maze, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    /// Logical width in cells
    pub width: usize,
    /// Logical height in cells
    pub height: usize,
    rows: Vec<Vec<MazeCell>>,
    pub entry: GridPos,
    pub exit: GridPos,
    /// Walls actually knocked out during post-processing
    pub walls_removed: usize,
}

impl Maze {
    /// The refused/empty maze
    fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: Vec::new(),
            entry: GridPos { x: 0, y: 0 },
            exit: GridPos { x: 0, y: 0 },
            walls_removed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Cell at (x, y); out of range reads as corridor
    pub fn cell(&self, x: usize, y: usize) -> MazeCell {
        self.rows
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(MazeCell::Corridor)
    }

    /// Rows rendered with `0`/`1`/`2` symbols
    pub fn to_strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.symbol()).collect())
            .collect()
    }

    pub fn count(&self, cell: MazeCell) -> usize {
        self.rows.iter().flatten().filter(|c| **c == cell).count()
    }

    /// Breadth-first search over corridor cells
    pub fn is_reachable(&self, from: GridPos, to: GridPos) -> bool {
        if self.is_empty() || self.cell(from.x, from.y).is_solid() {
            return false;
        }
        let (cols, rows) = (self.cols(), self.rows());
        let mut seen = vec![false; cols * rows];
        let mut queue = VecDeque::from([from]);
        seen[from.y * cols + from.x] = true;

        while let Some(pos) = queue.pop_front() {
            if pos == to {
                return true;
            }
            let mut next = Vec::with_capacity(4);
            if pos.x > 0 {
                next.push(GridPos { x: pos.x - 1, y: pos.y });
            }
            if pos.y > 0 {
                next.push(GridPos { x: pos.x, y: pos.y - 1 });
            }
            if pos.x + 1 < cols {
                next.push(GridPos { x: pos.x + 1, y: pos.y });
            }
            if pos.y + 1 < rows {
                next.push(GridPos { x: pos.x, y: pos.y + 1 });
            }
            for n in next {
                let idx = n.y * cols + n.x;
                if !seen[idx] && !self.cell(n.x, n.y).is_solid() {
                    seen[idx] = true;
                    queue.push_back(n);
                }
            }
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    North,
    South,
    West,
    East,
}

impl Dir {
    fn is_horizontal(self) -> bool {
        matches!(self, Dir::West | Dir::East)
    }
}

/// Logical cell: visited flag plus closed walls
#[derive(Debug, Clone, Copy)]
struct Node {
    visited: bool,
    north: bool,
    south: bool,
    west: bool,
    east: bool,
}

impl Node {
    const CLOSED: Node = Node {
        visited: false,
        north: true,
        south: true,
        west: true,
        east: true,
    };

    fn open(&mut self, dir: Dir) {
        match dir {
            Dir::North => self.north = false,
            Dir::South => self.south = false,
            Dir::West => self.west = false,
            Dir::East => self.east = false,
        }
    }

    fn is_closed(&self, dir: Dir) -> bool {
        match dir {
            Dir::North => self.north,
            Dir::South => self.south,
            Dir::West => self.west,
            Dir::East => self.east,
        }
    }
}

fn opposite(dir: Dir) -> Dir {
    match dir {
        Dir::North => Dir::South,
        Dir::South => Dir::North,
        Dir::West => Dir::East,
        Dir::East => Dir::West,
    }
}

/// Builds mazes from a [`MazeConfig`]
#[derive(Debug, Clone)]
pub struct MazeGenerator {
    config: MazeConfig,
}

impl MazeGenerator {
    pub fn new(config: MazeConfig) -> Self {
        Self { config }
    }

    /// Generate a maze. Returns an empty maze if the size guard refuses the
    /// dimensions or carving exceeds its step budget.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Maze {
        let (width, height) = (self.config.width, self.config.height);
        if !self.config.is_valid_size() {
            return Maze::empty(width, height);
        }

        let Some(nodes) = self.carve(rng) else {
            return Maze::empty(width, height);
        };

        let mut maze = Maze {
            width,
            height,
            rows: expand(&nodes, width, height),
            entry: GridPos { x: 1, y: 1 },
            exit: GridPos {
                x: width * 2 - 1,
                y: height * 2 - 1,
            },
            walls_removed: 0,
        };
        maze.walls_removed = self.remove_walls(&mut maze.rows, rng);
        self.place_breakables(&mut maze, rng);
        maze
    }

    /// Randomized depth-first backtracking over the cell graph
    fn carve<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Vec<Node>> {
        let (width, height) = (self.config.width, self.config.height);
        let size = width * height;
        let mut nodes = vec![Node::CLOSED; size];

        let bias_factor = match self.config.bias {
            Some(Bias::Horizontal) if width >= 100 => width / 100 + 2,
            Some(Bias::Vertical) if height >= 100 => height / 100 + 2,
            _ => 3,
        };
        let mut bias_count = 0;

        let mut stack: Vec<usize> = Vec::new();
        let mut position = rng.gen_range(0..size);
        nodes[position].visited = true;
        let mut visited = 1;
        let mut steps = 0;

        while visited < size {
            steps += 1;
            if self.config.max_steps > 0 && steps > self.config.max_steps {
                return None;
            }
            bias_count += 1;

            let mut candidates: Vec<(Dir, usize)> = neighbours(position, width, height)
                .into_iter()
                .filter(|(dir, next)| nodes[position].is_closed(*dir) && !nodes[*next].visited)
                .collect();

            match self.config.bias {
                Some(bias) if bias_count != bias_factor => {
                    let favored: Vec<(Dir, usize)> = candidates
                        .iter()
                        .copied()
                        .filter(|(dir, _)| dir.is_horizontal() == (bias == Bias::Horizontal))
                        .collect();
                    if !favored.is_empty() {
                        candidates = favored;
                    }
                }
                _ => bias_count = 0,
            }

            if candidates.is_empty() {
                match stack.pop() {
                    Some(previous) => position = previous,
                    None => break,
                }
                continue;
            }

            if candidates.len() > 1 {
                stack.push(position);
            }
            let (dir, next) = candidates[rng.gen_range(0..candidates.len())];
            nodes[position].open(dir);
            nodes[next].open(opposite(dir));
            nodes[next].visited = true;
            visited += 1;
            position = next;
        }

        Some(nodes)
    }

    /// Knock out walls until the soft target or the attempt budget is hit
    fn remove_walls<R: Rng + ?Sized>(&self, rows: &mut [Vec<MazeCell>], rng: &mut R) -> usize {
        if self.config.remove_walls == 0 || rows.len() < 3 {
            return 0;
        }
        let mut removed = 0;
        let mut tries = 0;

        while tries < self.config.max_walls_remove && removed < self.config.remove_walls {
            tries += 1;
            let y = rng.gen_range(1..rows.len() - 1);

            let cols = rows[y].len();
            let mut walls: Vec<usize> = (1..cols - 1)
                .filter(|&x| rows[y][x] == MazeCell::Wall)
                .collect();
            walls.shuffle(rng);

            if walls.into_iter().any(|x| try_remove_wall(rows, y, x)) {
                removed += 1;
            }
        }
        removed
    }

    /// Mark interior wall cells as breakable, away from the entry
    fn place_breakables<R: Rng + ?Sized>(&self, maze: &mut Maze, rng: &mut R) {
        let (rows, cols) = (maze.rows(), maze.cols());
        let entry = maze.entry;
        let mut candidates: Vec<GridPos> = (1..rows.saturating_sub(1))
            .flat_map(|y| (1..cols.saturating_sub(1)).map(move |x| GridPos { x, y }))
            .filter(|p| maze.rows[p.y][p.x] == MazeCell::Wall)
            .filter(|p| p.x.abs_diff(entry.x) + p.y.abs_diff(entry.y) > 1)
            .collect();
        candidates.shuffle(rng);

        for pos in candidates.into_iter().take(self.config.breakable_count) {
            maze.rows[pos.y][pos.x] = MazeCell::Breakable;
        }
    }
}

fn neighbours(pos: usize, width: usize, height: usize) -> Vec<(Dir, usize)> {
    let mut out = Vec::with_capacity(4);
    if pos >= width {
        out.push((Dir::North, pos - width));
    }
    if pos + width < width * height {
        out.push((Dir::South, pos + width));
    }
    if pos % width != 0 {
        out.push((Dir::West, pos - 1));
    }
    if (pos + 1) % width != 0 {
        out.push((Dir::East, pos + 1));
    }
    out
}

/// Expand the cell graph: cell (cx, cy) lands on (2cx+1, 2cy+1); an open
/// east/south wall clears the matrix cell between neighbours.
fn expand(nodes: &[Node], width: usize, height: usize) -> Vec<Vec<MazeCell>> {
    let mut rows = vec![vec![MazeCell::Wall; width * 2 + 1]; height * 2 + 1];
    for (i, node) in nodes.iter().enumerate() {
        let (x, y) = (2 * (i % width) + 1, 2 * (i / width) + 1);
        rows[y][x] = MazeCell::Corridor;
        if !node.east {
            rows[y][x + 1] = MazeCell::Corridor;
        }
        if !node.south {
            rows[y + 1][x] = MazeCell::Corridor;
        }
    }
    rows
}

fn is_wall(rows: &[Vec<MazeCell>], y: isize, x: isize) -> bool {
    if y < 0 || x < 0 {
        return false;
    }
    rows.get(y as usize)
        .and_then(|row| row.get(x as usize))
        .is_some_and(|c| *c == MazeCell::Wall)
}

/// Clear a wall segment between two corridor cells if the surrounding wall
/// structure stays attached to a neighbouring segment.
fn try_remove_wall(rows: &mut [Vec<MazeCell>], y: usize, x: usize) -> bool {
    if rows[y][x] != MazeCell::Wall {
        return false;
    }
    let (yi, xi) = (y as isize, x as isize);
    let odd_row = y % 2 == 1;

    let removable = if odd_row && x % 2 == 0 {
        // Vertical segment between west/east cells
        let has_top = yi - 2 > 0 && is_wall(rows, yi - 2, xi);
        let has_bottom = is_wall(rows, yi + 2, xi);
        match (has_top, has_bottom) {
            (true, true) => true,
            (false, true) => is_wall(rows, yi - 1, xi - 1) || is_wall(rows, yi - 1, xi + 1),
            (true, false) => is_wall(rows, yi + 1, xi - 1) || is_wall(rows, yi + 1, xi + 1),
            (false, false) => false,
        }
    } else if !odd_row && x % 2 == 1 {
        // Horizontal segment between north/south cells
        let has_left = is_wall(rows, yi, xi - 2);
        let has_right = is_wall(rows, yi, xi + 2);
        match (has_left, has_right) {
            (true, true) => true,
            (false, true) => is_wall(rows, yi - 1, xi - 1) || is_wall(rows, yi + 1, xi - 1),
            (true, false) => is_wall(rows, yi - 1, xi + 1) || is_wall(rows, yi + 1, xi + 1),
            (false, false) => false,
        }
    } else {
        false
    };

    if removable {
        rows[y][x] = MazeCell::Corridor;
    }
    removable
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn config(width: usize, height: usize) -> MazeConfig {
        MazeConfig {
            width,
            height,
            ..MazeConfig::default()
        }
    }

    /// Corridor adjacencies in the matrix; a perfect maze over n cells has
    /// exactly n - 1 openings between cells.
    fn openings(maze: &Maze) -> usize {
        let mut count = 0;
        for y in 0..maze.rows() {
            for x in 0..maze.cols() {
                let between_h = y % 2 == 1 && x % 2 == 0;
                let between_v = y % 2 == 0 && x % 2 == 1;
                if (between_h || between_v) && maze.cell(x, y) == MazeCell::Corridor {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn matrix_has_double_resolution_and_solid_border() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let maze = MazeGenerator::new(config(6, 4)).generate(&mut rng);

        assert_eq!(maze.cols(), 13);
        assert_eq!(maze.rows(), 9);
        for x in 0..maze.cols() {
            assert!(maze.cell(x, 0).is_solid());
            assert_eq!(maze.cell(x, maze.rows() - 1), MazeCell::Wall);
        }
        for y in 0..maze.rows() {
            assert_eq!(maze.cell(0, y), MazeCell::Wall);
            assert_eq!(maze.cell(maze.cols() - 1, y), MazeCell::Wall);
        }
        assert_eq!(maze.entry, GridPos { x: 1, y: 1 });
        assert_eq!(maze.exit, GridPos { x: 11, y: 7 });
    }

    #[test]
    fn carving_alone_yields_perfect_maze() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let generator = MazeGenerator::new(MazeConfig {
            remove_walls: 0,
            breakable_count: 0,
            ..config(8, 5)
        });
        let maze = generator.generate(&mut rng);
        assert_eq!(openings(&maze), 8 * 5 - 1);
        assert!(maze.is_reachable(maze.entry, maze.exit));
    }

    #[test]
    fn wall_removal_only_adds_openings() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let generator = MazeGenerator::new(MazeConfig {
            remove_walls: 5,
            breakable_count: 0,
            ..config(10, 10)
        });
        let maze = generator.generate(&mut rng);
        assert!(maze.walls_removed <= 5);
        assert_eq!(openings(&maze), 10 * 10 - 1 + maze.walls_removed);
        assert!(maze.is_reachable(maze.entry, maze.exit));
    }

    #[test]
    fn breakables_replace_interior_walls_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let maze = MazeGenerator::new(config(6, 4)).generate(&mut rng);

        assert_eq!(maze.count(MazeCell::Breakable), 7);
        for (y, row) in maze.to_strings().iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '2' {
                    assert!(x > 0 && y > 0 && x < maze.cols() - 1 && y < maze.rows() - 1);
                    assert!(x.abs_diff(1) + y.abs_diff(1) > 1);
                }
            }
        }
        assert!(maze.is_reachable(maze.entry, maze.exit));
    }

    #[test]
    fn tiny_maze_places_what_fits() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let maze = MazeGenerator::new(config(2, 2)).generate(&mut rng);
        assert!(!maze.is_empty());
        assert!(maze.count(MazeCell::Breakable) <= 7);
        assert!(maze.is_reachable(maze.entry, maze.exit));
    }

    #[test]
    fn oversized_surface_is_refused() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let generator = MazeGenerator::new(MazeConfig {
            max_canvas_dimension: 100,
            ..config(6, 4)
        });
        // (6 * 2 + 1) * 10 = 130px wide
        assert!(generator.generate(&mut rng).is_empty());

        let generator = MazeGenerator::new(MazeConfig {
            max_canvas_area: 130 * 90,
            ..config(6, 4)
        });
        assert!(generator.generate(&mut rng).is_empty());

        assert!(MazeGenerator::new(config(0, 4)).generate(&mut rng).is_empty());
    }

    #[test]
    fn step_budget_refuses_generation() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let generator = MazeGenerator::new(MazeConfig {
            max_steps: 3,
            ..config(6, 4)
        });
        assert!(generator.generate(&mut rng).is_empty());
    }

    #[test]
    fn horizontal_bias_lengthens_horizontal_runs() {
        let generator = MazeGenerator::new(MazeConfig {
            bias: Some(Bias::Horizontal),
            remove_walls: 0,
            breakable_count: 0,
            ..config(20, 20)
        });
        let plain = MazeGenerator::new(MazeConfig {
            remove_walls: 0,
            breakable_count: 0,
            ..config(20, 20)
        });

        let horizontal_openings = |maze: &Maze| {
            (0..maze.rows())
                .flat_map(|y| (0..maze.cols()).map(move |x| (x, y)))
                .filter(|&(x, y)| y % 2 == 1 && x % 2 == 0 && maze.cell(x, y) == MazeCell::Corridor)
                .count()
        };

        let mut biased_total = 0;
        let mut plain_total = 0;
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let biased = generator.generate(&mut rng);
            assert_eq!(openings(&biased), 20 * 20 - 1);
            biased_total += horizontal_openings(&biased);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            plain_total += horizontal_openings(&plain.generate(&mut rng));
        }
        assert!(biased_total > plain_total);
    }

    #[test]
    fn bias_parses_case_insensitively() {
        assert_eq!("Horizontal".parse(), Ok(Bias::Horizontal));
        assert_eq!("VERTICAL".parse(), Ok(Bias::Vertical));
        let err = "diagonal".parse::<Bias>().unwrap_err();
        assert_eq!(err, ParseBiasError("diagonal".into()));
        assert!(err.to_string().contains("diagonal"));
    }

    #[test]
    fn same_seed_same_maze() {
        let generator = MazeGenerator::new(config(6, 4));
        let a = generator.generate(&mut ChaCha8Rng::seed_from_u64(42));
        let b = generator.generate(&mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn entry_always_reaches_exit(
                seed in 0u64..10_000,
                width in 2usize..16,
                height in 2usize..16,
                remove in 0usize..10,
                bias in prop_oneof![
                    Just(None),
                    Just(Some(Bias::Horizontal)),
                    Just(Some(Bias::Vertical)),
                ],
            ) {
                let generator = MazeGenerator::new(MazeConfig {
                    remove_walls: remove,
                    bias,
                    ..config(width, height)
                });
                let maze = generator.generate(&mut ChaCha8Rng::seed_from_u64(seed));
                prop_assert!(maze.is_reachable(maze.entry, maze.exit));
                prop_assert_eq!(openings(&maze), width * height - 1 + maze.walls_removed);
            }
        }
    }
}
