//! Spatial model - bounded 2D grid of cells

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cell position on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two positions
    pub fn distance_to(self, other: Pos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn offset(self, direction: Direction) -> Pos {
        let (dx, dy) = direction.delta();
        Pos::new(self.x + dx, self.y + dy)
    }

    /// Direction of a single step from `self` to an adjacent (or equal) cell.
    pub fn direction_to(self, target: Pos) -> Direction {
        match (target.x - self.x, target.y - self.y) {
            (0, -1) => Direction::North,
            (0, 1) => Direction::South,
            (-1, 0) => Direction::West,
            (1, 0) => Direction::East,
            (dx, dy) if dx.abs() >= dy.abs() && dx != 0 => {
                if dx > 0 {
                    Direction::East
                } else {
                    Direction::West
                }
            }
            (_, dy) if dy > 0 => Direction::South,
            (_, dy) if dy < 0 => Direction::North,
            _ => Direction::Center,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    West,
    East,
    Center,
}

impl Direction {
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::East => (1, 0),
            Direction::Center => (0, 0),
        }
    }

    pub fn code(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::South => 's',
            Direction::West => 'w',
            Direction::East => 'e',
            Direction::Center => 'c',
        }
    }
}

/// Grid extents; all index math goes through here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dims {
    width: u32,
    height: u32,
}

impl Dims {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Convert a position to its row-major index
    pub fn index(&self, pos: Pos) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    /// Convert a row-major index back to a position
    pub fn pos(&self, index: usize) -> Option<Pos> {
        if index < self.cell_count() {
            let width = self.width as usize;
            Some(Pos::new((index % width) as i32, (index / width) as i32))
        } else {
            None
        }
    }

    /// In-bounds 4-neighbours, in N/S/W/E order
    pub fn neighbors(&self, pos: Pos) -> Vec<Pos> {
        Direction::CARDINAL
            .iter()
            .map(|&direction| pos.offset(direction))
            .filter(|candidate| self.contains(*candidate))
            .collect()
    }

    /// Row-major iteration over every cell
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| Pos::new(x, y)))
    }
}

/// Dense row-major storage with one value per cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    dims: Dims,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(dims: Dims, value: T) -> Self {
        Self {
            dims,
            cells: vec![value; dims.cell_count()],
        }
    }
}

impl<T> Grid<T> {
    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn get(&self, pos: Pos) -> Option<&T> {
        self.dims.index(pos).map(|index| &self.cells[index])
    }

    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut T> {
        self.dims.index(pos).map(move |index| &mut self.cells[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, &T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, value)| self.dims.pos(index).map(|pos| (pos, value)))
    }

    pub fn values(&self) -> &[T] {
        &self.cells
    }
}

impl Grid<f64> {
    pub fn zeros(dims: Dims) -> Self {
        Self::filled(dims, 0.0)
    }

    /// Value at `pos`, zero outside the grid
    pub fn at(&self, pos: Pos) -> f64 {
        self.get(pos).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, pos: Pos, amount: f64) {
        if let Some(cell) = self.get_mut(pos) {
            *cell += amount;
        }
    }

    pub fn set(&mut self, pos: Pos, value: f64) {
        if let Some(cell) = self.get_mut(pos) {
            *cell = value;
        }
    }

    /// Element-wise sum of two grids of the same shape
    pub fn plus(&self, other: &Grid<f64>) -> Grid<f64> {
        Grid {
            dims: self.dims,
            cells: self
                .cells
                .iter()
                .zip(&other.cells)
                .map(|(a, b)| a + b)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dims() {
        let dims = Dims::new(10, 5);

        assert_eq!(dims.width(), 10);
        assert_eq!(dims.height(), 5);
        assert_eq!(dims.cell_count(), 50);
    }

    #[test]
    fn test_pos_index_conversion() {
        let dims = Dims::new(10, 5);

        let pos = Pos::new(3, 2);
        let index = dims.index(pos).unwrap();
        assert_eq!(index, 23); // 2 * 10 + 3
        assert_eq!(dims.pos(index), Some(pos));
        assert_eq!(dims.index(Pos::new(-1, 0)), None);
        assert_eq!(dims.index(Pos::new(10, 0)), None);
    }

    #[test]
    fn test_neighbors() {
        let dims = Dims::new(10, 5);

        // Corner cell
        let neighbors = dims.neighbors(Pos::new(0, 0));
        assert_eq!(neighbors, vec![Pos::new(0, 1), Pos::new(1, 0)]);

        // Middle cell
        assert_eq!(dims.neighbors(Pos::new(5, 2)).len(), 4);
    }

    #[test]
    fn test_direction_to() {
        let origin = Pos::new(2, 2);
        assert_eq!(origin.direction_to(Pos::new(2, 1)), Direction::North);
        assert_eq!(origin.direction_to(Pos::new(3, 2)), Direction::East);
        assert_eq!(origin.direction_to(origin), Direction::Center);
        assert_eq!(origin.direction_to(Pos::new(0, 3)), Direction::West);
    }

    #[test]
    fn test_distance() {
        let a = Pos::new(0, 0);
        let b = Pos::new(3, 4);

        assert_eq!(a.distance_to(b), 7); // 3 + 4
    }
}
