use serde::{Deserialize, Serialize};

use crate::error::{MazeError, Result};

/// Cell encodings, matching the persisted layout format: 0 passage, 1 wall.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cell {
    Passage = 0,
    Wall = 1,
}

impl Cell {
    pub fn from_code(code: u8) -> Option<Cell> {
        match code {
            0 => Some(Cell::Passage),
            1 => Some(Cell::Wall),
            _ => None,
        }
    }
    pub fn code(self) -> u8 { self as u8 }
}

/// Public `(x, y)` position. `x` is the column, `y` the row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self { Self { x, y } }

    /// Squared Euclidean distance, the shaping potential.
    pub fn squared_distance(self, other: Pos) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx * dx + dy * dy
    }
}

impl From<(usize, usize)> for Pos {
    fn from((x, y): (usize, usize)) -> Self { Pos::new(x, y) }
}

/// The only place `(x, y)` is turned into row-major storage order (`row = y`, `col = x`).
#[inline]
pub fn row_major(size: usize, pos: Pos) -> usize { pos.y * size + pos.x }

/// Square wall/passage lattice stored row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// Every cell a wall; the starting point for carving.
    pub fn walled(size: usize) -> Self {
        Self { size, cells: vec![Cell::Wall.code(); size * size] }
    }

    /// Every cell a passage; the no-walls layout.
    pub fn open(size: usize) -> Self {
        Self { size, cells: vec![Cell::Passage.code(); size * size] }
    }

    /// Rebuild from row-major cell codes. Rejects wrong lengths and non-binary values.
    pub fn from_cells(size: usize, cells: Vec<u8>) -> Result<Self> {
        if cells.len() != size * size {
            return Err(MazeError::persistence(format!(
                "expected {} cells for a {size}x{size} grid, found {}",
                size * size,
                cells.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|&&c| Cell::from_code(c).is_none()) {
            return Err(MazeError::persistence(format!("cell value {bad} is not 0 or 1")));
        }
        Ok(Self { size, cells })
    }

    pub fn size(&self) -> usize { self.size }

    #[inline]
    pub fn index(&self, pos: Pos) -> usize { row_major(self.size, pos) }

    #[inline]
    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    pub fn contains(&self, pos: Pos) -> bool { pos.x < self.size && pos.y < self.size }

    /// Cell at `pos`. Callers check bounds first.
    pub fn get(&self, pos: Pos) -> Cell {
        match self.cells[self.index(pos)] {
            0 => Cell::Passage,
            _ => Cell::Wall,
        }
    }

    pub fn set(&mut self, pos: Pos, cell: Cell) {
        let i = self.index(pos);
        self.cells[i] = cell.code();
    }

    pub fn is_passage(&self, pos: Pos) -> bool { self.contains(pos) && self.get(pos) == Cell::Passage }

    /// Passage cells in row-major scan order.
    pub fn passages(&self) -> Vec<Pos> {
        let mut out = Vec::new();
        for y in 0..self.size {
            for x in 0..self.size {
                let p = Pos::new(x, y);
                if self.get(p) == Cell::Passage { out.push(p); }
            }
        }
        out
    }

    pub fn passage_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Passage.code()).count()
    }

    /// Row-major cell codes, the persisted representation.
    pub fn cells(&self) -> &[u8] { &self.cells }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.size.max(1)).map(|row| row.to_vec()).collect()
    }

    /// Text view, one glyph per cell, rows separated by newlines.
    pub fn maze_text(&self) -> String {
        let mut out = String::new();
        for y in 0..self.size {
            for x in 0..self.size {
                out.push(match self.get(Pos::new(x, y)) { Cell::Wall => '█', Cell::Passage => ' ' });
            }
            if y + 1 < self.size { out.push('\n'); }
        }
        out
    }
}
