//! Persisted layouts for fixed-layout mode.
//!
//! The on-disk format is the bare row-major cell codes (0 passage, 1 wall),
//! `size * size` bytes with no header. The side length is recovered from the
//! byte count.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{MazeError, Result};
use crate::grid::Grid;

/// Where a layout is written after generation and read back in fixed-layout mode.
pub trait GridStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<Grid>>;
    fn save(&mut self, grid: &Grid) -> Result<()>;
}

pub fn encode_grid(grid: &Grid) -> Vec<u8> {
    grid.cells().to_vec()
}

pub fn decode_grid(bytes: &[u8]) -> Result<Grid> {
    if bytes.is_empty() {
        return Err(MazeError::persistence("persisted layout is empty"));
    }
    let side = integer_sqrt(bytes.len());
    if side * side != bytes.len() {
        return Err(MazeError::persistence(format!("{} bytes is not a square layout", bytes.len())));
    }
    Grid::from_cells(side, bytes.to_vec())
}

fn integer_sqrt(n: usize) -> usize {
    let mut r = (n as f64).sqrt() as usize;
    while r * r > n { r -= 1; }
    while (r + 1) * (r + 1) <= n { r += 1; }
    r
}

#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
    pub fn path(&self) -> &Path { &self.path }
}

impl GridStore for FileStore {
    fn load(&self) -> Result<Option<Grid>> {
        match fs::read(&self.path) {
            Ok(bytes) => decode_grid(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self, grid: &Grid) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, encode_grid(grid))?;
        tracing::debug!(path = %self.path.display(), size = grid.size(), "persisted layout");
        Ok(())
    }
}

/// In-process store, handy for tests and for sharing one layout between episodes.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    grid: Option<Grid>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
    pub fn with_grid(grid: Grid) -> Self { Self { grid: Some(grid) } }
    pub fn grid(&self) -> Option<&Grid> { self.grid.as_ref() }
}

impl GridStore for MemoryStore {
    fn load(&self) -> Result<Option<Grid>> { Ok(self.grid.clone()) }

    fn save(&mut self, grid: &Grid) -> Result<()> {
        self.grid = Some(grid.clone());
        Ok(())
    }
}
