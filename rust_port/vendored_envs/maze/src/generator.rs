//! Recursive-backtracker maze carving on the 2-step lattice.
//!
//! Carving starts from a single cell, repeatedly jumps two cells to a random
//! still-walled neighbor, clears the midpoint between them, and backtracks
//! when no such neighbor remains. The result is a perfect maze: every passage
//! is reachable from the start and there is exactly one simple path between
//! any two passages.

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid, Pos};
use crate::rng::RandomSource;

/// Jump offsets `(dx, dy)` in the order candidates are collected.
const JUMPS: [(isize, isize); 4] = [(0, 2), (0, -2), (2, 0), (-2, 0)];

/// How the carving start cell is chosen.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Both coordinates odd, which keeps the outer border solid.
    #[default]
    OddLattice,
    /// Any cell; carving then follows the lattice of the start's parity.
    AnyCell,
}

/// Round an even side length up to the next odd one.
pub fn normalize_size(size: usize) -> usize {
    if size % 2 == 0 { size + 1 } else { size }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CarveEvent {
    /// Jumped from `from` to `to`, clearing the wall at `via`.
    Carved { from: Pos, via: Pos, to: Pos },
    /// `from` had no walled neighbors left and was popped.
    Backtracked { from: Pos },
}

/// Step-wise carver. `generate` runs one to completion; callers that want to
/// animate generation drive `step` themselves.
#[derive(Clone, Debug)]
pub struct Carver {
    grid: Grid,
    stack: Vec<Pos>,
    start: Pos,
}

impl Carver {
    pub fn new<R: RandomSource>(size: usize, policy: StartPolicy, rng: &mut R) -> Self {
        let size = normalize_size(size);
        let mut grid = Grid::walled(size);
        let start = pick_start(size, policy, rng);
        grid.set(start, Cell::Passage);
        Self { grid, stack: vec![start], start }
    }

    pub fn start(&self) -> Pos { self.start }
    pub fn grid(&self) -> &Grid { &self.grid }
    /// Top of the backtracking stack, `None` once carving is complete.
    pub fn cursor(&self) -> Option<Pos> { self.stack.last().copied() }
    pub fn is_done(&self) -> bool { self.stack.is_empty() }
    pub fn depth(&self) -> usize { self.stack.len() }

    /// Advance by one carve or backtrack. Returns `None` when finished.
    pub fn step<R: RandomSource>(&mut self, rng: &mut R) -> Option<CarveEvent> {
        let current = *self.stack.last()?;
        let candidates = self.walled_neighbors(current);
        match rng.choose(&candidates) {
            Some(&next) => {
                let via = Pos::new((current.x + next.x) / 2, (current.y + next.y) / 2);
                self.grid.set(next, Cell::Passage);
                self.grid.set(via, Cell::Passage);
                self.stack.push(next);
                Some(CarveEvent::Carved { from: current, via, to: next })
            }
            None => {
                self.stack.pop();
                Some(CarveEvent::Backtracked { from: current })
            }
        }
    }

    /// Run to completion and hand back the carved grid.
    pub fn finish<R: RandomSource>(mut self, rng: &mut R) -> Grid {
        while self.step(rng).is_some() {}
        self.grid
    }

    fn walled_neighbors(&self, c: Pos) -> Vec<Pos> {
        let mut out = Vec::with_capacity(JUMPS.len());
        for (dx, dy) in JUMPS {
            let nx = c.x as isize + dx;
            let ny = c.y as isize + dy;
            // bounds before state
            if !self.grid.in_bounds(nx, ny) { continue; }
            let p = Pos::new(nx as usize, ny as usize);
            if self.grid.get(p) == Cell::Wall { out.push(p); }
        }
        out
    }
}

fn pick_start<R: RandomSource>(size: usize, policy: StartPolicy, rng: &mut R) -> Pos {
    match policy {
        StartPolicy::OddLattice => {
            // odd coordinates below `size`: 1, 3, .., size - 2
            let odd = size.saturating_sub(1) / 2;
            if odd == 0 {
                return Pos::new(0, 0);
            }
            let x = 1 + 2 * rng.below(odd);
            let y = 1 + 2 * rng.below(odd);
            Pos::new(x, y)
        }
        StartPolicy::AnyCell => {
            let x = rng.below(size);
            let y = rng.below(size);
            Pos::new(x, y)
        }
    }
}

/// Carve a perfect maze of side `normalize_size(size)`.
pub fn generate<R: RandomSource>(size: usize, policy: StartPolicy, rng: &mut R) -> Grid {
    let carver = Carver::new(size, policy, rng);
    let start = carver.start();
    let grid = carver.finish(rng);
    tracing::debug!(
        size = grid.size(),
        start_x = start.x,
        start_y = start.y,
        passages = grid.passage_count(),
        "carved maze"
    );
    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;

    #[test]
    fn even_sizes_round_up() {
        assert_eq!(normalize_size(10), 11);
        assert_eq!(normalize_size(15), 15);
        assert_eq!(normalize_size(0), 1);
        let mut rng = seeded(0);
        assert_eq!(generate(10, StartPolicy::OddLattice, &mut rng).size(), 11);
        assert_eq!(generate(15, StartPolicy::OddLattice, &mut rng).size(), 15);
    }

    #[test]
    fn tiny_grid_keeps_only_start() {
        let mut rng = seeded(5);
        let g = generate(1, StartPolicy::OddLattice, &mut rng);
        assert_eq!(g.size(), 1);
        assert_eq!(g.passages(), vec![Pos::new(0, 0)]);

        let g = generate(1, StartPolicy::AnyCell, &mut rng);
        assert_eq!(g.passage_count(), 1);
    }

    #[test]
    fn odd_lattice_visits_every_odd_cell_and_keeps_border() {
        let mut rng = seeded(11);
        let g = generate(13, StartPolicy::OddLattice, &mut rng);
        for y in (1..13).step_by(2) {
            for x in (1..13).step_by(2) {
                assert!(g.is_passage(Pos::new(x, y)), "odd cell ({x},{y}) left walled");
            }
        }
        for i in 0..13 {
            assert!(!g.is_passage(Pos::new(i, 0)));
            assert!(!g.is_passage(Pos::new(i, 12)));
            assert!(!g.is_passage(Pos::new(0, i)));
            assert!(!g.is_passage(Pos::new(12, i)));
        }
        // spanning tree over 36 lattice cells adds 35 connectors
        assert_eq!(g.passage_count(), 36 + 35);
    }

    #[test]
    fn carver_steps_match_generate() {
        let mut a = seeded(99);
        let mut b = seeded(99);
        let whole = generate(9, StartPolicy::OddLattice, &mut a);
        let mut carver = Carver::new(9, StartPolicy::OddLattice, &mut b);
        let mut carved = 0;
        let mut backtracked = 0;
        while let Some(ev) = carver.step(&mut b) {
            match ev {
                CarveEvent::Carved { from, via, to } => {
                    carved += 1;
                    assert_eq!(from.squared_distance(to), 4);
                    assert_eq!(from.squared_distance(via), 1);
                }
                CarveEvent::Backtracked { .. } => backtracked += 1,
            }
        }
        assert!(carver.is_done());
        assert_eq!(carver.cursor(), None);
        assert_eq!(carver.grid(), &whole);
        // each lattice cell is pushed once and popped once
        assert_eq!(backtracked, carved + 1);
    }
}
