//! Snapshot rasterizers. Rendering never touches the live world; it works
//! from a `WorldSnapshot` copy.

use serde::{Deserialize, Serialize};

use crate::config::RenderMode;
use crate::grid::{Cell, Pos};
use crate::world::WorldSnapshot;

pub const WINDOW_SIZE: usize = 500;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const FLOOR: [u8; 3] = [200, 200, 200];
const WALL: [u8; 3] = [0, 0, 0];
const AGENT: [u8; 3] = [0, 0, 255];
const GOAL: [u8; 3] = [0, 255, 0];
const BORDER: [u8; 3] = [0, 0, 0];

/// `(height, width, 3)` RGB pixel buffer, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl Frame {
    fn filled(width: usize, height: usize, color: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height { pixels.extend_from_slice(&color); }
        Self { width, height, pixels }
    }

    pub fn shape(&self) -> (usize, usize, usize) { (self.height, self.width, 3) }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    fn put(&mut self, x: usize, y: usize, color: [u8; 3]) {
        let i = (y * self.width + x) * 3;
        self.pixels[i..i + 3].copy_from_slice(&color);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderOutput {
    Nothing,
    /// Text frame for a terminal.
    Text(String),
    Frame(Frame),
}

pub fn render(mode: RenderMode, snapshot: &WorldSnapshot) -> RenderOutput {
    match mode {
        RenderMode::None => RenderOutput::Nothing,
        RenderMode::Human => RenderOutput::Text(text_frame(snapshot)),
        RenderMode::RgbArray => RenderOutput::Frame(rgb_frame(snapshot, WINDOW_SIZE)),
    }
}

fn cell_color(snapshot: &WorldSnapshot, p: Pos) -> [u8; 3] {
    if p == snapshot.agent {
        AGENT
    } else if p == snapshot.goal {
        GOAL
    } else if snapshot.grid.get(p) == Cell::Wall {
        WALL
    } else {
        FLOOR
    }
}

/// One glyph per cell: `A` agent, `G` goal, `█` wall, `·` floor.
pub fn text_frame(snapshot: &WorldSnapshot) -> String {
    let n = snapshot.grid.size();
    let mut out = String::new();
    for y in 0..n {
        for x in 0..n {
            let p = Pos::new(x, y);
            let glyph = if p == snapshot.agent {
                'A'
            } else if p == snapshot.goal {
                'G'
            } else if snapshot.grid.get(p) == Cell::Wall {
                '█'
            } else {
                '·'
            };
            out.push(glyph);
        }
        if y + 1 < n { out.push('\n'); }
    }
    out
}

/// Square `window` x `window` raster with a 1-pixel outline around each cell.
/// Leftover pixels past the last whole cell stay background.
pub fn rgb_frame(snapshot: &WorldSnapshot, window: usize) -> Frame {
    let n = snapshot.grid.size();
    let mut frame = Frame::filled(window, window, BACKGROUND);
    if n == 0 { return frame; }
    let cell = (window / n).max(1);
    for cy in 0..n {
        for cx in 0..n {
            let color = cell_color(snapshot, Pos::new(cx, cy));
            let (x0, y0) = (cx * cell, cy * cell);
            for py in y0..(y0 + cell).min(window) {
                for px in x0..(x0 + cell).min(window) {
                    let edge = px == x0 || py == y0 || px + 1 == x0 + cell || py + 1 == y0 + cell;
                    frame.put(px, py, if edge { BORDER } else { color });
                }
            }
        }
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::grid::Grid;
    use crate::world::Phase;

    fn snapshot() -> WorldSnapshot {
        let mut grid = Grid::walled(5);
        for x in 1..4 { grid.set(Pos::new(x, 1), Cell::Passage); }
        WorldSnapshot {
            mode: Mode::FixedLayout,
            grid,
            agent: Pos::new(1, 1),
            goal: Pos::new(3, 1),
            elapsed_steps: 0,
            phase: Phase::Running,
        }
    }

    #[test]
    fn text_frame_marks_agent_goal_walls() {
        let text = text_frame(&snapshot());
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1], "█A·G█");
    }

    #[test]
    fn rgb_frame_colors_cells() {
        let frame = rgb_frame(&snapshot(), 50);
        assert_eq!(frame.shape(), (50, 50, 3));
        // cell (1,1) spans pixels 10..20; its interior is agent blue
        assert_eq!(frame.pixel(15, 15), AGENT);
        assert_eq!(frame.pixel(35, 15), GOAL);
        assert_eq!(frame.pixel(25, 15), FLOOR);
        assert_eq!(frame.pixel(5, 5), WALL);
        assert_eq!(frame.pixel(10, 15), BORDER);
    }

    #[test]
    fn none_mode_renders_nothing() {
        assert_eq!(render(RenderMode::None, &snapshot()), RenderOutput::Nothing);
        assert!(matches!(render(RenderMode::RgbArray, &snapshot()), RenderOutput::Frame(f) if f.width == WINDOW_SIZE));
    }
}
