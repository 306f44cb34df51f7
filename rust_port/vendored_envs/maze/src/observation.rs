use serde::{Deserialize, Serialize};

use crate::grid::{row_major, Pos};

pub const AGENT_VALUE: f32 = 1.0;
pub const GOAL_VALUE: f32 = 0.5;

/// `(size, size)` observation: zero everywhere except the goal (0.5) and the
/// agent (1.0). Walls are not part of the observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObsGrid {
    size: usize,
    values: Vec<f32>,
}

/// Build a fresh observation. The goal is written first and the agent last, so
/// a shared cell reads as the agent.
pub fn encode(size: usize, agent: Pos, goal: Pos) -> ObsGrid {
    let mut values = vec![0.0f32; size * size];
    values[row_major(size, goal)] = GOAL_VALUE;
    values[row_major(size, agent)] = AGENT_VALUE;
    ObsGrid { size, values }
}

impl ObsGrid {
    pub fn size(&self) -> usize { self.size }
    pub fn shape(&self) -> (usize, usize) { (self.size, self.size) }
    /// Row-major values.
    pub fn values(&self) -> &[f32] { &self.values }
    pub fn get(&self, pos: Pos) -> f32 { self.values[row_major(self.size, pos)] }

    pub fn rows(&self) -> Vec<Vec<f32>> {
        self.values.chunks(self.size.max(1)).map(|r| r.to_vec()).collect()
    }

    /// First cell holding exactly `value`, scanning rows top to bottom.
    pub fn locate(&self, value: f32) -> Option<Pos> {
        let i = self.values.iter().position(|&v| v == value)?;
        Some(Pos::new(i % self.size, i / self.size))
    }

    /// `(agent, goal)` recovered from the encoded values.
    pub fn decode(&self) -> (Option<Pos>, Option<Pos>) {
        (self.locate(AGENT_VALUE), self.locate(GOAL_VALUE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_and_goal_land_on_y_x() {
        let obs = encode(4, Pos::new(3, 1), Pos::new(0, 2));
        let rows = obs.rows();
        assert_eq!(rows[1][3], 1.0);
        assert_eq!(rows[2][0], 0.5);
        assert_eq!(obs.values().iter().filter(|&&v| v != 0.0).count(), 2);
        assert_eq!(obs.shape(), (4, 4));
    }

    #[test]
    fn coincident_cell_reads_as_agent() {
        let obs = encode(3, Pos::new(1, 1), Pos::new(1, 1));
        assert_eq!(obs.get(Pos::new(1, 1)), AGENT_VALUE);
        assert_eq!(obs.decode(), (Some(Pos::new(1, 1)), None));
    }

    #[test]
    fn each_call_is_independent() {
        let a = encode(3, Pos::new(0, 0), Pos::new(2, 2));
        let b = encode(3, Pos::new(1, 0), Pos::new(2, 2));
        assert_eq!(a.get(Pos::new(0, 0)), 1.0);
        assert_eq!(b.get(Pos::new(0, 0)), 0.0);
    }
}
