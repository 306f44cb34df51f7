use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MazeError, Result};
use crate::generator::{normalize_size, StartPolicy};
use crate::grid::Pos;

/// Largest side length a configuration may request.
pub const MAX_GRID_SIZE: usize = 4096;

/// Layout source for each episode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Open field, boundary collisions only.
    #[default]
    #[serde(alias = "no_walls")]
    NoWalls,
    /// Carve a fresh maze on every reset.
    #[serde(alias = "regenerate_walls", alias = "regenerate", alias = "walls")]
    RegenerateWalls,
    /// Reuse the persisted maze on every reset.
    #[serde(alias = "fixed_layout", alias = "fixed")]
    FixedLayout,
}

impl Mode {
    pub fn has_walls(self) -> bool { !matches!(self, Mode::NoWalls) }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::NoWalls => "no-walls",
            Mode::RegenerateWalls => "regenerate-walls",
            Mode::FixedLayout => "fixed-layout",
        }
    }
}

impl FromStr for Mode {
    type Err = MazeError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "no-walls" => Ok(Mode::NoWalls),
            "regenerate-walls" | "regenerate" | "walls" => Ok(Mode::RegenerateWalls),
            "fixed-layout" | "fixed" => Ok(Mode::FixedLayout),
            other => Err(MazeError::configuration(format!("unrecognized mode '{other}'"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    None,
    Human,
    #[serde(alias = "rgb-array")]
    RgbArray,
}

impl FromStr for RenderMode {
    type Err = MazeError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(RenderMode::None),
            "human" => Ok(RenderMode::Human),
            "rgb_array" | "rgb-array" => Ok(RenderMode::RgbArray),
            other => Err(MazeError::configuration(format!("unrecognized render mode '{other}'"))),
        }
    }
}

/// Penalty applied once when an episode runs out of steps.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TimeoutPenalty {
    /// Subtract a constant.
    Fixed(f64),
    /// Subtract `factor * remaining squared distance`.
    DistanceProportional(f64),
}

impl TimeoutPenalty {
    pub fn amount(self, remaining_squared_distance: i64) -> f64 {
        match self {
            TimeoutPenalty::Fixed(v) => v,
            TimeoutPenalty::DistanceProportional(k) => k * remaining_squared_distance as f64,
        }
    }
}

/// Reward terms. All magnitudes are positive; penalties are subtracted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardProfile {
    pub step_cost: f64,
    pub collision_penalty: f64,
    /// Weight on the decrease in squared distance to the goal.
    pub progress_weight: f64,
    pub goal_bonus: f64,
    pub timeout: TimeoutPenalty,
}

impl RewardProfile {
    /// Open-field rewards: cheap boundary bumps, small goal bonus, fixed timeout.
    pub fn open_field() -> Self {
        Self {
            step_cost: 1.0,
            collision_penalty: 0.8,
            progress_weight: 0.5,
            goal_bonus: 10.0,
            timeout: TimeoutPenalty::Fixed(50.0),
        }
    }

    /// Maze rewards: wall hits cost more than boundary bumps in the open field.
    pub fn walled() -> Self {
        Self {
            step_cost: 1.0,
            collision_penalty: 10.0,
            progress_weight: 1.0,
            goal_bonus: 100.0,
            timeout: TimeoutPenalty::DistanceProportional(0.5),
        }
    }

    pub fn for_mode(mode: Mode) -> Self {
        if mode.has_walls() { Self::walled() } else { Self::open_field() }
    }
}

/// Agent/goal placement policy applied on reset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Two distinct passage cells drawn uniformly.
    Random,
    Fixed { agent: Pos, goal: Pos },
}

impl Placement {
    /// Corner placement used by the open field.
    pub fn corners(size: usize) -> Self {
        let far = size.saturating_sub(1);
        Placement::Fixed { agent: Pos::new(0, 0), goal: Pos::new(far, size.saturating_sub(2)) }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Requested side length; wall-aware modes round even values up.
    pub grid_size: usize,
    pub mode: Mode,
    pub render_mode: RenderMode,
    pub start_policy: StartPolicy,
    /// Defaults to corners for the open field and random passages otherwise.
    pub placement: Option<Placement>,
    /// Defaults to the profile matching `mode`.
    pub rewards: Option<RewardProfile>,
    /// Generation attempts before a placement failure is surfaced.
    pub max_generation_attempts: u32,
    pub seed: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            mode: Mode::NoWalls,
            render_mode: RenderMode::None,
            start_policy: StartPolicy::OddLattice,
            placement: None,
            rewards: None,
            max_generation_attempts: 16,
            seed: None,
        }
    }
}

impl EnvConfig {
    pub fn new(grid_size: usize, mode: Mode) -> Self {
        Self { grid_size, mode, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 1 {
            return Err(MazeError::configuration("grid_size must be at least 1"));
        }
        let n = self.effective_size();
        if n > MAX_GRID_SIZE {
            return Err(MazeError::configuration(format!("grid_size {} exceeds the maximum of {MAX_GRID_SIZE}", self.grid_size)));
        }
        // corner placement needs two distinct cells
        if self.mode == Mode::NoWalls && n < 2 {
            return Err(MazeError::configuration("no-walls mode needs grid_size of at least 2"));
        }
        if self.max_generation_attempts == 0 {
            return Err(MazeError::configuration("max_generation_attempts must be at least 1"));
        }
        if let Some(Placement::Fixed { agent, goal }) = &self.placement {
            for (name, p) in [("agent", agent), ("goal", goal)] {
                if p.x >= n || p.y >= n {
                    return Err(MazeError::configuration(format!(
                        "{name} position ({}, {}) outside {n}x{n} grid",
                        p.x, p.y
                    )));
                }
            }
        }
        Ok(())
    }

    /// Side length actually allocated.
    pub fn effective_size(&self) -> usize {
        if self.mode.has_walls() { normalize_size(self.grid_size) } else { self.grid_size }
    }

    /// Steps allowed before timeout.
    pub fn max_steps(&self) -> u64 {
        let n = self.effective_size() as u64;
        n.saturating_mul(n)
    }

    pub fn rewards(&self) -> RewardProfile {
        self.rewards.clone().unwrap_or_else(|| RewardProfile::for_mode(self.mode))
    }

    pub fn placement(&self) -> Placement {
        match &self.placement {
            Some(p) => p.clone(),
            None if self.mode.has_walls() => Placement::Random,
            None => Placement::corners(self.effective_size()),
        }
    }
}
