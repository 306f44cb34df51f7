//! Pure maze logic crate.
//! - Seedable random source and recursive-backtracker generation
//! - Grid world transition/reward state machine
//! - Observation encoding, layout persistence, snapshot rendering

mod config;
mod error;
mod generator;
mod grid;
mod observation;
mod render;
mod rng;
mod store;
mod world;

pub use config::{EnvConfig, Mode, Placement, RenderMode, RewardProfile, TimeoutPenalty, MAX_GRID_SIZE};
pub use error::{MazeError, Result};
pub use generator::{generate, normalize_size, CarveEvent, Carver, StartPolicy};
pub use grid::{row_major, Cell, Grid, Pos};
pub use observation::{encode, ObsGrid, AGENT_VALUE, GOAL_VALUE};
pub use render::{render, rgb_frame, text_frame, Frame, RenderOutput, WINDOW_SIZE};
pub use rng::{from_entropy, seeded, MazeRng, RandomSource};
pub use store::{decode_grid, encode_grid, FileStore, GridStore, MemoryStore};
pub use world::{
    Action, GridWorld, Phase, ResetInfo, ResetOptions, StepEvent, StepInfo, StepOutcome, VisitLedger, WorldSnapshot,
};
