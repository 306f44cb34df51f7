use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{EnvConfig, Mode, Placement, RewardProfile};
use crate::error::{MazeError, Result};
use crate::generator::generate;
use crate::grid::{Grid, Pos};
use crate::observation::{encode, ObsGrid};
use crate::render::{render, RenderOutput};
use crate::rng::{from_entropy, seeded, MazeRng, RandomSource};
use crate::store::GridStore;

/// Discrete moves. Integer encoding: 0 up, 1 right, 2 down, 3 left.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Action {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Right, Action::Down, Action::Left];

    #[inline]
    pub fn delta(self) -> (isize, isize) {
        match self { Action::Up => (0, -1), Action::Right => (1, 0), Action::Down => (0, 1), Action::Left => (-1, 0) }
    }
}

impl TryFrom<i64> for Action {
    type Error = MazeError;
    fn try_from(v: i64) -> Result<Self> {
        Ok(match v {
            0 => Action::Up,
            1 => Action::Right,
            2 => Action::Down,
            3 => Action::Left,
            _ => return Err(MazeError::usage(format!("invalid action {v} (expected 0..=3)"))),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    ReadyForReset,
    Running,
    Terminated,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    Moved,
    /// Move rejected by the boundary or a wall.
    Collision,
    ReachedGoal,
    Timeout,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub moved: bool,
    pub event: StepEvent,
    pub elapsed_steps: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub observation: ObsGrid,
    pub reward: f64,
    pub terminated: bool,
    /// Always false: goal and timeout both end the episode as `terminated`.
    pub truncated: bool,
    pub info: StepInfo,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResetInfo {
    pub agent: Pos,
    pub goal: Pos,
    pub grid_size: usize,
    /// Layouts generated up to and including the one that was placed (0 when none was generated).
    pub generation_attempts: u32,
}

/// Per-episode overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOptions {
    pub placement: Option<Placement>,
}

/// Visit counts per cell for the current episode.
///
/// Kept for reward experiments; the reward function does not read it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisitLedger {
    counts: BTreeMap<Pos, u32>,
}

impl VisitLedger {
    pub fn record(&mut self, pos: Pos) { *self.counts.entry(pos).or_insert(0) += 1; }
    pub fn count(&self, pos: Pos) -> u32 { self.counts.get(&pos).copied().unwrap_or(0) }
    pub fn distinct(&self) -> usize { self.counts.len() }
    pub fn total(&self) -> u64 { self.counts.values().map(|&c| c as u64).sum() }
    pub fn iter(&self) -> impl Iterator<Item = (Pos, u32)> + '_ { self.counts.iter().map(|(&p, &c)| (p, c)) }
    pub fn clear(&mut self) { self.counts.clear(); }
}

/// Read-only copy of the scene for renderers and checkpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub mode: Mode,
    pub grid: Grid,
    pub agent: Pos,
    pub goal: Pos,
    pub elapsed_steps: u64,
    pub phase: Phase,
}

/// The environment state machine.
pub struct GridWorld {
    config: EnvConfig,
    rewards: RewardProfile,
    size: usize,
    max_steps: u64,
    rng: MazeRng,
    store: Option<Box<dyn GridStore>>,
    grid: Option<Grid>,
    agent: Pos,
    goal: Pos,
    elapsed_steps: u64,
    previous_squared_distance: i64,
    visits: VisitLedger,
    phase: Phase,
    reward_last: f64,
    total_reward: f64,
}

impl GridWorld {
    /// Environment without persistence. Fixed-layout mode needs `with_store`.
    pub fn new(config: EnvConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Environment that loads (fixed-layout) or saves (regenerate) its maze through `store`.
    pub fn with_store(config: EnvConfig, store: Box<dyn GridStore>) -> Result<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: EnvConfig, store: Option<Box<dyn GridStore>>) -> Result<Self> {
        config.validate()?;
        if config.mode == Mode::FixedLayout && store.is_none() {
            return Err(MazeError::configuration("fixed-layout mode requires a grid store"));
        }
        let rng = match config.seed { Some(s) => seeded(s), None => from_entropy() };
        Ok(Self {
            rewards: config.rewards(),
            size: config.effective_size(),
            max_steps: config.max_steps(),
            rng,
            store,
            grid: None,
            agent: Pos::new(0, 0),
            goal: Pos::new(0, 0),
            elapsed_steps: 0,
            previous_squared_distance: 0,
            visits: VisitLedger::default(),
            phase: Phase::ReadyForReset,
            reward_last: 0.0,
            total_reward: 0.0,
            config,
        })
    }

    /// Replace the owned random source.
    pub fn with_rng(mut self, rng: MazeRng) -> Self {
        self.rng = rng;
        self
    }

    /// Explicit reseed; the generator is never reseeded implicitly.
    pub fn reseed(&mut self, seed: u64) { self.rng = seeded(seed); }

    pub fn config(&self) -> &EnvConfig { &self.config }
    pub fn rewards(&self) -> &RewardProfile { &self.rewards }
    pub fn grid_size(&self) -> usize { self.size }
    pub fn max_steps(&self) -> u64 { self.max_steps }
    pub fn grid(&self) -> Option<&Grid> { self.grid.as_ref() }
    pub fn agent(&self) -> Pos { self.agent }
    pub fn goal(&self) -> Pos { self.goal }
    pub fn phase(&self) -> Phase { self.phase }
    pub fn elapsed_steps(&self) -> u64 { self.elapsed_steps }
    pub fn previous_squared_distance(&self) -> i64 { self.previous_squared_distance }
    pub fn visits(&self) -> &VisitLedger { &self.visits }
    pub fn reward_last(&self) -> f64 { self.reward_last }
    pub fn total_reward(&self) -> f64 { self.total_reward }

    /// Start a new episode.
    ///
    /// Nothing is committed until the new layout and placement are valid. On
    /// error the previous episode is closed and `step` fails until a reset
    /// succeeds; a `seed` passed to a failed reset is not applied.
    pub fn reset(&mut self, seed: Option<u64>, options: ResetOptions) -> Result<(ObsGrid, ResetInfo)> {
        let (grid, (agent, goal), attempts, rng) = match self.stage_episode(seed, options) {
            Ok(staged) => staged,
            Err(e) => {
                self.phase = Phase::ReadyForReset;
                tracing::warn!(error = %e, "reset failed");
                return Err(e);
            }
        };

        self.rng = rng;
        self.grid = Some(grid);
        self.agent = agent;
        self.goal = goal;
        self.previous_squared_distance = agent.squared_distance(goal);
        self.elapsed_steps = 0;
        self.visits.clear();
        self.visits.record(agent);
        self.reward_last = 0.0;
        self.total_reward = 0.0;
        self.phase = Phase::Running;
        tracing::debug!(
            mode = %self.config.mode,
            size = self.size,
            agent_x = agent.x,
            agent_y = agent.y,
            goal_x = goal.x,
            goal_y = goal.y,
            "episode reset"
        );

        let info = ResetInfo { agent, goal, grid_size: self.size, generation_attempts: attempts };
        Ok((encode(self.size, agent, goal), info))
    }

    /// Layout, placement and the random source the episode will continue with.
    fn stage_episode(
        &mut self,
        seed: Option<u64>,
        options: ResetOptions,
    ) -> Result<(Grid, (Pos, Pos), u32, MazeRng)> {
        let placement = match options.placement {
            Some(p) => {
                check_placement_bounds(&p, self.size)?;
                p
            }
            None => self.config.placement(),
        };
        let mut rng = match seed { Some(s) => seeded(s), None => self.rng.clone() };

        let (grid, spots, attempts) = match self.config.mode {
            Mode::NoWalls => {
                let grid = Grid::open(self.size);
                let spots = place(&grid, &placement, &mut rng).ok_or(MazeError::Placement { attempts: 1 })?;
                (grid, spots, 0)
            }
            Mode::RegenerateWalls => self.generate_placeable(&placement, &mut rng)?,
            Mode::FixedLayout => {
                let grid = self.load_layout()?;
                let spots = place(&grid, &placement, &mut rng).ok_or(MazeError::Placement { attempts: 1 })?;
                (grid, spots, 0)
            }
        };
        Ok((grid, spots, attempts, rng))
    }

    fn generate_placeable(&mut self, placement: &Placement, rng: &mut MazeRng) -> Result<(Grid, (Pos, Pos), u32)> {
        let limit = self.config.max_generation_attempts;
        for attempt in 1..=limit {
            let grid = generate(self.config.grid_size, self.config.start_policy, rng);
            match place(&grid, placement, rng) {
                Some(spots) => {
                    if let Some(store) = self.store.as_mut() {
                        store.save(&grid)?;
                    }
                    return Ok((grid, spots, attempt));
                }
                None => tracing::warn!(attempt, limit, "no valid agent/goal placement, regenerating"),
            }
        }
        Err(MazeError::Placement { attempts: limit })
    }

    fn load_layout(&self) -> Result<Grid> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| MazeError::configuration("fixed-layout mode requires a grid store"))?;
        let grid = store
            .load()?
            .ok_or_else(|| MazeError::persistence("no persisted layout to load"))?;
        if grid.size() != self.size {
            return Err(MazeError::persistence(format!(
                "persisted layout is {0}x{0}, expected {1}x{1}",
                grid.size(),
                self.size
            )));
        }
        Ok(grid)
    }

    /// Advance one step.
    pub fn step(&mut self, action: Action) -> Result<StepOutcome> {
        match self.phase {
            Phase::ReadyForReset => return Err(MazeError::usage("step called before reset")),
            Phase::Terminated => return Err(MazeError::usage("step called on a terminated episode; reset first")),
            Phase::Running => {}
        }
        let grid = self.grid.as_ref().ok_or_else(|| MazeError::usage("no layout installed"))?;

        let mut reward = 0.0;
        let (dx, dy) = action.delta();
        let nx = self.agent.x as isize + dx;
        let ny = self.agent.y as isize + dy;
        let moved = grid.in_bounds(nx, ny) && grid.is_passage(Pos::new(nx as usize, ny as usize));
        if moved {
            self.agent = Pos::new(nx as usize, ny as usize);
        } else {
            reward -= self.rewards.collision_penalty;
        }
        self.visits.record(self.agent);
        self.elapsed_steps += 1;

        let distance = self.agent.squared_distance(self.goal);
        reward -= self.rewards.step_cost;
        reward += self.rewards.progress_weight * (self.previous_squared_distance - distance) as f64;

        let mut event = if moved { StepEvent::Moved } else { StepEvent::Collision };
        let mut terminated = false;
        if self.agent == self.goal {
            reward += self.rewards.goal_bonus;
            terminated = true;
            event = StepEvent::ReachedGoal;
        } else if self.elapsed_steps >= self.max_steps {
            reward -= self.rewards.timeout.amount(distance);
            terminated = true;
            event = StepEvent::Timeout;
        }
        self.previous_squared_distance = distance;

        if terminated {
            self.phase = Phase::Terminated;
            tracing::debug!(?event, steps = self.elapsed_steps, "episode terminated");
        }
        self.reward_last = reward;
        self.total_reward += reward;

        Ok(StepOutcome {
            observation: encode(self.size, self.agent, self.goal),
            reward,
            terminated,
            truncated: false,
            info: StepInfo { moved, event, elapsed_steps: self.elapsed_steps },
        })
    }

    /// Current observation. Fails before the first reset.
    pub fn observe(&self) -> Result<ObsGrid> {
        if self.phase == Phase::ReadyForReset {
            return Err(MazeError::usage("observe called before reset"));
        }
        Ok(encode(self.size, self.agent, self.goal))
    }

    pub fn snapshot(&self) -> Option<WorldSnapshot> {
        let grid = self.grid.as_ref()?;
        Some(WorldSnapshot {
            mode: self.config.mode,
            grid: grid.clone(),
            agent: self.agent,
            goal: self.goal,
            elapsed_steps: self.elapsed_steps,
            phase: self.phase,
        })
    }

    /// Render according to the configured render mode.
    pub fn render(&self) -> RenderOutput {
        match self.snapshot() {
            Some(snap) => render(self.config.render_mode, &snap),
            None => RenderOutput::Nothing,
        }
    }
}

fn check_placement_bounds(placement: &Placement, size: usize) -> Result<()> {
    if let Placement::Fixed { agent, goal } = placement {
        if agent.x >= size || agent.y >= size || goal.x >= size || goal.y >= size {
            return Err(MazeError::configuration(format!("placement outside {size}x{size} grid")));
        }
    }
    Ok(())
}

/// Agent and goal for `grid`, or `None` when the layout cannot host them.
fn place<R: RandomSource>(grid: &Grid, placement: &Placement, rng: &mut R) -> Option<(Pos, Pos)> {
    match placement {
        Placement::Fixed { agent, goal } => {
            (grid.is_passage(*agent) && grid.is_passage(*goal)).then_some((*agent, *goal))
        }
        Placement::Random => {
            let open = grid.passages();
            if open.len() < 2 {
                return None;
            }
            let a = rng.below(open.len());
            // draw from the remaining cells so agent != goal
            let mut g = rng.below(open.len() - 1);
            if g >= a { g += 1; }
            Some((open[a], open[g]))
        }
    }
}
