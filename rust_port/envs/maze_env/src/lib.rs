use async_trait::async_trait;
use gridworld_core::{
    make_snapshot, register_environment_with_config, EngineError, Environment, Observation, ReproducibleEngine,
    Snapshot,
};
use maze_rs::{
    from_entropy, generate, seeded, Action, EnvConfig, FileStore, GridStore, GridWorld, MazeError, Mode, Placement,
    RenderMode, RenderOutput, ResetOptions, StartPolicy, StepEvent, TimeoutPenalty,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_ENV_ID: &str = "MazeEnv-v0";
pub const WALLS_ENV_ID: &str = "MazeEnv-walls";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid_size: usize,
    pub mode: Mode,
    pub render_mode: RenderMode,
    pub seed: Option<u64>,
    /// Layout file. Written on every regeneration, read in fixed-layout mode.
    pub layout_path: Option<PathBuf>,
    /// Fixed-layout only: carve and persist a layout when none exists yet.
    pub bootstrap_layout: bool,
    /// Overrides the mode's default timeout penalty.
    pub timeout_penalty: Option<TimeoutPenalty>,
    pub placement: Option<Placement>,
    pub start_policy: StartPolicy,
    pub max_generation_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: 10,
            mode: Mode::NoWalls,
            render_mode: RenderMode::None,
            seed: None,
            layout_path: None,
            bootstrap_layout: false,
            timeout_penalty: None,
            placement: None,
            start_policy: StartPolicy::OddLattice,
            max_generation_attempts: 16,
        }
    }
}

impl Config {
    /// Preset behind `MazeEnv-walls`: a fresh 11x11 maze every episode.
    pub fn walls() -> Self {
        Self { grid_size: 11, mode: Mode::RegenerateWalls, ..Self::default() }
    }

    fn env_config(&self) -> EnvConfig {
        let mut cfg = EnvConfig::new(self.grid_size, self.mode);
        cfg.render_mode = self.render_mode;
        cfg.start_policy = self.start_policy;
        cfg.placement = self.placement.clone();
        cfg.max_generation_attempts = self.max_generation_attempts;
        cfg.seed = self.seed;
        if let Some(timeout) = self.timeout_penalty {
            let mut rewards = cfg.rewards();
            rewards.timeout = timeout;
            cfg.rewards = Some(rewards);
        }
        cfg
    }
}

/// Overlay the keys present in `overrides` on top of `base`.
pub fn config_from_json(base: Config, overrides: Option<Json>) -> Result<Config, EngineError> {
    let Some(overrides) = overrides else { return Ok(base) };
    let Json::Object(fields) = overrides else {
        return Err(EngineError::Validation("bad config: expected a JSON object".into()));
    };
    let mut merged = serde_json::to_value(&base).map_err(|e| EngineError::Internal(format!("config encode: {e}")))?;
    if let Some(map) = merged.as_object_mut() {
        map.extend(fields);
    }
    serde_json::from_value(merged).map_err(|e| EngineError::Validation(format!("bad config: {e}")))
}

/// Adapter-boundary error mapping; every library error keeps its kind.
pub fn engine_error(err: MazeError) -> EngineError {
    match err {
        MazeError::Configuration(msg) => EngineError::Configuration(msg),
        MazeError::Placement { attempts } => EngineError::Placement { attempts },
        MazeError::Persistence(msg) => EngineError::Persistence(msg),
        MazeError::Usage(msg) => EngineError::Usage(msg),
    }
}

fn parse_options(options: Option<Json>) -> Result<ResetOptions, EngineError> {
    match options {
        None | Some(Json::Null) => Ok(ResetOptions::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| EngineError::Validation(format!("bad reset options: {e}"))),
    }
}

fn event_name(event: StepEvent) -> Json {
    serde_json::to_value(event).unwrap_or(Json::Null)
}

pub struct MazeEnvironment {
    config: Config,
    world: GridWorld,
    /// Set by `terminate`; cleared by the next reset.
    closed: bool,
}

impl MazeEnvironment {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let env_cfg = config.env_config();
        let world = match &config.layout_path {
            Some(path) => GridWorld::with_store(env_cfg, Box::new(FileStore::new(path))),
            None => GridWorld::new(env_cfg),
        }
        .map_err(engine_error)?;
        tracing::debug!(mode = %config.mode, size = world.grid_size(), "maze environment created");
        Ok(Self { config, world, closed: false })
    }

    pub fn config(&self) -> &Config { &self.config }
    pub fn world(&self) -> &GridWorld { &self.world }

    /// Carve one layout and write it to `layout_path`.
    fn bootstrap_layout(&self, seed: Option<u64>) -> Result<(), EngineError> {
        let path = self
            .config
            .layout_path
            .as_ref()
            .ok_or_else(|| EngineError::Configuration("bootstrap_layout requires layout_path".into()))?;
        let mut rng = match seed.or(self.config.seed) { Some(s) => seeded(s), None => from_entropy() };
        let grid = generate(self.world.grid_size(), self.config.start_policy, &mut rng);
        FileStore::new(path).save(&grid).map_err(engine_error)?;
        tracing::info!(path = %path.display(), size = grid.size(), "bootstrapped maze layout");
        Ok(())
    }

    /// True when the layout file is absent (as opposed to unreadable or mismatched).
    fn layout_missing(&self) -> Result<bool, EngineError> {
        match &self.config.layout_path {
            Some(path) => Ok(FileStore::new(path).load().map_err(engine_error)?.is_none()),
            None => Ok(false),
        }
    }

    fn snapshot_obs(&self, event: Json) -> Result<Observation, EngineError> {
        let obs = self.world.observe().map_err(engine_error)?;
        let agent = self.world.agent();
        let goal = self.world.goal();
        let mut public = json!({
            "observation": obs.rows(),
            "agent_pos": [agent.x, agent.y],
            "goal_pos": [goal.x, goal.y],
            "grid_size": self.world.grid_size(),
            "elapsed_steps": self.world.elapsed_steps(),
            "max_steps": self.world.max_steps(),
            "mode": self.config.mode.as_str(),
            "reward_last": self.world.reward_last(),
            "total_reward": self.world.total_reward(),
            "event": event,
        });
        let frame = match self.world.render() {
            RenderOutput::Nothing => None,
            RenderOutput::Text(text) => Some(Json::String(text)),
            RenderOutput::Frame(frame) => {
                Some(serde_json::to_value(frame).map_err(|e| EngineError::Internal(format!("frame encode: {e}")))?)
            }
        };
        if let (Some(frame), Some(map)) = (frame, public.as_object_mut()) {
            map.insert("frame".into(), frame);
        }
        Ok(Observation::new(public))
    }
}

#[async_trait]
impl Environment for MazeEnvironment {
    async fn reset(&mut self, seed: Option<u64>, options: Option<Json>) -> Result<Observation, EngineError> {
        let options = parse_options(options)?;
        let (_, info) = match self.world.reset(seed, options.clone()) {
            Ok(out) => out,
            Err(MazeError::Persistence(msg)) if self.config.bootstrap_layout && self.config.mode == Mode::FixedLayout => {
                if !self.layout_missing()? {
                    return Err(EngineError::Persistence(msg));
                }
                tracing::warn!(reason = %msg, "no persisted layout; generating one");
                self.bootstrap_layout(seed)?;
                self.world.reset(seed, options).map_err(engine_error)?
            }
            Err(e) => return Err(engine_error(e)),
        };
        self.closed = false;
        let mut obs = self.snapshot_obs(json!("reset"))?;
        if let Some(map) = obs.data.as_object_mut() {
            map.insert("generation_attempts".into(), json!(info.generation_attempts));
        }
        Ok(obs)
    }

    async fn step(&mut self, action: i64) -> Result<Observation, EngineError> {
        if self.closed {
            return Err(EngineError::Usage("environment terminated; reset first".into()));
        }
        let action = Action::try_from(action).map_err(engine_error)?;
        let out = self.world.step(action).map_err(engine_error)?;
        let mut obs = self.snapshot_obs(event_name(out.info.event))?;
        obs.reward = out.reward;
        obs.terminated = out.terminated;
        obs.truncated = out.truncated;
        if let Some(map) = obs.data.as_object_mut() {
            map.insert("moved".into(), Json::Bool(out.info.moved));
        }
        Ok(obs)
    }

    async fn checkpoint(&self) -> Result<Snapshot, EngineError> {
        make_snapshot(self, 1)
    }

    async fn terminate(&mut self) -> Result<Observation, EngineError> {
        let mut obs = self.snapshot_obs(json!("terminate"))?;
        self.closed = true;
        obs.truncated = true;
        Ok(obs)
    }
}

impl ReproducibleEngine for MazeEnvironment {
    fn serialize_engine(&self) -> Result<Json, EngineError> {
        let snap = self
            .world
            .snapshot()
            .ok_or_else(|| EngineError::Usage("checkpoint called before reset".into()))?;
        let visits: Vec<[usize; 3]> = self.world.visits().iter().map(|(p, n)| [p.x, p.y, n as usize]).collect();
        Ok(json!({
            "world": snap,
            "reward_last": self.world.reward_last(),
            "total_reward": self.world.total_reward(),
            "previous_squared_distance": self.world.previous_squared_distance(),
            "visits": visits,
        }))
    }

    fn engine_name(&self) -> String { "maze".into() }
}

fn factory(base: fn() -> Config) -> gridworld_core::EnvConfigFactory {
    Arc::new(move |cfg: Option<Json>| -> Result<Box<dyn Environment>, EngineError> {
        let cfg = config_from_json(base(), cfg)?;
        Ok(Box::new(MazeEnvironment::new(cfg)?))
    })
}

// Registration helper for registry-based construction
pub fn register_default_env() {
    register_environment_with_config(DEFAULT_ENV_ID, factory(Config::default));
    register_environment_with_config(WALLS_ENV_ID, factory(Config::walls));
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_rs::Pos;

    #[tokio::test]
    async fn reset_reports_corner_placement() {
        let mut env = MazeEnvironment::new(Config::default()).unwrap();
        let obs = env.reset(None, None).await.unwrap();
        assert_eq!(obs.data["agent_pos"], json!([0, 0]));
        assert_eq!(obs.data["goal_pos"], json!([9, 8]));
        assert_eq!(obs.data["event"], "reset");
        assert_eq!(obs.data["observation"][0][0], 1.0);
        assert_eq!(obs.data["observation"][8][9], 0.5);
        assert!(obs.data.get("frame").is_none());
        assert!(!obs.terminated);
    }

    #[tokio::test]
    async fn step_maps_events_and_rewards() {
        let mut env = MazeEnvironment::new(Config::default()).unwrap();
        env.reset(None, None).await.unwrap();
        let obs = env.step(0).await.unwrap();
        assert_eq!(obs.data["event"], "collision");
        assert_eq!(obs.data["moved"], false);
        assert!((obs.reward + 1.8).abs() < 1e-9);
        let obs = env.step(1).await.unwrap();
        assert_eq!(obs.data["event"], "moved");
        assert_eq!(obs.data["agent_pos"], json!([1, 0]));
    }

    #[tokio::test]
    async fn invalid_action_is_usage_error() {
        let mut env = MazeEnvironment::new(Config::default()).unwrap();
        assert!(matches!(env.step(0).await, Err(EngineError::Usage(_))));
        env.reset(None, None).await.unwrap();
        assert!(matches!(env.step(7).await, Err(EngineError::Usage(_))));
    }

    #[tokio::test]
    async fn reset_options_override_placement() {
        let mut env = MazeEnvironment::new(Config { grid_size: 5, ..Config::default() }).unwrap();
        let opts = json!({ "placement": { "kind": "fixed", "agent": { "x": 2, "y": 2 }, "goal": { "x": 4, "y": 0 } } });
        let obs = env.reset(None, Some(opts)).await.unwrap();
        assert_eq!(obs.data["agent_pos"], json!([2, 2]));
        assert_eq!(env.world().goal(), Pos::new(4, 0));
        assert!(matches!(env.reset(None, Some(json!({ "placement": 3 }))).await, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn terminate_blocks_steps_until_reset() {
        let mut env = MazeEnvironment::new(Config::default()).unwrap();
        env.reset(None, None).await.unwrap();
        let obs = env.terminate().await.unwrap();
        assert!(obs.truncated);
        assert!(matches!(env.step(1).await, Err(EngineError::Usage(_))));
        env.reset(None, None).await.unwrap();
        assert!(env.step(1).await.is_ok());
    }

    #[tokio::test]
    async fn human_render_attaches_text_frame() {
        let cfg = Config { grid_size: 3, render_mode: RenderMode::Human, ..Config::default() };
        let mut env = MazeEnvironment::new(cfg).unwrap();
        let obs = env.reset(None, None).await.unwrap();
        assert_eq!(obs.data["frame"], "A··\n··G\n···");
    }

    #[tokio::test]
    async fn checkpoint_captures_world() {
        let mut env = MazeEnvironment::new(Config { seed: Some(3), ..Config::walls() }).unwrap();
        assert!(matches!(env.checkpoint().await, Err(EngineError::Usage(_))));
        env.reset(None, None).await.unwrap();
        env.step(2).await.unwrap();
        let snap = env.checkpoint().await.unwrap();
        assert_eq!(snap.engine, "maze");
        assert_eq!(snap.data["world"]["elapsed_steps"], 1);
        assert_eq!(snap.data["world"]["grid"]["size"], 11);
        assert_eq!(snap.data["world"]["mode"], "regenerate-walls");
    }

    #[test]
    fn config_overlay_keeps_base_defaults() {
        let cfg = config_from_json(Config::walls(), Some(json!({ "seed": 9 }))).unwrap();
        assert_eq!(cfg.mode, Mode::RegenerateWalls);
        assert_eq!(cfg.grid_size, 11);
        assert_eq!(cfg.seed, Some(9));
        assert!(matches!(config_from_json(Config::default(), Some(json!([1]))), Err(EngineError::Validation(_))));
        assert!(matches!(
            config_from_json(Config::default(), Some(json!({ "mode": "lava" }))),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn timeout_override_reaches_reward_profile() {
        let cfg = Config { timeout_penalty: Some(TimeoutPenalty::Fixed(7.0)), ..Config::walls() };
        let env = MazeEnvironment::new(cfg).unwrap();
        assert_eq!(env.world().rewards().timeout, TimeoutPenalty::Fixed(7.0));
        assert_eq!(env.world().rewards().goal_bonus, 100.0);
    }

    #[test]
    fn fixed_layout_without_path_is_configuration_error() {
        let cfg = Config { mode: Mode::FixedLayout, ..Config::default() };
        assert!(matches!(MazeEnvironment::new(cfg), Err(EngineError::Configuration(_))));
    }
}
