//! Core traits and types shared by grid-world environments.
//! Contracts: Observation, Snapshot, Environment, plus a name-keyed factory registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Observation contract. Enforces presence of terminated/truncated and the
/// step reward; additional fields live in `data`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub terminated: bool,
    pub truncated: bool,
    #[serde(default)]
    pub reward: f64,
    /// Per-environment fields (e.g., observation grid, agent_pos, total_reward).
    #[serde(default)]
    pub data: Json,
}

impl Observation {
    pub fn new(data: Json) -> Self {
        Self { terminated: false, truncated: false, reward: 0.0, data }
    }
}

/// Snapshot contract for checkpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub engine: String,
    pub data: Json,
}

/// Environment errors. Services map these onto their own response codes.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not place agent and goal after {attempts} attempt(s)")]
    Placement { attempts: u32 },
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("usage error: {0}")]
    Usage(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Core async environment trait.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Start a new episode. `seed` reseeds the environment's random source;
    /// `options` carries per-episode overrides as JSON.
    async fn reset(&mut self, seed: Option<u64>, options: Option<Json>) -> Result<Observation, EngineError>;
    async fn step(&mut self, action: i64) -> Result<Observation, EngineError>;
    async fn checkpoint(&self) -> Result<Snapshot, EngineError>;
    async fn terminate(&mut self) -> Result<Observation, EngineError>;
}

// ---------------------------------
// Environment factory + registry
// ---------------------------------

/// Config-aware factory for constructing environment instances.
pub type EnvConfigFactory = Arc<dyn Fn(Option<Json>) -> Result<Box<dyn Environment>, EngineError> + Send + Sync + 'static>;

static ENV_REGISTRY: OnceLock<Mutex<HashMap<String, EnvConfigFactory>>> = OnceLock::new();

fn registry() -> MutexGuard<'static, HashMap<String, EnvConfigFactory>> {
    // poisoned registry: keep serving the map
    ENV_REGISTRY
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Register an environment factory that ignores config.
pub fn register_environment(name: &str, factory: Arc<dyn Fn() -> Box<dyn Environment> + Send + Sync + 'static>) {
    let f: EnvConfigFactory = Arc::new(move |_cfg: Option<Json>| Ok(factory())) as EnvConfigFactory;
    register_environment_with_config(name, f);
}

/// Register a config-aware environment factory under a unique name. Overwrites any existing entry.
pub fn register_environment_with_config(name: &str, factory: EnvConfigFactory) {
    registry().insert(name.to_string(), factory);
}

/// Instantiate a registered environment by name with optional JSON config.
pub fn create_environment_with_config(name: &str, config: Option<Json>) -> Result<Box<dyn Environment>, EngineError> {
    // construct outside the lock
    let f = registry()
        .get(name)
        .cloned()
        .ok_or_else(|| EngineError::NotFound(format!("unsupported environment: {name}")))?;
    f(config)
}

/// Instantiate a registered environment by name with no config.
pub fn create_environment(name: &str) -> Result<Box<dyn Environment>, EngineError> {
    create_environment_with_config(name, None)
}

/// List registered environment names, sorted.
pub fn list_environments() -> Vec<String> {
    let mut names: Vec<String> = registry().keys().cloned().collect();
    names.sort();
    names
}

// -----------------------
// Reproducibility traits
// -----------------------

/// Engines whose state can be serialized into a checkpoint.
pub trait ReproducibleEngine: Send + Sync {
    fn serialize_engine(&self) -> Result<Json, EngineError>;
    fn engine_name(&self) -> String;
}

/// Helper to build Snapshots from a ReproducibleEngine.
pub fn make_snapshot(engine: &dyn ReproducibleEngine, version: u32) -> Result<Snapshot, EngineError> {
    let data = engine.serialize_engine()?;
    Ok(Snapshot { version, engine: engine.engine_name(), data })
}

// -----------------------
// Tests
// -----------------------
