//! Maze demo CLI
//!
//! Animates recursive-backtracker carving in the terminal, then runs random
//! rollouts through the registered environment.

use clap::Parser;
use gridworld_core::{create_environment_with_config, Environment};
use maze_env::{register_default_env, DEFAULT_ENV_ID};
use maze_rs::{seeded, from_entropy, CarveEvent, Carver, Cell, Mode, Pos, RandomSource, StartPolicy};
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

const CLEAR: &str = "\x1b[2J\x1b[H";

#[derive(Parser, Debug)]
#[command(name = "maze_demo", about = "Carve a maze and roll out a random agent")]
struct Args {
    /// Maze side length (even values round up in wall modes)
    #[arg(short, long, default_value_t = 21)]
    size: usize,

    /// Seed for carving and for the rollout policy (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Delay between animation frames in milliseconds
    #[arg(long, default_value_t = 15)]
    delay_ms: u64,

    /// Layout mode for the rollout: no-walls, regenerate-walls
    #[arg(short, long, default_value = "regenerate-walls")]
    mode: Mode,

    /// Start carving from any cell instead of an odd one
    #[arg(long)]
    any_start: bool,

    /// Skip the carving animation
    #[arg(long)]
    no_animation: bool,

    /// Number of random-policy episodes
    #[arg(short, long, default_value_t = 1)]
    episodes: u32,

    /// Print every rollout frame
    #[arg(long)]
    show_steps: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn carving_frame(carver: &Carver) -> String {
    let grid = carver.grid();
    let cursor = carver.cursor();
    let mut out = String::with_capacity(grid.size() * (grid.size() + 1) * 3);
    for y in 0..grid.size() {
        for x in 0..grid.size() {
            let p = Pos::new(x, y);
            out.push(if Some(p) == cursor {
                '@'
            } else if grid.get(p) == Cell::Wall {
                '█'
            } else {
                ' '
            });
        }
        out.push('\n');
    }
    out
}

fn animate(args: &Args, policy: StartPolicy) -> std::io::Result<()> {
    let mut rng = match args.seed { Some(s) => seeded(s), None => from_entropy() };
    let mut carver = Carver::new(args.size, policy, &mut rng);
    let mut stdout = std::io::stdout().lock();
    let (mut carved, mut backtracked) = (0u32, 0u32);
    while let Some(event) = carver.step(&mut rng) {
        match event {
            CarveEvent::Carved { .. } => carved += 1,
            // only carving changes the picture
            CarveEvent::Backtracked { .. } => {
                backtracked += 1;
                continue;
            }
        }
        write!(stdout, "{CLEAR}{}", carving_frame(&carver))?;
        stdout.flush()?;
        std::thread::sleep(Duration::from_millis(args.delay_ms));
    }
    write!(stdout, "{CLEAR}{}", carving_frame(&carver))?;
    stdout.flush()?;
    info!(carved, backtracked, passages = carver.grid().passage_count(), "carving finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let policy = if args.any_start { StartPolicy::AnyCell } else { StartPolicy::OddLattice };
    if !args.no_animation {
        animate(&args, policy)?;
    }

    if args.mode == Mode::FixedLayout {
        return Err("the demo rolls out in no-walls or regenerate-walls mode".into());
    }

    register_default_env();
    let render_mode = if args.show_steps { "human" } else { "none" };
    let cfg = json!({
        "grid_size": args.size,
        "mode": args.mode,
        "seed": args.seed,
        "start_policy": policy,
        "render_mode": render_mode,
    });
    let mut env = create_environment_with_config(DEFAULT_ENV_ID, Some(cfg))?;
    let mut picker = match args.seed { Some(s) => seeded(s.wrapping_add(1)), None => from_entropy() };

    for episode in 0..args.episodes {
        let obs = env.reset(None, None).await?;
        info!(episode, agent = %obs.data["agent_pos"], goal = %obs.data["goal_pos"], "episode start");
        let mut last;
        loop {
            let action = picker.below(4) as i64;
            last = env.step(action).await?;
            if args.show_steps {
                if let Some(frame) = last.data["frame"].as_str() {
                    println!("{CLEAR}{frame}");
                }
            }
            debug!(action, reward = last.reward, event = %last.data["event"], "step");
            if last.terminated || last.truncated { break; }
        }
        info!(
            episode,
            steps = %last.data["elapsed_steps"],
            outcome = %last.data["event"],
            total_reward = %last.data["total_reward"],
            "episode finished"
        );
    }
    Ok(())
}
