//! Battle Steps CLI
//!
//! Prints the step list for a battle file, or plays the battle out with
//! seeded dice and the headless casualty policy.

use std::path::PathBuf;
use std::process::ExitCode;

use battle_steps::battle::{
    run_battle, run_round, AutoBattleActions, BattleSnapshot, BattleState, BattleSteps,
    RandomDiceRoller, StepDetails, StepEvent, StepExecutor, WhoWon,
};
use battle_steps::core::Result;
use clap::Parser;
use serde::Serialize;

/// Battle Steps - list or run the steps of an Axis & Allies style battle
#[derive(Parser, Debug)]
#[command(name = "battle_steps")]
#[command(about = "Sequence and run battle rounds from a TOML or JSON battle file")]
struct Args {
    /// Battle file (.toml or .json)
    #[arg(long)]
    snapshot: PathBuf,

    /// Play the battle instead of only listing the first round's steps
    #[arg(long)]
    execute: bool,

    /// Rounds to play with --execute (0 = until the battle ends)
    #[arg(long, default_value_t = 0)]
    rounds: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,

    /// Evaders submerge whenever asked
    #[arg(long)]
    submerge: bool,

    /// Retreat to the first offered territory whenever asked
    #[arg(long)]
    retreat: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult {
    steps: Vec<StepDetails>,
    executed: bool,
    seed: u64,
    winner: Option<WhoWon>,
    rounds: u32,
    attackers_left: usize,
    defenders_left: usize,
    killed: usize,
    submerged: usize,
    retreated: usize,
    events: Vec<StepEvent>,
}

impl RunResult {
    fn new(steps: Vec<StepDetails>, seed: u64, state: &BattleState) -> Self {
        Self {
            steps,
            executed: false,
            seed,
            winner: state.outcome,
            rounds: state.round,
            attackers_left: state.attacking_units.len(),
            defenders_left: state.defending_units.len(),
            killed: state.killed.len(),
            submerged: state.submerged.len(),
            retreated: state.retreated.len(),
            events: Vec::new(),
        }
    }
}

fn run(args: &Args) -> Result<RunResult> {
    let mut state = BattleSnapshot::load(&args.snapshot)?.into_state()?;
    let steps = BattleSteps::new(&state).step_details();
    let seed = args.seed.unwrap_or_else(rand::random);

    if !args.execute {
        return Ok(RunResult::new(steps, seed, &state));
    }

    let actions = AutoBattleActions {
        submerge: args.submerge,
        retreat: args.retreat,
    };
    let mut executor = StepExecutor::new(RandomDiceRoller::new(seed), actions);
    if args.rounds == 0 {
        run_battle(&mut state, &mut executor)?;
    } else {
        for _ in 0..args.rounds {
            run_round(&mut state, &mut executor)?;
            if state.over {
                break;
            }
            state.advance_round();
        }
    }

    let (_, _, log) = executor.into_parts();
    let mut result = RunResult::new(steps, seed, &state);
    result.executed = true;
    result.events = log.events;
    Ok(result)
}

fn print_text(result: &RunResult) {
    println!("Battle Steps");
    println!("============");
    for (index, step) in result.steps.iter().enumerate() {
        println!("{:>3}. {}", index + 1, step.name);
    }
    if !result.executed {
        return;
    }

    println!();
    let mut round = 0;
    for event in &result.events {
        if event.round != round {
            round = event.round;
            println!("--- Round {} ---", round);
        }
        println!("  {}: {}", event.step, event.description);
    }
    println!();
    match result.winner {
        Some(winner) => println!("Winner: {}", winner.label()),
        None => println!("Winner: undecided"),
    }
    println!("Rounds: {}", result.rounds);
    println!(
        "Left: {} attacking, {} defending",
        result.attackers_left, result.defenders_left
    );
    println!(
        "Killed: {}  Submerged: {}  Retreated: {}",
        result.killed, result.submerged, result.retreated
    );
    println!("Seed: {}", result.seed);
}

fn print_json(result: &RunResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let result = match run(&args) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.format.as_str() {
        "text" => print_text(&result),
        "json" => {
            if let Err(e) = print_json(&result) {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
        _ => {
            eprintln!("Unknown format '{}', defaulting to text", args.format);
            print_text(&result);
        }
    }
    ExitCode::SUCCESS
}
