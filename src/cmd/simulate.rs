use std::path::PathBuf;

use clap::Args;
use tilewatch::config::Config;
use tilewatch::error::TwResult;
use tilewatch::sim::{self, GameScript};

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// JSON game script of board readings and button presses.
    pub script: PathBuf,

    #[command(flatten)]
    pub config: Config,
}

pub fn run(args: &SimulateArgs, config: Config) -> TwResult<()> {
    let script = GameScript::load(&args.script)?;
    println!(
        "🎥 Simulating {} vs {} ({} steps)",
        script.name1,
        script.name2,
        script.steps.len()
    );

    let outcome = sim::run_script(&script, config)?;
    println!("{}", crate::cmd::move_table(&outcome.game));

    let score = outcome.game.current_score();
    println!(
        "final state {}, score: {} {} - {} {}",
        outcome.final_state,
        outcome.game.nicknames[0],
        score[0],
        outcome.game.nicknames[1],
        score[1]
    );
    Ok(())
}
