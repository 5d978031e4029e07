use clap::{Parser, Subcommand};

use self::{
    classify::ClassifyArg, discover_thresholds::DiscoverThresholdsArg,
    observables::ObservablesArg,
};

mod classify;
mod discover_thresholds;
mod observables;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Cluster fitted slopes into defector/neutral/collaborator thresholds
    DiscoverThresholds(#[clap(flatten)] DiscoverThresholdsArg),
    /// Classify every player of a games file
    Classify(#[clap(flatten)] ClassifyArg),
    /// Estimate the observables of one rule with bootstrap errors
    Observables(#[clap(flatten)] ObservablesArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::DiscoverThresholds(arg) => discover_thresholds::run(&arg)?,
        Mode::Classify(arg) => classify::run(&arg)?,
        Mode::Observables(arg) => observables::run(&arg)?,
    }
    Ok(())
}
