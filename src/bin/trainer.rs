//! Trainer Binary
//!
//! Runs one pose synchronization experiment end to end: builds the synthetic
//! graph and ground truth, trains the particle cloud against the observed
//! relative measures, and reports Sinkhorn distances to the truth.

use clap::Parser;
use possync::training::Args;
use possync::training::Config;
use possync::training::Trainer;

fn main() -> anyhow::Result<()> {
    possync::log();
    let args = Args::parse();
    let config = Config::try_from(&args)?;
    let last = Trainer::build(config)?.train()?;
    log::info!("final loss {last:.6}");
    Ok(())
}
