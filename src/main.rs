mod cli;

use crate::cli::app::{Cli, run};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    cli::logging::init();
    run(Cli::parse())
}
