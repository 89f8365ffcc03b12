mod compile;
mod generate;
mod merge;

use compile::run_compile;
use generate::{run_generate, run_worker};
use merge::run_merge;

use anyhow::Result;

use crate::cli::Command;
use crate::display::Context;

pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Generate(args) => run_generate(args, ctx),
        Command::Worker(args) => run_worker(args, ctx),
        Command::Merge(args) => run_merge(args, ctx),
        Command::Compile(args) => run_compile(args, ctx),
    }
}
