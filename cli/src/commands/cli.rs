use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use outfeed_core::api::HookKind;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookArg {
    /// Capture writes made through the in-process stream ports.
    Writer,
    /// Capture file descriptors 1 and 2 (unix), including child processes.
    Fd,
}

impl From<HookArg> for HookKind {
    fn from(v: HookArg) -> Self {
        match v {
            HookArg::Writer => HookKind::Writer,
            HookArg::Fd => HookKind::Fd,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "outfeed", version, about = "Capture stdout/stderr into an activity log")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.outfeed/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Interception mechanism (overrides config).
    #[arg(long, value_enum, global = true)]
    pub hook: Option<HookArg>,

    /// Also forward captured bytes to the original stream.
    #[arg(long, global = true)]
    pub tee: bool,

    /// Don't print the activity log at the end.
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Save the activity log to this file.
    #[arg(long)]
    pub save_log: Option<PathBuf>,

    /// Command to run, with its arguments.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DemoArgs {
    /// Number of producer threads.
    #[arg(long, default_value_t = 4)]
    pub threads: usize,

    /// Progress lines written by each thread.
    #[arg(long, default_value_t = 5)]
    pub lines: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a command and collect its output into the activity log.
    Run(RunArgs),
    /// Write progress lines from several threads and show how they are fanned out.
    Demo(DemoArgs),
}
