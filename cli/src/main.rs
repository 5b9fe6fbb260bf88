use clap::Parser;
use outfeed_cli::app::{self, App};
use outfeed_cli::commands::{cli, demo, run};
use outfeed_cli::error::CliError;
use outfeed_cli::logging::init_tracing;
use outfeed_core::api as core_api;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let mut cfg = match args.config.as_deref() {
        Some(path) => core_api::load_from(path),
        None => core_api::load_default(),
    }
    .map_err(|e| CliError::Config(e.to_string()))?;
    app::apply_overrides(&mut cfg, &args);
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    let app = App::start(cfg, args.quiet)?;
    dispatch(args.command, &app).await
}

async fn dispatch(cmd: cli::Commands, app: &App) -> Result<i32, CliError> {
    match cmd {
        cli::Commands::Run(run_args) => run::run_command(run_args, app).await,
        cli::Commands::Demo(demo_args) => demo::run_demo(demo_args, app).await,
    }
}
