use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use playdeck::app::{run, RunOptions};
use playdeck::storage::config::Backend;

#[derive(Debug, Parser)]
#[command(name = "playdeck", version, about = "Terminal media playback controller")]
struct Cli {
    #[arg(long, help = "Enable verbose debug logs")]
    debug: bool,

    #[arg(long, value_name = "PATH", help = "Read configuration from PATH")]
    config: Option<PathBuf>,

    #[arg(long, value_parser = parse_backend, help = "Playback backend: simulated or vlc-http")]
    backend: Option<Backend>,

    #[arg(long, value_name = "PATH", help = "Write logs to PATH instead of stderr")]
    log_file: Option<PathBuf>,
}

fn parse_backend(value: &str) -> Result<Backend, String> {
    Backend::parse(value).map_err(|err| err.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(RunOptions {
        debug: cli.debug,
        config_path: cli.config,
        backend: cli.backend,
        log_file: cli.log_file,
    })
}
