use clap::Parser;
use knit_cli::{Cli, Palette};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), anyhow::Error> {
    let palette = Palette::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(palette.ansi())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    knit_cli::run(&cli, &mut out, &palette)
}
