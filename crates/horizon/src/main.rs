use clap::Parser;
use horizon::{Cli, init_logging, run_report};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_deref(), &cli.log_level)?;

    let report = run_report(&cli)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!("Report written");
    Ok(())
}
