mod cli;
mod host;

use clap::Parser;
use cli::{Cli, Commands};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use colored::Colorize;
use hp_core::config::load_config;
use hp_core::init::{generate_hotpatch_structure, InitOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init { force, minimal } => {
            let options = InitOptions {
                target_dir: cli.root,
                force,
                minimal,
            };
            let dir = generate_hotpatch_structure(options).await?;
            println!("{} {}", "Initialized".green().bold(), dir.display());
        }
        Commands::List { json } => {
            let config = load_config(&cli.root).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
            if config.packages.is_empty() {
                println!("No packages configured. Run `hotpatch init` first.");
                return Ok(());
            }
            for package in &config.packages {
                let remote = match &package.remote {
                    Some(remote) => format!(
                        "remote {} ({} files, {})",
                        remote.version,
                        remote.files.len(),
                        host::format_bytes(remote.total_bytes())
                    ),
                    None => "no simulated remote".to_string(),
                };
                println!(
                    "{}  {}  {}",
                    package.name.bold(),
                    package.play_mode.to_string().cyan(),
                    remote.dimmed()
                );
            }
        }
        Commands::Run(args) => {
            let config = load_config(&cli.root).await?;
            let package = config
                .package(&args.package)
                .cloned()
                .ok_or_else(|| eyre!("package '{}' is not configured", args.package))?;

            let report = host::run(package, config.settings, &args).await?;
            if !args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            match report.disposition {
                Some(disposition) if disposition.is_success() => {}
                other => return Err(eyre!("patch run did not succeed: {other:?}")),
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
