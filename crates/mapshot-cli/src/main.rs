//! mapshot - zoomable screenshots for Factorio.

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mapshot_cli::payload;
use mapshot_cli::render::{self, RenderOptions};
use mapshot_factorio::{Factorio, FactorioSettings};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// mapshot generates zoomable screenshots for Factorio
#[derive(Parser, Debug)]
#[command(name = "mapshot", version, about, long_about = None)]
struct Cli {
    /// Factorio data directory (holding saves/, mods/ and script-output/)
    #[arg(long, global = true)]
    factorio_datadir: Option<PathBuf>,

    /// Factorio binary
    #[arg(long, global = true)]
    factorio_binary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a screenshot from a save
    Render {
        /// Save name (from Factorio's saves directory) or path to a .zip
        save: String,

        /// Wait for Factorio to exit instead of stopping it
        #[arg(long)]
        keep_running: bool,
    },

    /// Show what mapshot knows about the Factorio installation
    Info,

    /// Show the version of the mod
    Version,
}

impl Cli {
    fn factorio(&self) -> Result<Factorio, mapshot_factorio::FactorioError> {
        Factorio::new(&FactorioSettings {
            datadir: self.factorio_datadir.clone(),
            binary: self.factorio_binary.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout only carries results.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("mapshot=info,mapshot_cli=info,mapshot_factorio=info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Commands::Version => {
            println!("{}", payload::VERSION);
        }
        Commands::Info => {
            let factorio = cli.factorio()?;
            println!("datadir: {}", factorio.data_dir().display());
            println!("binary: {}", factorio.binary().display());
        }
        Commands::Render { save, keep_running } => {
            let factorio = cli.factorio()?;
            let options = RenderOptions {
                keep_running: *keep_running,
                ..RenderOptions::default()
            };

            let shutdown = CancellationToken::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        warn!("Interrupt received, stopping");
                        shutdown.cancel();
                    }
                });
            }

            println!("Generating mapshot for savegame {:?}", save);
            let report = render::render(&factorio, save, &options, shutdown).await;

            if let Err(e) = &report.cleanup {
                eprintln!("Warning: {}", e);
            }
            let rendered = report.outcome?;
            println!("Output: {}", rendered.output.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "mapshot",
            "--factorio-datadir",
            "/data",
            "render",
            "foo",
            "--keep-running",
        ])
        .unwrap();

        assert_eq!(cli.factorio_datadir, Some(PathBuf::from("/data")));
        match cli.command {
            Commands::Render { save, keep_running } => {
                assert_eq!(save, "foo");
                assert!(keep_running);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_render_requires_save() {
        assert!(Cli::try_parse_from(["mapshot", "render"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mapshot", "info", "--factorio-binary", "/bin/factorio"]).unwrap();
        assert_eq!(cli.factorio_binary, Some(PathBuf::from("/bin/factorio")));
        assert!(matches!(cli.command, Commands::Info));
    }
}
