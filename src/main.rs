use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use session_board::{server, storage, Config};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "session-board")]
#[command(about = "Shared real-time board: one JSON document synced to every connected screen", version)]
struct Cli {
    /// TOML config file; BOARD_* environment variables override it
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the board server
    Serve {
        #[arg(long)]
        host: Option<IpAddr>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(short, long)]
        data_file: Option<PathBuf>,
    },

    /// Print the stored document
    Show {
        #[arg(short, long)]
        data_file: Option<PathBuf>,
    },

    /// Reset the stored document to defaults
    Reset {
        #[arg(short, long)]
        data_file: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        data_file: None,
    });

    match command {
        Commands::Serve {
            host,
            port,
            data_file,
        } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(path) = data_file {
                config.data_file = path;
            }

            println!(
                "{}",
                format!("🌐 Starting board server on port {}...", config.port)
                    .cyan()
                    .bold()
            );
            server::start(config).await?;
        }

        Commands::Show { data_file } => {
            storage::show(&data_file.unwrap_or(config.data_file))?;
        }

        Commands::Reset { data_file } => {
            let path = data_file.unwrap_or(config.data_file);
            storage::reset(&path)?;
            println!(
                "{} Board reset: {}",
                "✓".green(),
                path.display().to_string().bright_white()
            );
        }
    }

    Ok(())
}
