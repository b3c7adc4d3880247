use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use forge_board::config::BoardToml;
use forge_board::logging;

mod cmd;

#[derive(Parser)]
#[command(name = "forge-board")]
#[command(version, about = "Kanban board with fractional order keys")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to board.toml (defaults to .forge/board.toml when present)
    #[arg(long, global = true, env = "FORGE_BOARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Database path
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Enable dev mode (permissive CORS, bind all interfaces)
        #[arg(long)]
        dev: bool,
    },
    /// Create the database and run migrations
    Init {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Print an order key between two optional bounds
    Key {
        /// Lower bound (exclusive)
        #[arg(long)]
        left: Option<String>,

        /// Upper bound (exclusive)
        #[arg(long)]
        right: Option<String>,

        /// Always use the middle symbol instead of a random one near it
        #[arg(long)]
        no_jitter: bool,
    },
    /// Reassign evenly spaced keys to one column, keeping its order
    Rebalance {
        #[arg(long)]
        project: i64,

        #[arg(long)]
        column: String,

        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Move an issue to the end of a column, or before another issue
    Move {
        #[arg(long)]
        issue: i64,

        #[arg(long)]
        column: String,

        /// Issue to land immediately before
        #[arg(long)]
        before: Option<i64>,

        #[arg(long)]
        db_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut config = BoardToml::resolve(cli.config.as_deref())?;
    for warning in config.validate() {
        warn!("{}", warning);
    }

    match cli.command {
        Commands::Serve { port, db_path, dev } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(db_path) = db_path {
                config.server.db_path = db_path;
            }
            cmd::cmd_serve(&config, dev).await?;
        }
        Commands::Init { db_path } => {
            let db_path = db_path.unwrap_or(config.server.db_path);
            cmd::cmd_init(&db_path)?;
        }
        Commands::Key {
            left,
            right,
            no_jitter,
        } => {
            cmd::cmd_key(
                &config.ordering,
                left.as_deref(),
                right.as_deref(),
                no_jitter,
            )?;
        }
        Commands::Rebalance {
            project,
            column,
            db_path,
        } => {
            let db_path = db_path.unwrap_or(config.server.db_path);
            cmd::cmd_rebalance(&db_path, &config.ordering, project, &column)?;
        }
        Commands::Move {
            issue,
            column,
            before,
            db_path,
        } => {
            let db_path = db_path.unwrap_or(config.server.db_path);
            cmd::cmd_move(&db_path, &config.ordering, issue, &column, before)?;
        }
    }

    Ok(())
}
