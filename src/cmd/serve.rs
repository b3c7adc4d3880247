use std::path::Path;

use anyhow::Result;
use forge_board::board::server::{ServerConfig, open_database, start_server};
use forge_board::config::BoardToml;

pub async fn cmd_serve(config: &BoardToml, dev: bool) -> Result<()> {
    let server = ServerConfig {
        dev_mode: dev,
        ..ServerConfig::from_toml(config)
    };
    start_server(server).await
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    open_database(db_path)?;
    println!("Board database initialized at {}", db_path.display());
    Ok(())
}
