//! Sage Intacct extractor.
//!
//! ```sh
//! KBC_DATADIR=/data intacct-extract            # action from config.json, default `run`
//! intacct-extract list_endpoints --data-dir ./data
//! ```
//!
//! Exits with 1 on configuration or credential problems and 2 on anything else.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use ledgerpipe_ia_extract::{Action, Component, Config, ConnectionSettings, Error};

#[derive(Parser)]
#[command(name = "intacct-extract", version, about = "Sage Intacct data extractor")]
struct Cli {
    /// run, list_endpoints, list_columns, list_primary_keys or testConnection
    action: Option<String>,

    /// Directory holding config.json, in/ and out/
    #[arg(long, env = "KBC_DATADIR", default_value = "/data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let debug = Config::load(&cli.data_dir)
        .map(|config| config.parameters.debug)
        .unwrap_or(false);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if e.is_user_error() {
                ExitCode::from(1)
            } else {
                ExitCode::from(2)
            }
        }
    }
}

async fn execute(cli: Cli) -> Result<(), Error> {
    let action = cli.action.as_deref().map(str::parse::<Action>).transpose()?;

    let mut component =
        Component::new(cli.data_dir, action, ConnectionSettings::default()).await?;

    if let Some(output) = component.execute_action().await? {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
