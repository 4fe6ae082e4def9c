use std::path::PathBuf;

use clap::Parser;

use regex_proxy::lifecycle::{start, StartupOptions};

/// Regex-driven HTTP reverse proxy.
#[derive(Debug, Parser)]
#[command(name = "regex-proxy", version, about)]
struct Cli {
    /// TOML configuration file; the built-in route table is used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`.
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    start(StartupOptions {
        config_path: cli.config,
        bind: cli.bind,
    })
    .await?;

    Ok(())
}
