// src/main.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ttlkv::{config, expire, persistence, repl, Store};

#[derive(Parser, Debug)]
#[command(name = "gokv", version, about = "In-memory key-value store with TTL and snapshots")]
struct Args {
    /// Data persistence path including file name
    #[arg(short = 'p', long = "path", default_value = "./gokv-data")]
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg_path = config::config_path();
    let cfg = config::load(&cfg_path)?;

    // 日志写 stderr，stdout 只留给命令结果
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    config::log_source(&cfg_path, &cfg);
    info!(path = %args.path.display(), "starting gokv");

    let store = Arc::new(Store::new());
    if cfg.restore_on_start && args.path.exists() {
        if let Err(e) = persistence::load(&store, &args.path) {
            warn!("restoring snapshot: {}", e);
        }
    }

    let mut tasks = Vec::new();
    if cfg.snapshot_interval_secs > 0 {
        tasks.push(persistence::start_snapshotter(
            store.clone(),
            args.path.clone(),
            cfg.snapshot_interval_secs,
        ));
    }
    if cfg.sweep_interval_secs > 0 {
        tasks.push(expire::start_cleaner(store.clone(), cfg.sweep_interval_secs));
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = repl::run(&store, stdin, tokio::io::stdout()).await;

    for task in tasks {
        task.abort();
    }
    info!("gokv stopped");
    result
}
