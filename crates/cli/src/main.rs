mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use killwatch_core::Config;

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    killwatch_core::load_dotenv();
    let args = CliArgs::parse();
    let mut config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    if let Some(url) = args.redis_url {
        config.redis.url = url;
    }
    if let Some(dir) = args.data_dir {
        config.store.data_dir = dir;
    }

    match args.command {
        Command::Processor {
            workers,
            batch_limit,
        } => {
            if let Some(workers) = workers {
                config.processor.workers = workers;
            }
            if let Some(limit) = batch_limit {
                config.processor.batch_limit = limit;
            }
            config.log_summary();
            commands::run_processor(&config).await
        }
        Command::Dispatcher { throttle_ms } => {
            if let Some(ms) = throttle_ms {
                config.dispatch.throttle = std::time::Duration::from_millis(ms);
            }
            config.log_summary();
            commands::run_dispatcher(&config).await
        }
        Command::Pause => commands::set_paused(&config, true).await,
        Command::Resume => commands::set_paused(&config, false).await,
        Command::Reload => commands::request_reload(&config).await,
        Command::Status => commands::status(&config).await,
        Command::Enqueue { file } => commands::enqueue(&config, &file).await,
        Command::CheckAction {
            endpoint,
            action,
            message,
        } => commands::check_action(&config, endpoint, action, &message).await,
    }
}
