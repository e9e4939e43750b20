use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Killmail policy matcher and notifier.
///
/// Most settings come from the environment (or `.env`); the flags below
/// override them per invocation.
#[derive(Parser, Debug)]
#[command(name = "killwatch", version, about = "Killmail policy matcher and notifier")]
pub struct CliArgs {
    /// Redis connection URL
    #[arg(long, global = true, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Directory holding `policies/` and `actions/`
    #[arg(long, global = true, env = "KILLWATCH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Match inbound killmails against tracked policies
    Processor {
        /// Concurrent event workers (0 runs inline)
        #[arg(long, env = "PROCESSOR_WORKERS")]
        workers: Option<usize>,

        /// Events popped per tick
        #[arg(long, env = "PROCESSOR_BATCH_LIMIT")]
        batch_limit: Option<usize>,
    },

    /// Deliver matches to their policy actions
    Dispatcher {
        /// Pause between sends, in milliseconds
        #[arg(long, env = "DISPATCH_THROTTLE_MS")]
        throttle_ms: Option<u64>,
    },

    /// Set the stop flag; both pipelines idle until resumed
    Pause,

    /// Clear the stop flag
    Resume,

    /// Ask the processor to rebuild its policy snapshot
    Reload,

    /// Print queue depths and control flags
    Status,

    /// Push a raw killmail payload onto the inbound queue
    Enqueue {
        /// JSON file containing one killmail
        file: PathBuf,
    },

    /// Validate an action endpoint and send it a test message
    CheckAction {
        /// Endpoint URL to check
        #[arg(long, conflicts_with = "action", required_unless_present = "action")]
        endpoint: Option<String>,

        /// Id of a stored action to check
        #[arg(long)]
        action: Option<String>,

        /// Message body to send
        #[arg(long, default_value = "This is a test message from killwatch")]
        message: String,
    },
}
