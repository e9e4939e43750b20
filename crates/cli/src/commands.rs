//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};

use killwatch_core::{Action, Config, Killmail};
use killwatch_notify::{send_test_message, DispatchService, DispatchSettings, HttpNotifierFactory};
use killwatch_processor::{PolicyTracker, Processor, ProcessorSettings};
use killwatch_queue::{
    connect, now_score, ControlPlane, Flag, PopOrder, RedisControl, RedisQueue, ScoredQueue,
    MATCHED_QUEUE, PROCESSING_QUEUE,
};
use killwatch_store::FileStore;
use killwatch_universe::{CachedUniverse, EsiClient};

// ── Wiring ──────────────────────────────────────────────────────────

struct Backend {
    inbound: RedisQueue,
    matched: RedisQueue,
    control: RedisControl,
}

async fn backend(config: &Config) -> Result<Backend> {
    let conn = connect(&config.redis.url)
        .await
        .with_context(|| format!("failed to connect to {}", config.redis.redacted_url()))?;
    Ok(Backend {
        inbound: RedisQueue::new(conn.clone(), PROCESSING_QUEUE),
        matched: RedisQueue::new(conn.clone(), MATCHED_QUEUE),
        control: RedisControl::new(conn),
    })
}

fn open_store(config: &Config) -> Result<Arc<FileStore>> {
    let store = FileStore::open(&config.store.data_dir).with_context(|| {
        format!(
            "failed to open data directory {}",
            config.store.data_dir.display()
        )
    })?;
    Ok(Arc::new(store))
}

/// Flip the returned receiver to `true` on Ctrl-C.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        let _ = tx.send(true);
    });
    rx
}

// ── Pipelines ───────────────────────────────────────────────────────

pub async fn run_processor(config: &Config) -> Result<()> {
    let backend = backend(config).await?;
    let store = open_store(config)?;
    let settings = ProcessorSettings::from_config(&config.processor)
        .context("invalid processor configuration")?;

    let tracker = PolicyTracker::load(store)
        .await
        .context("failed to build policy tracker")?;
    let esi = EsiClient::new(&config.esi).context("failed to build ESI client")?;
    let universe = CachedUniverse::new(esi, config.esi.cache_size);

    let processor = Processor::new(
        Arc::new(backend.inbound),
        Arc::new(backend.matched),
        Arc::new(backend.control),
        Arc::new(tracker),
        Arc::new(universe),
        settings,
    );
    processor.run(shutdown_signal()).await;
    Ok(())
}

pub async fn run_dispatcher(config: &Config) -> Result<()> {
    let backend = backend(config).await?;
    let store = open_store(config)?;
    let pop_order = config
        .processor
        .pop_order
        .parse::<PopOrder>()
        .context("invalid QUEUE_POP_ORDER")?;
    let factory = HttpNotifierFactory::from_config(&config.dispatch)
        .context("failed to build HTTP client")?;

    let service = DispatchService::new(
        Arc::new(backend.matched),
        Arc::new(backend.control),
        store.clone(),
        store,
        Arc::new(factory),
        DispatchSettings::from_config(&config.dispatch, pop_order),
    );
    service.run(shutdown_signal()).await;
    Ok(())
}

// ── Operator commands ───────────────────────────────────────────────

pub async fn set_paused(config: &Config, paused: bool) -> Result<()> {
    let backend = backend(config).await?;
    backend
        .control
        .set_flag(Flag::Stop, i64::from(paused))
        .await?;
    info!(flag = %Flag::Stop, paused, "stop flag updated");
    Ok(())
}

pub async fn request_reload(config: &Config) -> Result<()> {
    let backend = backend(config).await?;
    backend.control.set_flag(Flag::RestartTracker, 1).await?;
    info!(flag = %Flag::RestartTracker, "tracker rebuild requested");
    Ok(())
}

pub async fn status(config: &Config) -> Result<()> {
    let backend = backend(config).await?;
    for queue in [&backend.inbound, &backend.matched] {
        println!("{:<32} {}", queue.name(), queue.count().await?);
    }
    for flag in Flag::ALL {
        println!("{:<32} {}", flag, backend.control.flag(flag).await?);
    }
    Ok(())
}

pub async fn enqueue(config: &Config, file: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let killmail = Killmail::from_json(raw.as_bytes())
        .with_context(|| format!("{} is not a killmail payload", file.display()))?;

    let backend = backend(config).await?;
    backend.inbound.push(now_score(), raw.trim()).await?;
    info!(killmail_id = killmail.id, queue = PROCESSING_QUEUE, "killmail enqueued");
    Ok(())
}

pub async fn check_action(
    config: &Config,
    endpoint: Option<String>,
    action_id: Option<String>,
    message: &str,
) -> Result<()> {
    let mut action = match (endpoint, action_id) {
        (Some(endpoint), _) => Action::new("check", endpoint),
        (None, Some(id)) => open_store(config)?
            .get_action(&id)
            .with_context(|| format!("failed to load action {id}"))?,
        (None, None) => anyhow::bail!("either --endpoint or --action is required"),
    };
    action.validate().context("endpoint rejected")?;

    let factory = HttpNotifierFactory::from_config(&config.dispatch)?;
    send_test_message(&factory, &action, message)
        .await
        .with_context(|| format!("test message to {} failed", action.platform))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    use super::*;

    async fn serve() -> String {
        let app = Router::new()
            .route("/accepts", post(|| async { StatusCode::NO_CONTENT }))
            .route("/rejects", post(|| async { StatusCode::OK }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn check_action_delivers_test_message() {
        let base = serve().await;
        let config = Config::from_env();

        check_action(&config, Some(format!("{base}/accepts")), None, "ping")
            .await
            .unwrap();
        assert!(check_action(&config, Some(format!("{base}/rejects")), None, "ping")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn check_action_rejects_bad_endpoint() {
        let config = Config::from_env();
        assert!(check_action(&config, Some("ftp://example.com/x".to_string()), None, "ping")
            .await
            .is_err());
    }
}
