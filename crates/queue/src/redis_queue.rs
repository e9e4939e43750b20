//! Redis sorted-set queue and string-cell control plane.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::control::{ControlPlane, Flag};
use crate::error::QueueError;
use crate::queue::{PopOrder, ScoredQueue};

/// Open a reconnecting connection to `url`.
pub async fn connect(url: &str) -> Result<ConnectionManager, QueueError> {
    let client = redis::Client::open(url).map_err(|e| QueueError::Connection(e.to_string()))?;
    let manager = ConnectionManager::new(client).await?;
    info!("connected to redis");
    Ok(manager)
}

#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    key: String,
}

impl RedisQueue {
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl ScoredQueue for RedisQueue {
    fn name(&self) -> &str {
        &self.key
    }

    async fn count(&self) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let n: u64 = conn.zcount(&self.key, "-inf", "+inf").await?;
        Ok(n)
    }

    async fn pop(&self, limit: usize, order: PopOrder) -> Result<Vec<String>, QueueError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let count = isize::try_from(limit).unwrap_or(isize::MAX);
        let popped: Vec<(String, f64)> = match order {
            PopOrder::Newest => conn.zpopmax(&self.key, count).await?,
            PopOrder::Oldest => conn.zpopmin(&self.key, count).await?,
        };
        Ok(popped.into_iter().map(|(member, _)| member).collect())
    }

    async fn push(&self, score: f64, member: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.zadd(&self.key, member, score).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct RedisControl {
    conn: ConnectionManager,
}

impl RedisControl {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ControlPlane for RedisControl {
    async fn flag(&self, flag: Flag) -> Result<i64, QueueError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(flag.key()).await?;
        match value {
            Some(raw) => raw.trim().parse().map_err(|_| {
                QueueError::Parse(format!("flag {} holds non-integer '{}'", flag.key(), raw))
            }),
            None => {
                let _: bool = conn.set_nx(flag.key(), 0).await?;
                Ok(0)
            }
        }
    }

    async fn set_flag(&self, flag: Flag, value: i64) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(flag.key(), value).await?;
        Ok(())
    }
}
