//! The shared MySQL pool handle.

use crate::dates::{self, Temporal};
use crate::error::PoolError;
use apidb_common_config::{ConnectionConfig, PoolSettings};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{ColumnIndex, Executor, MySql};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A pooled connection. Dropping it returns the connection to the pool.
pub type ApiConnection = PoolConnection<MySql>;

/// Shared handle to the API database pool.
///
/// Cheap to clone; every clone refers to the same set of connections.
#[derive(Debug, Clone)]
pub struct ApiPool {
    pool: MySqlPool,
    settings: PoolSettings,
    missing_vars: Arc<[&'static str]>,
    queue: Arc<WaitQueue>,
    max_connections: u32,
}

impl ApiPool {
    /// Build the pool without opening any connection.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(config), fields(host = config.host().unwrap_or("localhost")))]
    pub fn initialize(config: &ConnectionConfig) -> Self {
        let settings = config.pool().clone();

        let mut options = MySqlPoolOptions::new();
        // 0 means "no explicit limit"; sqlx rejects a zero-capacity pool
        if let Some(limit) = settings.connection_limit.filter(|&n| n > 0) {
            options = options.max_connections(limit);
        }
        if let Some(timeout) = settings.acquire_timeout {
            options = options.acquire_timeout(timeout);
        }
        let max_connections = options.get_max_connections();

        let pool = options.connect_lazy_with(Self::build_connect_options(config));

        info!(max_connections, queue_limit = settings.queue_limit, "API database pool created");

        Self {
            pool,
            queue: Arc::new(WaitQueue::new(settings.queue_limit)),
            settings,
            missing_vars: config.missing_vars().into(),
            max_connections,
        }
    }

    fn build_connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new();

        if let Some(host) = config.host() {
            options = options.host(host);
        }
        if let Some(port) = config.port() {
            options = options.port(port);
        }
        if let Some(user) = config.user() {
            options = options.username(user);
        }
        if let Some(password) = config.password() {
            options = options.password(password.expose());
        }
        if let Some(database) = config.database() {
            options = options.database(database);
        }

        options
    }

    /// Check out a connection.
    ///
    /// When every connection is busy and the pool is at its limit, the call
    /// either fails with [`PoolError::NoConnectionAvailable`]
    /// (`wait_for_connections = false`) or joins the wait queue, failing with
    /// [`PoolError::QueueLimitReached`] if the queue is full.
    pub async fn acquire(&self) -> Result<ApiConnection, PoolError> {
        if let Some(conn) = self.pool.try_acquire() {
            return Ok(conn);
        }

        if self.pool.size() < self.max_connections {
            return Ok(self.pool.acquire().await?);
        }

        if !self.settings.wait_for_connections {
            return Err(PoolError::NoConnectionAvailable);
        }

        let _slot = self.queue.enter()?;
        debug!(pending = self.queue.pending(), "waiting for a free connection");
        Ok(self.pool.acquire().await?)
    }

    /// Return a connection to the pool.
    pub async fn release(&self, conn: ApiConnection) {
        drop(conn);
        tokio::task::yield_now().await;
    }

    /// Run a statement on a pooled connection and collect the rows.
    ///
    /// Uses the text protocol, so temporal columns keep the server's exact
    /// rendering for [`ApiPool::temporal`].
    pub async fn query(&self, sql: &str) -> Result<Vec<MySqlRow>, PoolError> {
        let mut conn = self.acquire().await?;
        let rows = (&mut *conn).fetch_all(sql).await?;
        self.release(conn).await;
        Ok(rows)
    }

    /// Run a statement on a pooled connection, returning rows affected.
    pub async fn execute(&self, sql: &str) -> Result<u64, PoolError> {
        let mut conn = self.acquire().await?;
        let result = (&mut *conn).execute(sql).await?;
        self.release(conn).await;
        Ok(result.rows_affected())
    }

    /// Decode a DATE/DATETIME/TIMESTAMP/TIME column honoring `date_strings`.
    pub fn temporal<I>(&self, row: &MySqlRow, index: I) -> Result<Option<Temporal>, sqlx::Error>
    where
        I: ColumnIndex<MySqlRow> + Copy,
    {
        dates::decode(row, index, self.settings.date_strings)
    }

    /// The underlying sqlx pool.
    pub fn inner(&self) -> &MySqlPool {
        &self.pool
    }

    /// Pool behavior the handle was built with.
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Required variables that were absent when the pool was built.
    pub fn missing_vars(&self) -> &[&'static str] {
        &self.missing_vars
    }

    /// Snapshot of connection counts.
    pub fn stats(&self) -> PoolStats {
        let size = self.pool.size();
        let idle = self.pool.num_idle();

        PoolStats {
            size,
            idle,
            active: (size as usize).saturating_sub(idle),
            pending: self.queue.pending(),
            max_connections: self.max_connections,
        }
    }

    /// Close every connection and reject further acquires.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        info!("Closing API database pool");
        self.pool.close().await;
    }

    /// Whether [`ApiPool::close`] has been called on any clone.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Connection counts at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Open connections, idle or checked out.
    pub size: u32,
    /// Open connections waiting in the pool.
    pub idle: usize,
    /// Connections currently checked out.
    pub active: usize,
    /// Acquires queued behind a full pool.
    pub pending: usize,
    /// Upper bound on open connections.
    pub max_connections: u32,
}

/// Counts acquires waiting on a full pool.
#[derive(Debug)]
struct WaitQueue {
    waiting: AtomicUsize,
    limit: usize,
}

impl WaitQueue {
    fn new(limit: usize) -> Self {
        Self {
            waiting: AtomicUsize::new(0),
            limit,
        }
    }

    fn enter(&self) -> Result<QueueSlot<'_>, PoolError> {
        let limit = self.limit;
        self.waiting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (limit == 0 || n < limit).then_some(n + 1)
            })
            .map_err(|_| PoolError::QueueLimitReached { limit })?;

        Ok(QueueSlot { queue: self })
    }

    fn pending(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct QueueSlot<'a> {
    queue: &'a WaitQueue,
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.queue.waiting.fetch_sub(1, Ordering::AcqRel);
    }
}
