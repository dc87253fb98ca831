use apidb_common_config::vars;
use apidb_common_log::{LogConfig, LogFormat};
use apidb_database::{
    dates, init, init_from_env, ConnectionConfig, PoolError, ProbeError, ProbeOutcome, Temporal,
};
use chrono::NaiveDate;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

static ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let config = LogConfig {
            format: LogFormat::Compact,
            ansi: false,
            ..LogConfig::default()
        };
        tracing::subscriber::set_default(apidb_common_log::subscriber(&config, move || {
            writer.clone()
        }))
    }
}

fn unreachable_config() -> ConnectionConfig {
    ConnectionConfig::builder()
        .host("127.0.0.1")
        .port(1)
        .user("api")
        .password("not-the-password")
        .database("api")
        .acquire_timeout(Duration::from_millis(250))
        .build()
}

#[tokio::test]
async fn test_unreachable_database_logs_error_and_keeps_pool() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let (pool, outcome) = init(&unreachable_config()).wait().await;

    assert!(matches!(outcome, ProbeOutcome::Failed(ProbeError::Connect(_))));
    let output = logs.contents();
    assert!(output.contains("Error connecting to MySQL"), "logs: {}", output);
    assert!(!output.contains("not-the-password"));

    // The pool is still handed out and fails per query
    assert!(!pool.is_closed());
    assert!(matches!(pool.query("SELECT 1").await, Err(PoolError::Database(_))));
}

#[tokio::test]
async fn test_missing_environment_logs_error_without_crashing() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    // The config is read synchronously, so the lock is released before awaiting
    let startup = {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let saved: Vec<_> = vars::REQUIRED
            .iter()
            .map(|var| (*var, std::env::var(var).ok()))
            .collect();
        for var in vars::REQUIRED {
            std::env::remove_var(var);
        }

        let startup = init_from_env();

        for (var, value) in saved {
            if let Some(value) = value {
                std::env::set_var(var, value);
            }
        }
        startup
    };

    let (pool, outcome) = startup.wait().await;

    match outcome {
        ProbeOutcome::Failed(ProbeError::MissingVariables(missing)) => {
            assert_eq!(missing, vars::REQUIRED.to_vec());
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(logs.contents().contains("API_DB_HOST"));
    assert!(!pool.is_closed());
}

/// Connection settings for a real server, taken from `API_DB_*` when
/// `APIDB_TEST_DATABASE` is set.
fn live_config() -> Option<ConnectionConfig> {
    std::env::var("APIDB_TEST_DATABASE").ok()?;
    let config = {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        ConnectionConfig::from_env()
    };
    config.require_complete().ok()?;
    Some(config)
}

fn live_builder(base: &ConnectionConfig) -> apidb_common_config::ConnectionConfigBuilder {
    ConnectionConfig::builder()
        .host(base.host().unwrap_or_default())
        .port(base.port().unwrap_or(3306))
        .user(base.user().unwrap_or_default())
        .password(base.password().map(|p| p.expose().clone()).unwrap_or_default())
        .database(base.database().unwrap_or_default())
}

async fn wait_for_idle(pool: &apidb_database::ApiPool, idle: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while pool.stats().idle != idle || pool.stats().active != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connections were not returned to the pool");
}

#[tokio::test]
async fn test_live_startup_and_select_one() {
    let Some(config) = live_config() else {
        return;
    };

    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let pool = init(&config).strict().await.unwrap();
    assert!(logs.contents().contains("API MySQL connected successfully!"));

    let rows = pool.query("SELECT 1").await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_live_acquire_release_does_not_leak() {
    let Some(config) = live_config() else {
        return;
    };
    let pool = init(&config).strict().await.unwrap();
    wait_for_idle(&pool, pool.stats().size as usize).await;
    let baseline = pool.stats();

    for _ in 0..2 {
        let conn = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().active, 1);
        pool.release(conn).await;
        wait_for_idle(&pool, baseline.idle.max(1)).await;
        assert_eq!(pool.stats().active, 0);
    }
}

#[tokio::test]
async fn test_live_no_wait_fails_when_exhausted() {
    let Some(base) = live_config() else {
        return;
    };
    let config = live_builder(&base)
        .connection_limit(1)
        .wait_for_connections(false)
        .build();
    let pool = init(&config).strict().await.unwrap();

    let held = pool.acquire().await.unwrap();
    assert!(matches!(pool.acquire().await, Err(PoolError::NoConnectionAvailable)));

    pool.release(held).await;
    wait_for_idle(&pool, 1).await;
    assert!(pool.acquire().await.is_ok());
}

#[tokio::test]
async fn test_live_queue_limit() {
    let Some(base) = live_config() else {
        return;
    };
    let config = live_builder(&base).connection_limit(1).queue_limit(1).build();
    let pool = init(&config).strict().await.unwrap();

    let held = pool.acquire().await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(drop) })
    };
    tokio::time::timeout(Duration::from_secs(5), async {
        while pool.stats().pending == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert!(matches!(
        pool.acquire().await,
        Err(PoolError::QueueLimitReached { limit: 1 })
    ));

    pool.release(held).await;
    waiter.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_live_temporal_columns_keep_mysql_text() {
    let Some(base) = live_config() else {
        return;
    };
    // One connection, so the session settings and temporary table stay visible
    let config = live_builder(&base).connection_limit(1).build();
    let pool = init(&config).strict().await.unwrap();

    pool.execute("SET SESSION sql_mode = ''").await.unwrap();
    pool.execute(
        "CREATE TEMPORARY TABLE apidb_dates (d DATE, dt DATETIME(6), t TIME, zd DATE, zdt DATETIME)",
    )
    .await
    .unwrap();
    pool.execute(
        "INSERT INTO apidb_dates VALUES \
         ('2024-03-01', '2024-03-01 08:15:00.250000', '-838:59:59', '0000-00-00', '0000-00-00 00:00:00')",
    )
    .await
    .unwrap();

    let rows = pool.query("SELECT d, dt, t, zd, zdt FROM apidb_dates").await.unwrap();
    let row = &rows[0];

    let text = |column: &str| match pool.temporal(row, column).unwrap() {
        Some(Temporal::Text(s)) => s,
        other => panic!("{} decoded as {:?}", column, other),
    };
    assert_eq!(text("d"), "2024-03-01");
    assert_eq!(text("dt"), "2024-03-01 08:15:00.250000");
    assert_eq!(text("t"), "-838:59:59");
    assert_eq!(text("zd"), "0000-00-00");
    assert_eq!(text("zdt"), "0000-00-00 00:00:00");
    assert_eq!(dates::as_string(row, "t").unwrap().as_deref(), Some("-838:59:59"));

    // Parsed mode handles real dates and rejects values chrono cannot hold
    assert_eq!(
        dates::decode(row, "d", false).unwrap(),
        Some(Temporal::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
    );
    assert!(dates::decode(row, "t", false).is_err());
    assert!(dates::decode(row, "zd", false).is_err());

    // Prepared statements arrive in the binary layout
    let row = sqlx::query("SELECT dt, t FROM apidb_dates")
        .fetch_one(pool.inner())
        .await
        .unwrap();
    assert_eq!(
        dates::as_string(&row, "dt").unwrap().as_deref(),
        Some("2024-03-01 08:15:00.250000")
    );
    assert_eq!(dates::as_string(&row, "t").unwrap().as_deref(), Some("-838:59:59"));
}
