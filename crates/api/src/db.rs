//! Database startup.

use std::future::Future;
use std::time::Duration;

use entity_store::{PostgresEntityStore, StoreError};

/// Pause between connection attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Runs `op` until it succeeds or `attempts` tries have failed, sleeping
/// `delay` in between. Returns the last error.
pub async fn retry<T, E, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                tracing::warn!(attempt, error = %err, "database is unavailable, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Connects to PostgreSQL, waiting for the server to come up.
pub async fn wait_for_database(
    url: &str,
    max_connections: u32,
    attempts: u32,
) -> Result<PostgresEntityStore, StoreError> {
    tracing::info!(attempts, "waiting for database");
    retry(attempts, RETRY_DELAY, || {
        PostgresEntityStore::connect(url, max_connections)
    })
    .await
}
