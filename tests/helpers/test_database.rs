// Test Database Helpers
//
// Connects to the MySQL test database and applies the bundled migrations.
// Store tests run every scenario against the in-memory stores, and against
// MySQL as well when TEST_DATABASE_URL points at a test database.

use sqlx::{mysql::MySqlPoolOptions, MySqlPool};

use tillpay::config::DatabaseConfig;
use tillpay::Stores;

/// Create a migrated MySQL pool for the test database
///
/// # Behavior
/// - Reads TEST_DATABASE_URL from environment; `None` when it is not set
/// - Panics with a clear message if the database is set but unreachable
pub async fn create_test_pool() -> Option<MySqlPool> {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => return None,
    };

    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .unwrap_or_else(|e| {
            panic!(
                "Failed to connect to test database at {}: {}\n\n\
                 Troubleshooting:\n\
                 1. Ensure MySQL is running\n\
                 2. Create the test database (e.g. tillpay_test)\n\
                 3. Verify TEST_DATABASE_URL is set correctly",
                database_url, e
            )
        });

    DatabaseConfig::migrate(&pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to migrate test database: {}", e));

    Some(pool)
}

/// Every store implementation available to this run, by name
pub async fn store_backends() -> Vec<(&'static str, Stores)> {
    let mut backends = vec![("in-memory", Stores::in_memory())];
    match create_test_pool().await {
        Some(pool) => backends.push(("mysql", Stores::mysql(pool))),
        None => eprintln!("TEST_DATABASE_URL not set; MySQL stores not exercised"),
    }
    backends
}

/// Id that cannot collide with rows left by earlier runs
pub fn unique_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
