use ordercache_api::{PgOrderStore, PostgresConfig};

pub fn test_pg_store() -> PgOrderStore {
    let config = PostgresConfig::from_env();
    PgOrderStore::from_config(&config).expect("Failed to create PostgreSQL store")
}

/// A UID no other test run will use.
pub fn unique_uid(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}-{}", prefix, std::process::id(), nanos)
}
