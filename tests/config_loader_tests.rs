//! Configuration loader tests against layered `.env` files.

use std::fs;

use hubsync::config::{ConfigError, ConfigLoader};

#[test]
fn loads_layered_env_files_with_local_overrides() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".env"),
        "HUBSYNC_HUBSPOT_CLIENT_ID=base-id\n\
         HUBSYNC_HUBSPOT_CLIENT_SECRET=base-secret\n\
         HUBSYNC_RETRY_LIMIT=2\n",
    )
    .unwrap();
    fs::write(dir.path().join(".env.local"), "HUBSYNC_RETRY_LIMIT=3\n").unwrap();

    let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .unwrap();

    assert_eq!(config.hubspot_client_id, "base-id");
    assert_eq!(config.retry.limit, 3, ".env.local wins over .env");
    assert_eq!(config.retry.backoff_base_ms, 5000);
    assert_eq!(config.sync.batch_flush_threshold, 2000);
    assert!(!config.persistence_enabled);
}

#[test]
fn parses_sync_overrides() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".env"),
        "HUBSYNC_HUBSPOT_CLIENT_ID=id\n\
         HUBSYNC_HUBSPOT_CLIENT_SECRET=secret\n\
         HUBSYNC_SYNC_PAGE_LIMIT=25\n\
         HUBSYNC_SYNC_MAX_OFFSET_DEPTH=500\n\
         HUBSYNC_PERSISTENCE_ENABLED=true\n",
    )
    .unwrap();

    let config = ConfigLoader::with_base_dir(dir.path().to_path_buf())
        .load()
        .unwrap();

    assert_eq!(config.sync.page_limit, 25);
    assert_eq!(config.sync.max_offset_depth, 500);
    assert!(config.persistence_enabled);
}

#[test]
fn missing_oauth_identity_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let result = ConfigLoader::with_base_dir(dir.path().to_path_buf()).load();
    assert!(matches!(result, Err(ConfigError::MissingClientId)));
}
