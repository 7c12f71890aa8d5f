//! Property-based tests for SyncSettings persistence.
//!
//! Any valid settings value written to disk by the engine must load back
//! unchanged.

use bookmark_sync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use bookmark_sync::types::settings::{
    DeleteRollback, LoggingSettings, ReconcileSettings, RetrySettings, StorageSettings,
    SyncSettings,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn arb_delete_rollback() -> impl Strategy<Value = DeleteRollback> {
    prop_oneof![Just(DeleteRollback::Snapshot), Just(DeleteRollback::ReinsertEntry)]
}

fn arb_retry() -> impl Strategy<Value = RetrySettings> {
    (1u32..10, 0u64..5_000, 0u64..60_000, 1u32..5).prop_map(
        |(max_attempts, initial_backoff_ms, max_backoff_ms, multiplier)| RetrySettings {
            max_attempts,
            initial_backoff_ms,
            max_backoff_ms,
            multiplier,
        },
    )
}

fn arb_settings() -> impl Strategy<Value = SyncSettings> {
    (
        proptest::option::of("/[a-z]{1,10}/[a-z]{1,10}\\.db"),
        arb_retry(),
        arb_delete_rollback(),
        1usize..4096,
        "[a-z_]{1,12}=(trace|debug|info|warn|error)",
    )
        .prop_map(|(database_path, retry, delete_rollback, change_buffer, filter)| SyncSettings {
            storage: StorageSettings { database_path },
            sync: ReconcileSettings {
                retry,
                delete_rollback,
                change_buffer,
            },
            logging: LoggingSettings { filter },
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn settings_survive_save_and_load(settings in arb_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        let mut engine = SettingsEngine::new(Some(path.clone()));
        let loaded = engine.load().unwrap();
        prop_assert_eq!(&loaded, &settings);

        engine.save().unwrap();
        let mut again = SettingsEngine::new(Some(path));
        prop_assert_eq!(again.load().unwrap(), settings);
    }
}
