//! Configuration for the Coffer session store.
//!
//! Provides TOML-based configuration with:
//! - `[session]` limits and timeouts for the store
//! - `[storage]` selection of the backing store for evicted sessions
//! - `[logging]` filter and format for the tracing subscriber
//!
//! [`build_store`] turns a loaded configuration into a ready
//! [`SessionStore`].

pub mod discovery;
pub mod error;
pub mod logging;
pub mod types;

use coffer_session::SessionStore;

pub use discovery::{
    CONFIG_ENV, LoadedConfig, load_config, load_config_file, load_config_with_options, save_config,
};
pub use error::{ConfigError, Result};
pub use logging::{env_filter, init_logging};
pub use types::*;

/// Validate `config` and build a store with its settings and backing store.
///
/// Listeners and custom codecs are added by the caller afterwards through
/// [`SessionStore::listeners`] and [`SessionStore::codecs`].
pub fn build_store(config: &CofferConfig) -> Result<SessionStore> {
    config.validate()?;
    let backing = config.storage.open_backing_store()?;

    tracing::debug!(
        backend = ?config.storage.backend,
        max_in_memory = config.session.max_in_memory,
        "Building session store"
    );

    Ok(SessionStore::new(config.session.store_config()).with_backing_store(backing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_session::AttributeValue;

    #[test]
    fn test_build_store_from_file_config() {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            r#"
[session]
max_in_memory = 1
enable_cleanup_task = false

[storage]
backend = "file"
path = "{}"
"#,
            dir.path().join("sessions").display().to_string().replace('\\', "/")
        );
        let config = CofferConfig::from_toml_str(&toml).unwrap();

        let store = build_store(&config).unwrap();
        assert_eq!(store.config().max_in_memory, 1);
        assert!(!store.config().enable_cleanup_task);

        let (first, _) = store.resolve_or_create(None).unwrap();
        store
            .put_attribute(&first, "n", AttributeValue::new(1_i32))
            .unwrap();
        store.resolve_or_create(None).unwrap();

        // Capacity 1 pushed the first session to disk.
        assert!(!store.is_resident(&first));
        let entries = std::fs::read_dir(dir.path().join("sessions")).unwrap().count();
        assert_eq!(entries, 1);

        let value = store.get_attribute(&first, "n").unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i32>(), Some(&1));
    }

    #[test]
    fn test_build_store_rejects_invalid_config() {
        let mut config = CofferConfig::default();
        config.session.max_in_memory = 0;
        assert!(matches!(build_store(&config), Err(ConfigError::Invalid { .. })));
    }
}
