//! Options accepted by the plugin operations. They deserialize from the camelCase JSON objects a
//! migration driver passes around.

use crate::{Direction, RetryPolicy, migration_persistence::DEFAULT_MIGRATIONS_COLLECTION};
use serde::Deserialize;
use std::path::PathBuf;

/// Connector-wide options, fixed at construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginOptions {
    #[serde(default = "default_migrations_collection_name")]
    pub migrations_collection_name: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        PluginOptions {
            migrations_collection_name: default_migrations_collection_name(),
        }
    }
}

fn default_migrations_collection_name() -> String {
    DEFAULT_MIGRATIONS_COLLECTION.to_owned()
}

/// Parameters of `connect`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub mongo_server: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ConnectParams {
    pub fn new(mongo_server: impl Into<String>) -> Self {
        ConnectParams {
            mongo_server: mongo_server.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Parameters of `has_migration` and `add_migration_to_migrations_table`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationParams {
    pub version: String,
    #[serde(default)]
    pub direction: Direction,
}

impl MigrationParams {
    pub fn up(version: impl Into<String>) -> Self {
        MigrationParams {
            version: version.into(),
            direction: Direction::Up,
        }
    }
}

/// Parameters of `up`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpParams {
    pub version: String,
    /// Where `<version>/index-up.json` scripts are looked up for versions without a registered
    /// unit.
    #[serde(default)]
    pub migrations_directory: Option<PathBuf>,
    #[serde(default)]
    pub custom_options: Option<serde_json::Value>,
}

impl UpParams {
    pub fn new(version: impl Into<String>) -> Self {
        UpParams {
            version: version.into(),
            migrations_directory: None,
            custom_options: None,
        }
    }

    pub fn migrations_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.migrations_directory = Some(path.into());
        self
    }

    pub fn custom_options(mut self, options: serde_json::Value) -> Self {
        self.custom_options = Some(options);
        self
    }
}
