#![deny(rust_2018_idioms, unsafe_code)]

//! The MongoDB semantic-version migration connector.
//!
//! This crate keeps the ledger of applied migrations in a MongoDB collection and runs migration
//! units against a live connection. Which version to migrate to next is decided by an external
//! driver; the entry point for it is the [MigrationPlugin](trait.MigrationPlugin.html) trait,
//! implemented by [MongoDbMigrationConnector](struct.MongoDbMigrationConnector.html).

mod connection;
mod error;
mod migration_persistence;
mod migration_step_applier;
mod migration_unit;
mod migrations_directory;
mod params;
mod retry;
mod version;

pub use connection::Connection;
pub use error::{ErrorKind, MigrationError, MigrationResult};
pub use migration_persistence::{DEFAULT_MIGRATIONS_COLLECTION, Direction, MigrationLedger, MigrationRecord};
pub use migration_unit::{AnyError, MigrationContext, MigrationUnit, UnitResult};
pub use migrations_directory::{MigrationRegistry, MigrationsDirectory, ScriptMigration, UP_SCRIPT_FILE_NAME};
pub use params::{ConnectParams, MigrationParams, PluginOptions, UpParams};
pub use retry::RetryPolicy;
pub use version::{MigrationVersion, compare_versions, latest_version, sort_versions};

/// Alias for a pinned, boxed future, used by the traits.
pub type BoxFuture<'a, O> = std::pin::Pin<Box<dyn std::future::Future<Output = O> + Send + 'a>>;

/// The operations a migration driver relies on, in the order it calls them: `connect`, then
/// `has_migrations_table` (which binds the ledger), then the ledger queries and `up`.
pub trait MigrationPlugin: Send + Sync {
    /// Connect to the server, retrying with backoff. Replaces the current connection and unbinds
    /// the ledger.
    fn connect<'a>(&'a mut self, params: &'a ConnectParams) -> BoxFuture<'a, MigrationResult<()>>;

    /// Bind the ledger to `collection_name`, or to the configured default, and return whether
    /// that collection exists.
    fn has_migrations_table<'a>(&'a mut self, collection_name: Option<&'a str>) -> BoxFuture<'a, MigrationResult<bool>>;

    /// Collections are created on first write, so there is nothing to do.
    fn create_migrations_table(&self) -> BoxFuture<'_, MigrationResult<()>>;

    /// Whether the migration has been recorded. Drivers use it to skip applied migrations.
    fn has_migration<'a>(&'a self, params: &'a MigrationParams) -> BoxFuture<'a, MigrationResult<bool>>;

    /// The highest recorded version.
    fn get_latest_applied_migration(&self) -> BoxFuture<'_, MigrationResult<Option<String>>>;

    /// Record a migration as applied. Recording it again is a no-op.
    fn add_migration_to_migrations_table<'a>(&'a self, params: &'a MigrationParams)
    -> BoxFuture<'a, MigrationResult<()>>;

    /// Run the up migration for `params.version` and record it. Does not check whether the
    /// migration was applied before.
    fn up<'a>(&'a self, params: &'a UpParams) -> BoxFuture<'a, MigrationResult<()>>;
}

/// The top-level MongoDB migration connector.
#[derive(Debug, Default)]
pub struct MongoDbMigrationConnector {
    options: PluginOptions,
    registry: MigrationRegistry,
    connection: Option<Connection>,
    ledger: Option<MigrationLedger>,
}

impl MongoDbMigrationConnector {
    pub fn new(options: PluginOptions) -> Self {
        Self::with_registry(options, MigrationRegistry::default())
    }

    pub fn with_registry(options: PluginOptions, registry: MigrationRegistry) -> Self {
        MongoDbMigrationConnector {
            options,
            registry,
            connection: None,
            ledger: None,
        }
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MigrationRegistry {
        &mut self.registry
    }

    /// The current connection.
    pub fn connection(&self) -> MigrationResult<&Connection> {
        self.connection.as_ref().ok_or_else(MigrationError::not_connected)
    }

    /// The ledger bound by the last `has_migrations_table` call.
    pub fn ledger(&self) -> MigrationResult<&MigrationLedger> {
        self.ledger.as_ref().ok_or_else(MigrationError::ledger_not_bound)
    }
}

impl MigrationPlugin for MongoDbMigrationConnector {
    fn connect<'a>(&'a mut self, params: &'a ConnectParams) -> BoxFuture<'a, MigrationResult<()>> {
        Box::pin(async move {
            let connection = Connection::connect(&params.mongo_server, &params.retry).await?;

            self.connection = Some(connection);
            self.ledger = None;

            Ok(())
        })
    }

    fn has_migrations_table<'a>(&'a mut self, collection_name: Option<&'a str>) -> BoxFuture<'a, MigrationResult<bool>> {
        Box::pin(async move {
            let collection_name = collection_name.unwrap_or(&self.options.migrations_collection_name);
            let ledger = self.connection()?.ledger(collection_name);
            let exists = ledger.exists().await;

            self.ledger = Some(ledger);

            exists
        })
    }

    fn create_migrations_table(&self) -> BoxFuture<'_, MigrationResult<()>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn has_migration<'a>(&'a self, params: &'a MigrationParams) -> BoxFuture<'a, MigrationResult<bool>> {
        Box::pin(async move { self.ledger()?.has_migration(&params.version, params.direction).await })
    }

    fn get_latest_applied_migration(&self) -> BoxFuture<'_, MigrationResult<Option<String>>> {
        Box::pin(async move { self.ledger()?.latest_applied().await })
    }

    fn add_migration_to_migrations_table<'a>(
        &'a self,
        params: &'a MigrationParams,
    ) -> BoxFuture<'a, MigrationResult<()>> {
        Box::pin(async move {
            self.ledger()?.record(&params.version, params.direction).await?;

            Ok(())
        })
    }

    fn up<'a>(&'a self, params: &'a UpParams) -> BoxFuture<'a, MigrationResult<()>> {
        Box::pin(async move {
            let connection = self.connection()?;
            let ledger = self.ledger()?;

            migration_step_applier::apply_up(connection, ledger, &self.registry, params).await
        })
    }
}
