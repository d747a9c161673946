use crate::{BoxFuture, MigrationLedger};
use mongodb::{Client, Database};
use std::error::Error as StdError;

/// Any error a migration unit wants to report.
pub type AnyError = Box<dyn StdError + Send + Sync + 'static>;

/// What a migration unit returns.
pub type UnitResult = Result<(), AnyError>;

/// Everything a migration unit gets to work with.
#[derive(Debug, Clone)]
pub struct MigrationContext<'a> {
    /// The live client, for units that need more than the target database.
    pub client: &'a Client,
    /// The database the connection string points at.
    pub database: Database,
    /// The ledger the migration will be recorded in.
    pub ledger: &'a MigrationLedger,
    /// Caller-supplied parameters, passed through untouched.
    pub custom_options: Option<&'a serde_json::Value>,
}

/// A single version's transformation of the database. Only the up direction is executed.
///
/// Implementors are registered in a [MigrationRegistry](struct.MigrationRegistry.html) under the
/// version they migrate to.
pub trait MigrationUnit: Send + Sync {
    /// Apply the migration.
    fn up<'a>(&'a self, ctx: MigrationContext<'a>) -> BoxFuture<'a, UnitResult>;
}
