use crate::{
    ErrorKind, MigrationError, MigrationResult,
    error::IntoMigrationResult,
    version::{self, MigrationVersion},
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, doc},
    error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure},
    options::IndexOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// The default name of the ledger collection.
pub const DEFAULT_MIGRATIONS_COLLECTION: &str = "migrations";

const UNIQUE_INDEX_NAME: &str = "version_1_direction_1";
const DUPLICATE_KEY_ERROR_CODE: i32 = 11000;

/// The direction a migration was applied in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger document: one applied migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub version: String,
    pub direction: Direction,
    /// Missing on records written by early versions of the ledger.
    #[serde(rename = "dateApplied", default, skip_serializing_if = "Option::is_none")]
    pub date_applied: Option<bson::DateTime>,
}

impl MigrationRecord {
    pub fn date_applied_utc(&self) -> Option<DateTime<Utc>> {
        self.date_applied.map(|date| date.to_chrono())
    }
}

/// The collection recording which migrations have been applied.
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    database: Database,
    collection: Collection<MigrationRecord>,
}

impl MigrationLedger {
    pub(crate) fn new(database: Database, collection_name: &str) -> Self {
        let collection = database.collection(collection_name);

        MigrationLedger { database, collection }
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// The underlying typed collection.
    pub fn collection(&self) -> &Collection<MigrationRecord> {
        &self.collection
    }

    /// Whether the ledger collection exists in the database catalog.
    #[tracing::instrument(skip(self), fields(collection = self.collection_name()))]
    pub async fn exists(&self) -> MigrationResult<bool> {
        let names = self
            .database
            .list_collection_names()
            .filter(doc! { "name": self.collection_name() })
            .await
            .into_migration_result(ErrorKind::Lookup, "Could not list the collections of the database")?;

        Ok(!names.is_empty())
    }

    /// Whether `(version, direction)` has been recorded.
    #[tracing::instrument(skip(self), fields(collection = self.collection_name()))]
    pub async fn has_migration(&self, version: &str, direction: Direction) -> MigrationResult<bool> {
        let filter = doc! { "version": version, "direction": direction.as_str() };
        debug!(%filter, "db.{}.findOne", self.collection_name());

        let record = self
            .collection
            .find_one(filter)
            .await
            .into_migration_result(ErrorKind::Lookup, "Could not query the migrations ledger")?;

        Ok(record.is_some())
    }

    /// All records, ordered by version.
    #[tracing::instrument(skip(self), fields(collection = self.collection_name()))]
    pub async fn list_applied(&self) -> MigrationResult<Vec<MigrationRecord>> {
        let records = self.load_all().await?;
        let mut keyed = Vec::with_capacity(records.len());

        for record in records {
            keyed.push((MigrationVersion::parse(&record.version)?, record));
        }

        keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(keyed.into_iter().map(|(_, record)| record).collect())
    }

    /// The highest recorded version, `None` for an empty ledger.
    #[tracing::instrument(skip(self), fields(collection = self.collection_name()))]
    pub async fn latest_applied(&self) -> MigrationResult<Option<String>> {
        let records = self.load_all().await?;

        version::latest_version(records.iter().map(|record| record.version.as_str()))
    }

    /// Record `(version, direction)` with the current time. Returns whether a new record was
    /// written: recording an existing pair leaves the ledger as it is.
    #[tracing::instrument(skip(self), fields(collection = self.collection_name()))]
    pub async fn record(&self, version: &str, direction: Direction) -> MigrationResult<bool> {
        self.ensure_unique_index().await;

        let filter = doc! { "version": version, "direction": direction.as_str() };
        let update = doc! { "$setOnInsert": { "dateApplied": bson::DateTime::now() } };
        debug!(%filter, %update, "db.{}.updateOne", self.collection_name());

        match self.collection.update_one(filter, update).upsert(true).await {
            Ok(result) if result.upserted_id.is_some() => Ok(true),
            Ok(_) => {
                debug!("Migration was already recorded");
                Ok(false)
            }
            Err(err) if is_duplicate_key_error(&err) => {
                debug!("Migration was recorded concurrently");
                Ok(false)
            }
            Err(err) => Err(MigrationError::from_source_with_context(
                ErrorKind::Persistence,
                err,
                format!("Could not record migration {version} ({direction})"),
            )),
        }
    }

    async fn load_all(&self) -> MigrationResult<Vec<MigrationRecord>> {
        debug!("db.{}.find({{}})", self.collection_name());

        let cursor = self
            .collection
            .find(doc! {})
            .await
            .into_migration_result(ErrorKind::Lookup, "Could not query the migrations ledger")?;

        cursor
            .try_collect()
            .await
            .into_migration_result(ErrorKind::Lookup, "Could not read the migrations ledger")
    }

    // Creating an index that already exists is a no-op on the server.
    async fn ensure_unique_index(&self) {
        let index = IndexModel::builder()
            .keys(doc! { "version": 1, "direction": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(UNIQUE_INDEX_NAME.to_owned())
                    .build(),
            )
            .build();

        if let Err(err) = self.collection.create_index(index).await {
            warn!(
                collection = self.collection_name(),
                error = %err,
                "Could not create the unique ledger index, duplicate records are not prevented"
            );
        }
    }
}

fn is_duplicate_key_error(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY_ERROR_CODE,
        MongoErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_ERROR_CODE,
        _ => false,
    }
}
