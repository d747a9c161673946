//! The migration connector MigrationError type.

use std::{
    error::Error as StdError,
    fmt::{Debug, Display, Write},
    path::Path,
    sync::Arc,
};
use tracing_error::SpanTrace;

/// The general error reporting type of the connector.
#[derive(Clone)]
pub struct MigrationError(Box<MigrationErrorImpl>);

/// Shorthand for a [Result](https://doc.rust-lang.org/std/result/enum.Result.html) where the error
/// variant is a [MigrationError](struct.MigrationError.html).
pub type MigrationResult<T> = Result<T, MigrationError>;

/// What went wrong, independently of the underlying cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// The server could not be reached, even after retrying.
    #[error("Could not connect to the database server")]
    Connection,
    /// The connection string cannot be used. Never retried.
    #[error("Invalid connection string")]
    InvalidConnectionString,
    /// Reading the migrations ledger failed.
    #[error("Failed to query the migrations ledger")]
    Lookup,
    /// No migration unit could be found or loaded for the requested version.
    #[error("Could not resolve the migration")]
    Resolution,
    /// The migration unit itself returned an error.
    #[error("Migration failed")]
    Execution,
    /// The migration ran, but could not be recorded in the ledger.
    #[error("Failed to record the migration in the ledger")]
    Persistence,
    /// A string that is not a semantic version.
    #[error("Invalid migration version")]
    InvalidVersion,
    /// `connect` was not called, or did not succeed.
    #[error("Not connected to a database")]
    NotConnected,
    /// `has_migrations_table` was not called, so no ledger collection is bound.
    #[error("The migrations ledger is not bound to a collection")]
    LedgerNotBound,
}

#[derive(Debug, Clone)]
struct MigrationErrorImpl {
    kind: ErrorKind,
    /// Additional context.
    message: Option<Box<str>>,
    /// The source of the error.
    source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
    /// See the tracing-error docs.
    context: SpanTrace,
}

impl Debug for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)?;
        f.write_char('\n')?;
        Display::fmt(self, f)
    }
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0.kind, f)?;

        if let Some(message) = &self.0.message {
            f.write_str(": ")?;
            f.write_str(message)?;
        }

        if let Some(source) = &self.0.source {
            f.write_char('\n')?;
            Display::fmt(source.as_ref(), f)?;
        }

        f.write_char('\n')?;
        Display::fmt(&self.0.context, f)
    }
}

impl StdError for MigrationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0
            .source
            .as_ref()
            .map(|err| -> &(dyn StdError + 'static) { err.as_ref() })
    }
}

impl MigrationError {
    fn build(
        kind: ErrorKind,
        message: Option<Box<str>>,
        source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
    ) -> Self {
        MigrationError(Box::new(MigrationErrorImpl {
            kind,
            message,
            source,
            context: SpanTrace::capture(),
        }))
    }

    /// Build an error from just a kind and a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::build(kind, Some(message.into().into_boxed_str()), None)
    }

    /// Build an error from a source error, with some additional context.
    pub fn from_source<E: StdError + Send + Sync + 'static>(kind: ErrorKind, source: E, context: &'static str) -> Self {
        Self::build(kind, Some(context.into()), Some(Arc::new(source)))
    }

    /// Build an error from a source error, with some additional context.
    pub fn from_source_with_context<E: StdError + Send + Sync + 'static>(
        kind: ErrorKind,
        source: E,
        context: String,
    ) -> Self {
        Self::build(kind, Some(context.into_boxed_str()), Some(Arc::new(source)))
    }

    /// Build an error from an already boxed source, as returned by migration units.
    pub fn from_boxed_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync + 'static>, context: String) -> Self {
        Self::build(kind, Some(context.into_boxed_str()), Some(Arc::from(source)))
    }

    /// What kind of failure this is.
    pub fn kind(&self) -> ErrorKind {
        self.0.kind
    }

    /// The additional context message, if any.
    pub fn message(&self) -> Option<&str> {
        self.0.message.as_deref()
    }

    /// A reference to the tracing-error context.
    pub fn context(&self) -> &SpanTrace {
        &self.0.context
    }

    /// Try to downcast the source to a specific type.
    pub fn source_as<T: StdError + 'static>(&self) -> Option<&T> {
        let source = self.0.source.as_ref()?;
        source.downcast_ref()
    }

    pub(crate) fn not_connected() -> Self {
        Self::new(ErrorKind::NotConnected, "call connect() first")
    }

    pub(crate) fn ledger_not_bound() -> Self {
        Self::new(ErrorKind::LedgerNotBound, "call has_migrations_table() first")
    }

    pub(crate) fn invalid_version(version: &str) -> Self {
        Self::new(ErrorKind::InvalidVersion, format!("`{version}` is not a semantic version"))
    }

    pub(crate) fn invalid_connection_string<E: StdError + Send + Sync + 'static>(source: E) -> Self {
        Self::from_source(ErrorKind::InvalidConnectionString, source, "Could not parse the MongoDB connection string")
    }

    pub(crate) fn migration_not_found(version: &str, expected_path: Option<&Path>) -> Self {
        let message = match expected_path {
            Some(path) => format!(
                "No migration registered for version {version}, and no migration script at {}",
                path.display()
            ),
            None => format!("No migration registered for version {version}, and no migrations directory given"),
        };

        Self::new(ErrorKind::Resolution, message)
    }
}

/// Conversion of MongoDB driver results into connector results.
pub(crate) trait IntoMigrationResult<T> {
    fn into_migration_result(self, kind: ErrorKind, context: &'static str) -> MigrationResult<T>;
}

impl<T> IntoMigrationResult<T> for mongodb::error::Result<T> {
    fn into_migration_result(self, kind: ErrorKind, context: &'static str) -> MigrationResult<T> {
        self.map_err(|err| MigrationError::from_source(kind, err, context))
    }
}
