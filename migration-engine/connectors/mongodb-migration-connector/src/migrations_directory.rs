//! Resolution of migration units: statically registered ones first, then command scripts found
//! in a migrations directory.
//!
//! A migrations directory contains one subdirectory per version, holding an `index-up.json` file
//! with a JSON array of MongoDB database commands in extended JSON:
//!
//! ```text
//! migrations/
//!     0.1.0/index-up.json
//!     0.2.0/index-up.json
//! ```

use crate::{
    BoxFuture, ErrorKind, MigrationContext, MigrationError, MigrationResult, MigrationUnit, UnitResult,
    version::{self, MigrationVersion},
};
use mongodb::bson::{Bson, Document};
use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

/// The file name of a migration script inside its version directory.
pub const UP_SCRIPT_FILE_NAME: &str = "index-up.json";

/// Migration units registered under the version they migrate to.
#[derive(Clone, Default)]
pub struct MigrationRegistry {
    units: BTreeMap<String, Arc<dyn MigrationUnit>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `unit` for `version`, replacing any unit registered before.
    pub fn register(&mut self, version: impl Into<String>, unit: impl MigrationUnit + 'static) -> &mut Self {
        self.units.insert(version.into(), Arc::new(unit));
        self
    }

    /// Builder-style [register](#method.register).
    pub fn with(mut self, version: impl Into<String>, unit: impl MigrationUnit + 'static) -> Self {
        self.register(version, unit);
        self
    }

    pub fn get(&self, version: &str) -> Option<Arc<dyn MigrationUnit>> {
        self.units.get(version).cloned()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The registered versions, in version order.
    pub fn versions(&self) -> MigrationResult<Vec<String>> {
        Ok(version::sort_versions(self.units.keys())?
            .into_iter()
            .map(MigrationVersion::into_string)
            .collect())
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("versions", &self.units.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A directory of migration scripts.
///
/// Reads go through blocking `std::fs` calls, also when resolving a unit inside `up`. Script
/// files are expected to be small, and a migration run reads at most one of them.
#[derive(Debug, Clone)]
pub struct MigrationsDirectory {
    path: PathBuf,
}

impl MigrationsDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MigrationsDirectory { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the script for `version` is expected.
    pub fn up_script_path(&self, version: &str) -> PathBuf {
        self.path.join(version).join(UP_SCRIPT_FILE_NAME)
    }

    /// The versions that have a script, in version order. Subdirectories without a script, and
    /// entries whose name is not a version, are ignored.
    pub fn list_versions(&self) -> MigrationResult<Vec<String>> {
        let entries = fs::read_dir(&self.path).map_err(|err| {
            MigrationError::from_source_with_context(
                ErrorKind::Resolution,
                err,
                format!("Could not read the migrations directory at {}", self.path.display()),
            )
        })?;

        let mut versions = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|err| {
                MigrationError::from_source(ErrorKind::Resolution, err, "Could not read the migrations directory")
            })?;

            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };

            if !entry.path().join(UP_SCRIPT_FILE_NAME).is_file() {
                continue;
            }

            match MigrationVersion::parse(&name) {
                Ok(version) => versions.push(version),
                Err(_) => debug!(entry = %name, "Skipping non-version entry in the migrations directory"),
            }
        }

        versions.sort();

        Ok(versions.into_iter().map(MigrationVersion::into_string).collect())
    }

    /// Read the script for `version`. `None` when there is no script file.
    pub fn read_up_script(&self, version: &str) -> MigrationResult<Option<ScriptMigration>> {
        if !is_single_path_segment(version) {
            return Err(MigrationError::new(
                ErrorKind::Resolution,
                format!("`{version}` cannot be used as a migration directory name"),
            ));
        }

        let path = self.up_script_path(version);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(MigrationError::from_source_with_context(
                    ErrorKind::Resolution,
                    err,
                    format!("Could not read the migration script at {}", path.display()),
                ));
            }
        };

        ScriptMigration::parse(path, &contents).map(Some)
    }
}

fn is_single_path_segment(version: &str) -> bool {
    let mut components = Path::new(version).components();

    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// A migration made of database commands, run in order with `runCommand`.
#[derive(Debug, Clone)]
pub struct ScriptMigration {
    path: PathBuf,
    commands: Vec<Document>,
}

impl ScriptMigration {
    pub fn parse(path: PathBuf, contents: &str) -> MigrationResult<Self> {
        let malformed = |reason: String| {
            MigrationError::new(
                ErrorKind::Resolution,
                format!("Malformed migration script at {}: {reason}", path.display()),
            )
        };

        let value: serde_json::Value = serde_json::from_str(contents).map_err(|err| malformed(err.to_string()))?;

        let items = match Bson::try_from(value) {
            Ok(Bson::Array(items)) => items,
            Ok(_) => return Err(malformed("expected an array of commands".to_owned())),
            Err(err) => return Err(malformed(err.to_string())),
        };

        let commands = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Bson::Document(command) if !command.is_empty() => Ok(command),
                _ => Err(malformed(format!("command {idx} is not a non-empty document"))),
            })
            .collect::<MigrationResult<Vec<_>>>()?;

        Ok(ScriptMigration { path, commands })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commands(&self) -> &[Document] {
        &self.commands
    }
}

impl MigrationUnit for ScriptMigration {
    fn up<'a>(&'a self, ctx: MigrationContext<'a>) -> BoxFuture<'a, UnitResult> {
        Box::pin(async move {
            for (step, command) in self.commands.iter().enumerate() {
                debug!(step, %command, "db.runCommand");
                ctx.database.run_command(command.clone()).await?;
            }

            Ok(())
        })
    }
}
