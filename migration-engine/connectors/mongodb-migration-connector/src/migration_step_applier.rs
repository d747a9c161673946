use crate::{
    Connection, Direction, ErrorKind, MigrationContext, MigrationError, MigrationLedger, MigrationRegistry, MigrationResult,
    MigrationUnit, MigrationsDirectory, UpParams,
};
use std::sync::Arc;
use tracing::info;

/// Resolve the unit for `params.version`, run it, and record it in the ledger once it succeeds.
///
/// Nothing is recorded when resolution or the unit fails. Writes made by a failing unit are not
/// rolled back.
#[tracing::instrument(skip_all, fields(version = %params.version))]
pub(crate) async fn apply_up(
    connection: &Connection,
    ledger: &MigrationLedger,
    registry: &MigrationRegistry,
    params: &UpParams,
) -> MigrationResult<()> {
    let unit = resolve(registry, params)?;

    let ctx = MigrationContext {
        client: connection.client(),
        database: connection.database(),
        ledger,
        custom_options: params.custom_options.as_ref(),
    };

    unit.up(ctx).await.map_err(|err| {
        MigrationError::from_boxed_source(
            ErrorKind::Execution,
            err,
            format!("Migration {} failed", params.version),
        )
    })?;

    ledger.record(&params.version, Direction::Up).await?;
    info!("Migration applied");

    Ok(())
}

fn resolve(registry: &MigrationRegistry, params: &UpParams) -> MigrationResult<Arc<dyn MigrationUnit>> {
    if let Some(unit) = registry.get(&params.version) {
        return Ok(unit);
    }

    let Some(path) = &params.migrations_directory else {
        return Err(MigrationError::migration_not_found(&params.version, None));
    };

    let directory = MigrationsDirectory::new(path);

    match directory.read_up_script(&params.version)? {
        Some(script) => Ok(Arc::new(script)),
        None => Err(MigrationError::migration_not_found(
            &params.version,
            Some(&directory.up_script_path(&params.version)),
        )),
    }
}
