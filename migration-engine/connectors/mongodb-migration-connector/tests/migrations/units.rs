use mongodb::bson::{Document, doc};
use mongodb_migration_connector::{BoxFuture, MigrationContext, MigrationRegistry, MigrationUnit, UnitResult};

/// 0.1.0: adds a customer, named after the `customName` custom option when given.
pub(crate) struct CreateCustomer;

impl MigrationUnit for CreateCustomer {
    fn up<'a>(&'a self, ctx: MigrationContext<'a>) -> BoxFuture<'a, UnitResult> {
        Box::pin(async move {
            let name = ctx
                .custom_options
                .and_then(|options| options.get("customName"))
                .and_then(|name| name.as_str())
                .unwrap_or("PDMLab");

            ctx.database
                .collection::<Document>("customers")
                .insert_one(doc! { "name": name })
                .await?;

            Ok(())
        })
    }
}

/// 0.2.0: adds a country.
pub(crate) struct CreateCountry;

impl MigrationUnit for CreateCountry {
    fn up<'a>(&'a self, ctx: MigrationContext<'a>) -> BoxFuture<'a, UnitResult> {
        Box::pin(async move {
            ctx.database
                .collection::<Document>("countries")
                .insert_one(doc! { "name": "Germany" })
                .await?;

            Ok(())
        })
    }
}

/// Writes a document, then fails.
pub(crate) struct HalfwayFailure;

impl MigrationUnit for HalfwayFailure {
    fn up<'a>(&'a self, ctx: MigrationContext<'a>) -> BoxFuture<'a, UnitResult> {
        Box::pin(async move {
            ctx.database
                .collection::<Document>("customers")
                .insert_one(doc! { "name": "Halfway" })
                .await?;

            Err("the second step of the migration blew up".into())
        })
    }
}

pub(crate) fn customers_and_countries() -> MigrationRegistry {
    MigrationRegistry::new()
        .with("0.1.0", CreateCustomer)
        .with("0.2.0", CreateCountry)
}
