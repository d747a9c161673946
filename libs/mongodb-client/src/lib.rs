use mongodb::{
    Client,
    bson::doc,
    error::Result,
    options::{ClientOptions, DriverInfo},
};

/// The database used when the connection string does not name one.
pub const DEFAULT_DATABASE: &str = "test";

/// A wrapper to create a new MongoDB client. Creating the client does not talk to the server;
/// use [ping](fn.ping.html) for that.
pub async fn create(connection_string: impl AsRef<str>) -> Result<Client> {
    let mut options = ClientOptions::parse(connection_string.as_ref()).await?;

    options.driver_info = Some(DriverInfo::builder().name("mongodb-semver-migrations").build());

    Client::with_options(options)
}

/// The database named in the connection string the client was created with.
pub fn database_name(client: &Client) -> String {
    client
        .default_database()
        .map(|database| database.name().to_owned())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_owned())
}

/// Force server selection by running `ping` against the database.
pub async fn ping(client: &Client, db_name: &str) -> Result<()> {
    client.database(db_name).run_command(doc! { "ping": 1 }).await?;

    Ok(())
}
