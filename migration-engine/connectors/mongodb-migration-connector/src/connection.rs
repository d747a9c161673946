use crate::{
    ErrorKind, MigrationError, MigrationLedger, MigrationResult,
    retry::{self, RetryPolicy},
};
use mongodb::{
    Client, Database,
    error::{Error as MongoError, ErrorKind as MongoErrorKind},
};
use tracing::{debug, info};

/// A verified connection to a MongoDB server. Created by `connect`, shared by every later
/// operation. The driver pools the underlying sockets.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    db_name: String,
}

impl Connection {
    /// Build a client for `connection_str` and check that the server answers, retrying with
    /// backoff according to `policy`. Invalid connection strings fail right away.
    #[tracing::instrument(skip(connection_str), fields(retries = policy.retries))]
    pub async fn connect(connection_str: &str, policy: &RetryPolicy) -> MigrationResult<Connection> {
        if connection_str.trim().is_empty() {
            return Err(MigrationError::new(
                ErrorKind::InvalidConnectionString,
                "The MongoDB connection string is empty",
            ));
        }

        let result = retry::retry_with_backoff(policy, is_transient, |attempt| async move {
            debug!(attempt, "Connecting to MongoDB");

            let client = mongodb_client::create(connection_str).await?;
            let db_name = mongodb_client::database_name(&client);
            mongodb_client::ping(&client, &db_name).await?;

            Ok::<_, MongoError>((client, db_name))
        })
        .await;

        match result {
            Ok((client, db_name)) => {
                info!(database = %db_name, "Connected to MongoDB");
                Ok(Connection { client, db_name })
            }
            Err(err) if !is_transient(&err) => Err(MigrationError::invalid_connection_string(err)),
            Err(err) => Err(MigrationError::from_source(
                ErrorKind::Connection,
                err,
                "Could not connect to the MongoDB server",
            )),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> Database {
        self.client.database(&self.db_name)
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// A ledger stored in `collection_name` of the connected database.
    pub fn ledger(&self, collection_name: &str) -> MigrationLedger {
        MigrationLedger::new(self.database(), collection_name)
    }
}

fn is_transient(err: &MongoError) -> bool {
    !matches!(err.kind.as_ref(), MongoErrorKind::InvalidArgument { .. })
}
