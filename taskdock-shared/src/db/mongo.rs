//! MongoDB connection management

use std::time::Duration;

use mongodb::{bson::doc, options::ClientOptions, Client, Database};
use tracing::info;

/// Database used when neither `MONGODB_DATABASE` nor the URI names one
pub const DEFAULT_DATABASE: &str = "taskdock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// `mongodb://` or `mongodb+srv://` connection string
    pub uri: String,

    /// Overrides the database named in the URI path
    pub database: Option<String>,

    /// Connect and server-selection timeout
    pub connect_timeout_ms: u64,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: None,
            connect_timeout_ms: 5000,
        }
    }
}

/// Builds a client handle without contacting the server
///
/// `mongodb+srv` URIs still need a DNS lookup here.
pub async fn open_database(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.uri).await?;

    let timeout = Duration::from_millis(config.connect_timeout_ms);
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    options.app_name = Some("taskdock".to_string());

    let name = config
        .database
        .clone()
        .or_else(|| options.default_database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options)?;
    Ok(client.database(&name))
}

/// Builds the handle and verifies the server answers `ping`
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let database = open_database(config).await?;

    database.run_command(doc! { "ping": 1 }).await?;

    info!(database = %database.name(), "Successfully connected to MongoDB");
    Ok(database)
}
