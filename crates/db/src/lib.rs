pub mod indexes;
pub mod models;

use mongodb::{Client, Database};

/// Connects to MongoDB and returns a handle to the named database.
pub async fn connect(uri: &str, db_name: &str) -> mongodb::error::Result<Database> {
    let client = Client::with_uri_str(uri).await?;
    Ok(client.database(db_name))
}
