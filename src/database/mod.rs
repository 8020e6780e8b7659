use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;
use std::time::Duration;

use crate::models::{Attraction, User};

pub const USERS: &str = "users";
pub const ATTRACTIONS: &str = "attractions";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(Duration::from_secs(300));
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let name = database_name(&client_options);
        let client = Client::with_options(client_options)?;
        let db = client.database(&name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<Document>(USERS);

        let username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(username_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(username, unique)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let google_index = IndexModel::builder()
            .keys(doc! { "googleId": 1 })
            .options(IndexOptions::builder().sparse(true).build())
            .build();

        match users.create_index(google_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(googleId)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let attractions = self.collection::<Document>(ATTRACTIONS);

        let owner_index = IndexModel::builder()
            .keys(doc! { "addedBy": 1 })
            .build();

        match attractions.create_index(owner_index).await {
            Ok(_) => log::info!("   ✅ Index created: attractions(addedBy)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn users(&self) -> Collection<User> {
        self.collection(USERS)
    }

    pub fn attractions(&self) -> Collection<Attraction> {
        self.collection(ATTRACTIONS)
    }

    pub async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }

    /// Handle that never connects; for code paths that fail before touching the database.
    #[cfg(test)]
    pub(crate) async fn unconnected() -> Self {
        let mut options = ClientOptions::parse("mongodb://127.0.0.1:1/attractions_test")
            .await
            .unwrap();
        options.server_selection_timeout = Some(Duration::from_millis(200));
        let client = Client::with_options(options).unwrap();
        Self { db: client.database("attractions_test") }
    }
}

/// Database named in the connection string, e.g. `mongodb+srv://host/arcane-london?retryWrites=true`.
fn database_name(options: &ClientOptions) -> String {
    options
        .default_database
        .clone()
        .unwrap_or_else(|| "arcane-london".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn name_for(uri: &str) -> String {
        database_name(&ClientOptions::parse(uri).await.unwrap())
    }

    #[tokio::test]
    async fn test_database_name_from_uri() {
        assert_eq!(name_for("mongodb://localhost:27017/attractions").await, "attractions");
        assert_eq!(
            name_for("mongodb://db-user:pw@localhost:27017/arcane-london?retryWrites=true&w=majority").await,
            "arcane-london"
        );
        assert_eq!(name_for("mongodb://localhost:27017").await, "arcane-london");
        assert_eq!(name_for("mongodb://localhost:27017/?directConnection=true").await, "arcane-london");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/attractions_test".to_string());
        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await);
    }
}
