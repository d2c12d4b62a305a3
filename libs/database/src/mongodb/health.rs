use mongodb::{Database, bson::doc};

/// Ping the database; `Err` carries the driver message.
pub async fn check_health(db: &Database) -> Result<(), String> {
    db.run_command(doc! { "ping": 1 })
        .await
        .map(|_| ())
        .map_err(|e| format!("MongoDB ping failed: {}", e))
}
