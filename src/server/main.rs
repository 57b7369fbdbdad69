use prk_todo::adapters::HttpServer;
use prk_todo::config::AppConfig;
use prk_todo::core::TodoService;
use prk_todo::imaging::FalClient;
use prk_todo::storage::sqlite::SQLiteStorage;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "tracing")]
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = AppConfig::from_env()?;
    let storage = Arc::new(SQLiteStorage::new(&config.database_url, 5).await?);
    let images = Arc::new(FalClient::new(config.fal)?);
    let service = TodoService::new(storage, images);

    let server = HttpServer::new(service, config.server).await?;
    server.run().await?;
    Ok(())
}
