use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;
use crate::core::Todo;
use crate::storage::Storage;
use async_trait::async_trait;
use anyhow::{Context, Result};

#[cfg(feature = "tracing")]
use tracing::{debug, info};

pub struct SQLiteStorage {
    pool: SqlitePool,
}

impl SQLiteStorage {
    /// Opens (creating if needed) the database at `url`, e.g. `sqlite://todos.db`.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            #[cfg(feature = "tracing")]
            info!(url = %url, "Creating database");
            Sqlite::create_database(url)
                .await
                .with_context(|| format!("failed to create database {url}"))?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .with_context(|| format!("failed to open database {url}"))?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database. Pinned to one connection that is never
    /// recycled, since every new connection would see an empty database.
    pub async fn new_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        migrate(&pool).await?;
        Ok(Self { pool })
    }
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS todos (
              id BLOB PRIMARY KEY NOT NULL,
              title TEXT NOT NULL,
              due_date TEXT,
              image_url TEXT,
              created_at TEXT NOT NULL)
              ",
    )
    .execute(pool)
    .await
    .context("failed to create todos table")?;
    sqlx::query("CREATE INDEX IF NOT EXISTS todos_created_at ON todos (created_at)")
        .execute(pool)
        .await?;
    Ok(())
}

#[async_trait]
impl Storage for SQLiteStorage {
    async fn list_todos(&self) -> Result<Vec<Todo>> {
        let todos = sqlx::query_as::<_, Todo>(
            "SELECT id, title, due_date, image_url, created_at
             FROM todos
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(todos)
    }

    async fn insert_todo(&self, todo: &Todo) -> Result<()> {
        sqlx::query(
            "INSERT INTO todos (id, title, due_date, image_url, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(todo.id)
        .bind(&todo.title)
        .bind(todo.due_date)
        .bind(&todo.image_url)
        .bind(todo.created_at)
        .execute(&self.pool)
        .await?;
        #[cfg(feature = "tracing")]
        debug!(id = %todo.id, "Inserted todo");
        Ok(())
    }

    async fn delete_todo(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        #[cfg(feature = "tracing")]
        debug!(id = %id, "Deleted todo");
        Ok(())
    }

    async fn set_image_url(&self, id: Uuid, image_url: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE todos SET image_url = ? WHERE id = ?")
            .bind(image_url)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
