#[cfg(feature = "storage")]
pub mod sqlite;
pub mod memory_storage;

pub use memory_storage::MemoryStorage;

use async_trait::async_trait;
use uuid::Uuid;
use crate::core::Todo;

/// Every method is a single-record operation or a single read.
#[async_trait]
pub trait Storage: Send + Sync {
    /// All todos, newest first.
    async fn list_todos(&self) -> anyhow::Result<Vec<Todo>>;
    async fn insert_todo(&self, todo: &Todo) -> anyhow::Result<()>;
    /// Removing an id that does not exist is not an error.
    async fn delete_todo(&self, id: Uuid) -> anyhow::Result<()>;
    /// Returns `false` when no todo has this id.
    async fn set_image_url(&self, id: Uuid, image_url: &str) -> anyhow::Result<bool>;
}
