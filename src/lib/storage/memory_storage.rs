use async_trait::async_trait;
use anyhow::Result;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::Todo;

use super::Storage;

/// Process-local storage backing the service tests.
#[derive(Default)]
pub struct MemoryStorage {
    todos: RwLock<Vec<Todo>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list_todos(&self) -> Result<Vec<Todo>> {
        let todos = self.todos.read().await;
        // Reverse first so equal timestamps keep the latest insert on top.
        let mut sorted: Vec<Todo> = todos.iter().rev().cloned().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sorted)
    }

    async fn insert_todo(&self, todo: &Todo) -> Result<()> {
        let mut todos = self.todos.write().await;
        if todos.iter().any(|t| t.id == todo.id) {
            anyhow::bail!("todo {} already exists", todo.id);
        }
        todos.push(todo.clone());
        Ok(())
    }

    async fn delete_todo(&self, id: Uuid) -> Result<()> {
        self.todos.write().await.retain(|t| t.id != id);
        Ok(())
    }

    async fn set_image_url(&self, id: Uuid, image_url: &str) -> Result<bool> {
        let mut todos = self.todos.write().await;
        match todos.iter_mut().find(|t| t.id == id) {
            Some(todo) => {
                todo.image_url = Some(image_url.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
