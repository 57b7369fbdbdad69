use std::sync::Arc;
use uuid::Uuid;

use crate::core::{CreateTodo, GenerateImage, Todo, TodoError};
use crate::imaging::{ImageError, ImageGenerator};
use crate::storage::Storage;

#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument};

/// List/create/delete over a [`Storage`], plus the image-generation step.
///
/// Holds no mutable state of its own; every call is independent.
pub struct TodoService<S: Storage + 'static, G: ImageGenerator + 'static> {
    storage: Arc<S>,
    images: Arc<G>,
}

impl<S: Storage + 'static, G: ImageGenerator + 'static> Clone for TodoService<S, G> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            images: self.images.clone(),
        }
    }
}

impl<S: Storage + 'static, G: ImageGenerator + 'static> TodoService<S, G> {
    pub fn new(storage: Arc<S>, images: Arc<G>) -> Self {
        Self { storage, images }
    }

    pub async fn list(&self) -> Result<Vec<Todo>, TodoError> {
        self.storage.list_todos().await.map_err(TodoError::storage)
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn create(&self, request: CreateTodo) -> Result<Todo, TodoError> {
        let (title, due_date) = request.validate()?;
        let todo = Todo::new(title, due_date);
        self.storage.insert_todo(&todo).await.map_err(TodoError::storage)?;
        #[cfg(feature = "tracing")]
        info!(id = %todo.id, "Created todo");
        Ok(todo)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), TodoError> {
        self.storage.delete_todo(id).await.map_err(TodoError::storage)
    }

    /// Generates an image for `title` and stores the first URL on the todo.
    ///
    /// Exactly one attempt is made. On any failure the stored todo is left as it was.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub async fn generate_image(&self, request: GenerateImage) -> Result<String, TodoError> {
        let (todo_id, title) = request.validate()?;

        let images = self.images.generate(&title).await?;
        let image_url = images
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| ImageError::Protocol("no images returned".into()))?;
        #[cfg(feature = "tracing")]
        debug!(id = %todo_id, image_url = %image_url, "Image generated");

        let updated = self
            .storage
            .set_image_url(todo_id, &image_url)
            .await
            .map_err(TodoError::storage)?;
        if !updated {
            return Err(TodoError::NotFound(todo_id));
        }
        Ok(image_url)
    }
}
