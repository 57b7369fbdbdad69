use reqwest::{Response, StatusCode};
use serde::Deserialize;
use crate::core::{CreateTodo, GenerateImage, ImageUrl, Todo};
use anyhow::{Context, Result};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server root, e.g. `http://127.0.0.1:3000`.
    pub url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Typed client for the `/api/todos` endpoints.
#[derive(Clone)]
pub struct TodoClient {
    http: reqwest::Client,
    base: String,
}

impl TodoClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base: format!("{}/api", config.url.trim_end_matches('/')) })
    }

    pub async fn list_todos(&self) -> Result<Vec<Todo>> {
        let response = self
            .http
            .get(format!("{}/todos", self.base))
            .send()
            .await
            .context("Failed to fetch todos")?;
        Ok(expect(response, StatusCode::OK).await?.json().await?)
    }

    pub async fn create_todo(&self, title: &str, due_date: Option<&str>) -> Result<Todo> {
        let response = self
            .http
            .post(format!("{}/todos", self.base))
            .json(&CreateTodo::new(title, due_date))
            .send()
            .await
            .context("Failed to send create request")?;
        Ok(expect(response, StatusCode::CREATED).await?.json().await?)
    }

    pub async fn delete_todo(&self, id: Uuid) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/todos/{}", self.base, id))
            .send()
            .await
            .context("Failed to send delete request")?;
        expect(response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    /// Blocks until the server has generated and stored the image.
    pub async fn generate_image(&self, id: Uuid, title: &str) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/todos/generateImage", self.base))
            .json(&GenerateImage::new(id, title))
            .send()
            .await
            .context("Failed to send generate image request")?;
        let body: ImageUrl = expect(response, StatusCode::OK).await?.json().await?;
        Ok(body.image_url)
    }
}

async fn expect(response: Response, status: StatusCode) -> Result<Response> {
    if response.status() == status {
        return Ok(response);
    }
    let actual = response.status();
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => actual.to_string(),
    };
    Err(anyhow::anyhow!("Server responded {}: {}", actual.as_u16(), message))
}
