use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use anyhow::Context;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::core::{CreateTodo, GenerateImage, ImageUrl, Todo, TodoError, TodoService};
use crate::imaging::ImageGenerator;
use crate::storage::Storage;
use crate::transport::{configure_tls, TlsConfig};

#[cfg(feature = "tracing")]
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub bind_addr: String,
    pub tls: Option<TlsConfig>,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            tls: None,
        }
    }
}

/// Error body returned to callers. Only validation failures carry their own
/// message; everything else gets the operation's generic message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn or_generic(generic: &'static str) -> impl Fn(TodoError) -> ApiError {
        move |err| match err {
            TodoError::Validation(message) => ApiError::bad_request(message),
            other => {
                #[cfg(feature = "tracing")]
                warn!(error = %other, "{generic}");
                ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: generic.to_string() }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(_: JsonRejection) -> Self {
        ApiError::bad_request("Invalid request body")
    }
}

async fn list_todos<S: Storage + 'static, G: ImageGenerator + 'static>(
    State(service): State<TodoService<S, G>>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = service.list().await.map_err(ApiError::or_generic("Error fetching todos"))?;
    Ok(Json(todos))
}

async fn create_todo<S: Storage + 'static, G: ImageGenerator + 'static>(
    State(service): State<TodoService<S, G>>,
    body: Result<Json<CreateTodo>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(request) = body?;
    let todo = service.create(request).await.map_err(ApiError::or_generic("Error creating todo"))?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn delete_todo<S: Storage + 'static, G: ImageGenerator + 'static>(
    State(service): State<TodoService<S, G>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    // An id that is not a UUID cannot match any todo.
    if let Ok(id) = Uuid::parse_str(&id) {
        service.delete(id).await.map_err(ApiError::or_generic("Error deleting todo"))?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_image<S: Storage + 'static, G: ImageGenerator + 'static>(
    State(service): State<TodoService<S, G>>,
    body: Result<Json<GenerateImage>, JsonRejection>,
) -> Result<Json<ImageUrl>, ApiError> {
    let Json(request) = body?;
    let image_url = service
        .generate_image(request)
        .await
        .map_err(ApiError::or_generic("Error generating image"))?;
    Ok(Json(ImageUrl { image_url }))
}

async fn health_route() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub fn router<S: Storage + 'static, G: ImageGenerator + 'static>(service: TodoService<S, G>) -> Router {
    let api = Router::new()
        .route("/todos", get(list_todos::<S, G>).post(create_todo::<S, G>))
        .route("/todos/generateImage", post(generate_image::<S, G>))
        .route("/todos/{id}", delete(delete_todo::<S, G>));

    let router = Router::new()
        .route("/health", get(health_route))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(service);

    #[cfg(feature = "tracing")]
    let router = router.layer(
        tower_http::trace::TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request<_>| {
            let uri = request.uri().to_string();
            tracing::info_span!("http_request", method = ?request.method(), uri)
        }),
    );

    router
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
    tls: Option<TlsConfig>,
}

impl HttpServer {
    pub async fn new<S: Storage + 'static, G: ImageGenerator + 'static>(
        service: TodoService<S, G>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .with_context(|| format!("failed to listen on {}", config.bind_addr))?;
        Ok(Self { router: router(service), listener, tls: config.tls })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        match self.tls {
            None => {
                #[cfg(feature = "tracing")]
                info!(addr = %addr, "HTTP server started");
                axum::serve(self.listener, self.router)
                    .await
                    .context("received error from running server")?;
            }
            Some(tls) => {
                let rustls = configure_tls(&tls).await?;
                #[cfg(feature = "tracing")]
                info!(addr = %addr, "HTTPS server started");
                axum_server::from_tcp_rustls(self.listener.into_std()?, rustls)
                    .serve(self.router.into_make_service())
                    .await
                    .context("received error from running server")?;
            }
        }
        Ok(())
    }
}
