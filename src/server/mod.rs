//! HTTP server: generated files, on-demand post pages and "load more"

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::cms::{CmsError, ContentSource};
use crate::content::PostSummary;
use crate::feed::{self, FeedError};
use crate::generator::Generator;
use crate::helpers::is_valid_slug;
use crate::templates::LOAD_MORE_API;
use crate::Blog;

/// Server state
pub struct ServerState<S> {
    generator: Generator<S>,
}

impl<S: ContentSource> ServerState<S> {
    pub fn new(generator: Generator<S>) -> Self {
        Self { generator }
    }
}

#[derive(Debug, Deserialize)]
struct CursorQuery {
    cursor: Option<String>,
}

/// Body of a successful "load more" call
#[derive(Debug, Serialize)]
pub struct LoadMoreResponse {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
    /// The results rendered as home page items
    pub html: String,
}

/// Why a "load more" call failed
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("missing `cursor` query parameter")]
    MissingCursor,

    #[error("cursor does not belong to the content repository")]
    ForeignCursor,

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("failed to render posts: {0}")]
    Render(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCursor | ApiError::ForeignCursor => StatusCode::BAD_REQUEST,
            ApiError::Feed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let generator = Generator::new(blog, blog.client()?)?;
    let app = router(blog, Arc::new(ServerState::new(generator)));

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Routes for the blog, mounted under the configured root
pub fn router<S: ContentSource + 'static>(blog: &Blog, state: Arc<ServerState<S>>) -> Router {
    let files = ServeDir::new(&blog.public_dir)
        .not_found_service(ServeFile::new(blog.public_dir.join("404.html")));

    let routes = Router::new()
        .route(&format!("/{}", LOAD_MORE_API), get(load_more_handler::<S>))
        .route("/posts/:slug", get(post_handler::<S>))
        .route("/posts/:slug/", get(post_handler::<S>))
        .fallback_service(files)
        .with_state(state);

    let root = blog.config.root.trim_end_matches('/');
    let app = if root.is_empty() {
        routes
    } else {
        Router::new().nest(root, routes)
    };

    app.layer(TraceLayer::new_for_http())
}

async fn load_more_handler<S: ContentSource>(
    State(state): State<Arc<ServerState<S>>>,
    Query(query): Query<CursorQuery>,
) -> Result<Json<LoadMoreResponse>, ApiError> {
    let cursor = query
        .cursor
        .filter(|c| !c.is_empty())
        .ok_or(ApiError::MissingCursor)?;

    load_more(&state.generator, &cursor)
        .await
        .map(Json)
        .inspect_err(|e| tracing::warn!("Load more failed: {}", e))
}

async fn post_handler<S: ContentSource>(
    State(state): State<Arc<ServerState<S>>>,
    Path(slug): Path<String>,
) -> Response {
    match post_page(&state.generator, &slug).await {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => not_found(&state.generator),
        Err(e) => {
            tracing::error!("Failed to render post {:?}: {:#}", slug, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render post").into_response()
        }
    }
}

fn not_found<S: ContentSource>(generator: &Generator<S>) -> Response {
    match generator.renderer().render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Fetch the page behind `cursor` and render its items
pub async fn load_more<S: ContentSource>(
    generator: &Generator<S>,
    cursor: &str,
) -> Result<LoadMoreResponse, ApiError> {
    if !generator.source().owns_cursor(cursor) {
        return Err(ApiError::ForeignCursor);
    }

    let page = feed::fetch_page(generator.source(), generator.formatter(), cursor).await?;
    let html = generator
        .renderer()
        .render_post_list(&page.results)
        .map_err(ApiError::Render)?;

    Ok(LoadMoreResponse {
        results: page.results,
        next_page: page.next_page,
        html,
    })
}

/// The page for `slug`: generated earlier, or rendered now and kept for later
/// requests. `None` when no such post exists.
pub async fn post_page<S: ContentSource>(
    generator: &Generator<S>,
    slug: &str,
) -> Result<Option<String>> {
    if !is_valid_slug(slug) {
        return Ok(None);
    }

    let path = generator.post_output_path(slug);
    if let Ok(html) = tokio::fs::read_to_string(&path).await {
        return Ok(Some(html));
    }

    tracing::info!("Rendering post {:?} on demand", slug);
    match generator.generate_post(slug).await {
        Ok(html) => Ok(Some(html)),
        Err(e) if e.downcast_ref::<CmsError>().is_some_and(CmsError::is_not_found) => Ok(None),
        Err(e) => Err(e),
    }
}
