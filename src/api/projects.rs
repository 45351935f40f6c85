//! Project creation endpoint.
//!
//! `POST /projects` seeds a new workspace by copying a language template's
//! remote prefix to the workspace's prefix. The copy is storage-side; no
//! file bytes pass through this process.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use codedeck_core::{template_prefix, validate_workspace_id, workspace_prefix, WorkspaceSync};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub repl_id: String,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

async fn create_project(
    Extension(sync): Extension<Arc<WorkspaceSync>>,
    Json(request): Json<CreateProjectRequest>,
) -> Result<Json<CreateProjectResponse>, (StatusCode, Json<ErrorResponse>)> {
    // Validate before touching storage.
    if let Err(error) = validate_workspace_id(&request.repl_id) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        ));
    }
    if request.language.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "language must not be empty".to_string(),
            }),
        ));
    }

    let source = template_prefix(&request.language);
    let dest = workspace_prefix(&request.repl_id);
    if let Err(error) = sync.copy_folder(&source, &dest).await {
        warn!(repl_id = %request.repl_id, language = %request.language, %error, "project creation failed");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "failed to create project".to_string(),
            }),
        ));
    }

    info!(repl_id = %request.repl_id, language = %request.language, "project created");
    Ok(Json(CreateProjectResponse { status: "created" }))
}

/// Create project routes
pub fn routes() -> Router {
    Router::new().route("/projects", post(create_project))
}
