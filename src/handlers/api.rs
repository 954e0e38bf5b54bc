use crate::{
    error::SubmitError,
    models::RankedLink,
    service::{ranking::TOP_DEFAULT, shorten},
    AppState,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Host, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

// ── Request body ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    path: String,
}

/// Accepts the submit body either as JSON or as a urlencoded form, depending
/// on the request's `Content-Type`.
pub struct SubmitBody(SubmitRequest);

#[async_trait]
impl<S> FromRequest<S> for SubmitBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<SubmitRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        } else {
            let Form(body) = Form::<SubmitRequest>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self(body))
        }
    }
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// POST /submit
///
/// Responds `{"shortURL": ...}` on success. A rejected URL is still a 200,
/// carrying `{"error": ...}`.
///
/// The request host comes from `X-Forwarded-Host`, `Forwarded`, `Host` or the
/// request URI, in that order. A request with none of them is a 400.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Host(host): Host,
    SubmitBody(body): SubmitBody,
) -> Response {
    match state.shortener.submit(&body.path, &host).await {
        Ok(code) => {
            let base = state
                .config
                .base_url
                .clone()
                .unwrap_or_else(|| format!("http://{host}"));
            Json(json!({ "shortURL": shorten::short_url(&base, &code) })).into_response()
        }
        Err(SubmitError::Validation) => {
            Json(json!({ "error": SubmitError::Validation.to_string() })).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to store submission: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to store URL" })),
            )
                .into_response()
        }
    }
}

/// GET /new10
pub async fn newest(State(state): State<Arc<AppState>>) -> Json<Vec<RankedLink>> {
    Json(state.ranking.list_newest().await)
}

/// GET /top10
pub async fn top(State(state): State<Arc<AppState>>) -> Json<Vec<RankedLink>> {
    Json(state.ranking.list_top(TOP_DEFAULT).await)
}

/// GET /hits/:code
pub async fn hits(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<serde_json::Value> {
    let hits = state.ranking.visit_count(&code).await;
    Json(json!({ "code": code, "hits": hits }))
}
