use crate::{models::Outcome, AppState};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Where visitors of an unknown code are sent.
pub const NOT_FOUND_PATH: &str = "/notfound";

/// GET /:code
///
/// 302 to the stored URL, or 302 to the not-found page. A store failure
/// looks the same as an unknown code to the visitor.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    match state.resolver.resolve(&code).await {
        Outcome::Redirect(url) => found(url),
        Outcome::NotFound => found(NOT_FOUND_PATH.to_owned()),
    }
}

/// GET /notfound
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        "Short link not found. Submit the URL again at / to get a new one.",
    )
        .into_response()
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
