//! HTTP handlers, one module per resource family.
//!
//! Every handler returns `AppResult<..>`; the `ApiError` rejection decides the
//! status code and body. Read handlers are mounted on the public router,
//! mutating handlers on the authenticated one and receive an `AuthUser`.

use axum::{Json, extract::rejection::JsonRejection};

use crate::{
    error::{ApiError, AppResult},
    models::{Page, PageQuery, PageRequest},
    AppState,
};

pub mod auth;
pub mod comments;
pub mod reviews;
pub mod terms;
pub mod titles;
pub mod users;

/// Request body of a gated handler. Deserialization failures are held back
/// until the permission check has run.
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Resolves `?page=` against the configured page size.
pub(crate) fn page_request(state: &AppState, query: PageQuery) -> PageRequest {
    PageRequest::new(query, state.config.page_size)
}

/// paged
///
/// Wraps one window of results. Asking for a page past the last one is a 404,
/// except for page 1 which is always valid (possibly empty).
pub(crate) fn paged<T>(results: Vec<T>, count: i64, request: PageRequest) -> AppResult<Json<Page<T>>> {
    if request.page > 1 && results.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(Page::new(results, count, request)))
}

/// health
///
/// Liveness probe for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
