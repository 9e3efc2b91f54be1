//! Categories and genres.
//!
//! Both taxonomies share validation and storage rules, so each public
//! handler is a thin wrapper naming its `Taxonomy` around a shared body.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
};

use super::{JsonBody, page_request, paged};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, AppResult},
    models::{Page, PageQuery, SearchQuery, Taxonomy, Term, TermRequest},
    permissions::CATALOG_GATE,
    validators::{NAME_MAX_LENGTH, validate_required, validate_slug},
};

fn validate_term(payload: &TermRequest) -> AppResult<()> {
    validate_required("name", &payload.name, NAME_MAX_LENGTH)?;
    validate_slug(&payload.slug)?;
    Ok(())
}

async fn list(
    state: AppState,
    kind: Taxonomy,
    page: PageQuery,
    search: SearchQuery,
) -> AppResult<Json<Page<Term>>> {
    let request = page_request(&state, page);
    let (terms, count) = state
        .repo
        .list_terms(kind, search.search.as_deref(), request)
        .await?;
    paged(terms, count, request)
}

async fn retrieve(state: AppState, kind: Taxonomy, slug: String) -> AppResult<Json<Term>> {
    state
        .repo
        .get_term(kind, &slug)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn create(
    user: AuthUser,
    method: Method,
    state: AppState,
    kind: Taxonomy,
    payload: JsonBody<TermRequest>,
) -> AppResult<(StatusCode, Json<Term>)> {
    CATALOG_GATE.check(Some(&user), &method, None)?;
    let Json(payload) = payload?;
    validate_term(&payload)?;
    let term = state.repo.create_term(kind, payload).await?;
    tracing::info!(table = kind.table(), slug = %term.slug, "term created");
    Ok((StatusCode::CREATED, Json(term)))
}

async fn update(
    user: AuthUser,
    method: Method,
    state: AppState,
    kind: Taxonomy,
    slug: String,
    payload: JsonBody<TermRequest>,
) -> AppResult<Json<Term>> {
    CATALOG_GATE.check(Some(&user), &method, None)?;
    let Json(payload) = payload?;
    validate_term(&payload)?;
    state
        .repo
        .update_term(kind, &slug, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn destroy(
    user: AuthUser,
    method: Method,
    state: AppState,
    kind: Taxonomy,
    slug: String,
) -> AppResult<StatusCode> {
    CATALOG_GATE.check(Some(&user), &method, None)?;
    if !state.repo.delete_term(kind, &slug).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(table = kind.table(), slug = %slug, "term deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- Categories ---

/// list_categories
///
/// [Public Route] `?search=` matches the name exactly.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(PageQuery, SearchQuery),
    responses((status = 200, description = "Categories", body = Page<Term>)),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(search): Query<SearchQuery>,
) -> AppResult<Json<Page<Term>>> {
    list(state, Taxonomy::Category, page, search).await
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 200, description = "Category", body = Term),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Term>> {
    retrieve(state, Taxonomy::Category, slug).await
}

/// create_category
///
/// [Admin Only] Name and slug must both be unused.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = TermRequest,
    responses(
        (status = 201, description = "Created", body = Term),
        (status = 400, description = "Invalid or duplicate name/slug"),
        (status = 403, description = "Not an admin")
    ),
    tag = "catalog"
)]
pub async fn create_category(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    payload: JsonBody<TermRequest>,
) -> AppResult<(StatusCode, Json<Term>)> {
    create(user, method, state, Taxonomy::Category, payload).await
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    request_body = TermRequest,
    responses((status = 200, description = "Updated", body = Term)),
    tag = "catalog"
)]
pub async fn update_category(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: JsonBody<TermRequest>,
) -> AppResult<Json<Term>> {
    update(user, method, state, Taxonomy::Category, slug, payload).await
}

/// delete_category
///
/// [Admin Only] Titles of the category keep existing without one.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{slug}",
    params(("slug" = String, Path, description = "Category slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn delete_category(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    destroy(user, method, state, Taxonomy::Category, slug).await
}

// --- Genres ---

#[utoipa::path(
    get,
    path = "/api/v1/genres",
    params(PageQuery, SearchQuery),
    responses((status = 200, description = "Genres", body = Page<Term>)),
    tag = "catalog"
)]
pub async fn list_genres(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(search): Query<SearchQuery>,
) -> AppResult<Json<Page<Term>>> {
    list(state, Taxonomy::Genre, page, search).await
}

#[utoipa::path(
    get,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 200, description = "Genre", body = Term),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn get_genre(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Term>> {
    retrieve(state, Taxonomy::Genre, slug).await
}

#[utoipa::path(
    post,
    path = "/api/v1/genres",
    request_body = TermRequest,
    responses(
        (status = 201, description = "Created", body = Term),
        (status = 400, description = "Invalid or duplicate name/slug"),
        (status = 403, description = "Not an admin")
    ),
    tag = "catalog"
)]
pub async fn create_genre(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    payload: JsonBody<TermRequest>,
) -> AppResult<(StatusCode, Json<Term>)> {
    create(user, method, state, Taxonomy::Genre, payload).await
}

#[utoipa::path(
    put,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    request_body = TermRequest,
    responses((status = 200, description = "Updated", body = Term)),
    tag = "catalog"
)]
pub async fn update_genre(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: JsonBody<TermRequest>,
) -> AppResult<Json<Term>> {
    update(user, method, state, Taxonomy::Genre, slug, payload).await
}

/// delete_genre
///
/// [Admin Only] Only the title associations go away with the genre.
#[utoipa::path(
    delete,
    path = "/api/v1/genres/{slug}",
    params(("slug" = String, Path, description = "Genre slug")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn delete_genre(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<StatusCode> {
    destroy(user, method, state, Taxonomy::Genre, slug).await
}
