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
    models::{
        CreateTitleRequest, Page, PageQuery, Taxonomy, Title, TitleFilter, UpdateTitleRequest,
    },
    permissions::CATALOG_GATE,
    repository::{NewTitle, TitleChanges},
    validators::{NAME_MAX_LENGTH, validate_required, validate_year},
};

fn unknown_slug(field: &str, slug: &str) -> ApiError {
    ApiError::validation(field, format!("Object with slug={slug} does not exist."))
}

async fn resolve_category(state: &AppState, slug: &str) -> AppResult<i64> {
    state
        .repo
        .get_term(Taxonomy::Category, slug)
        .await?
        .map(|term| term.id)
        .ok_or_else(|| unknown_slug("category", slug))
}

async fn resolve_genres(state: &AppState, slugs: &[String]) -> AppResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let term = state
            .repo
            .get_term(Taxonomy::Genre, slug)
            .await?
            .ok_or_else(|| unknown_slug("genre", slug))?;
        ids.push(term.id);
    }
    Ok(ids)
}

/// list_titles
///
/// [Public Route] Filters combine with AND: `category` and `genre` take a
/// slug, `name` is a case-insensitive substring, `year` is exact.
#[utoipa::path(
    get,
    path = "/api/v1/titles",
    params(PageQuery, TitleFilter),
    responses((status = 200, description = "Titles", body = Page<Title>)),
    tag = "catalog"
)]
pub async fn list_titles(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<TitleFilter>,
) -> AppResult<Json<Page<Title>>> {
    let request = page_request(&state, page);
    let (titles, count) = state.repo.list_titles(&filter, request).await?;
    paged(titles, count, request)
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title ID")),
    responses(
        (status = 200, description = "Title", body = Title),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn get_title(
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
) -> AppResult<Json<Title>> {
    state
        .repo
        .get_title(title_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_title
///
/// [Admin Only] Category and genres are given by slug and must exist.
#[utoipa::path(
    post,
    path = "/api/v1/titles",
    request_body = CreateTitleRequest,
    responses(
        (status = 201, description = "Created", body = Title),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not an admin")
    ),
    tag = "catalog"
)]
pub async fn create_title(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    payload: JsonBody<CreateTitleRequest>,
) -> AppResult<(StatusCode, Json<Title>)> {
    CATALOG_GATE.check(Some(&user), &method, None)?;
    let Json(payload) = payload?;

    validate_required("name", &payload.name, NAME_MAX_LENGTH)?;
    let year = validate_year(payload.year)?;
    let category_id = match &payload.category {
        Some(slug) => Some(resolve_category(&state, slug).await?),
        None => None,
    };
    let genre_ids = resolve_genres(&state, &payload.genre).await?;

    let title = state
        .repo
        .create_title(NewTitle {
            name: payload.name,
            year,
            description: payload.description,
            category_id,
            genre_ids,
        })
        .await?;
    tracing::info!(title_id = title.id, "title created");
    Ok((StatusCode::CREATED, Json(title)))
}

/// update_title
///
/// [Admin Only] Partial update. A `genre` list, when present, replaces the
/// current genres entirely.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title ID")),
    request_body = UpdateTitleRequest,
    responses(
        (status = 200, description = "Updated", body = Title),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn update_title(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    payload: JsonBody<UpdateTitleRequest>,
) -> AppResult<Json<Title>> {
    CATALOG_GATE.check(Some(&user), &method, None)?;
    let Json(payload) = payload?;

    if let Some(name) = &payload.name {
        validate_required("name", name, NAME_MAX_LENGTH)?;
    }
    let year = payload.year.map(validate_year).transpose()?;
    let category_id = match &payload.category {
        Some(slug) => Some(resolve_category(&state, slug).await?),
        None => None,
    };
    let genre_ids = match &payload.genre {
        Some(slugs) => Some(resolve_genres(&state, slugs).await?),
        None => None,
    };

    state
        .repo
        .update_title(
            title_id,
            TitleChanges {
                name: payload.name,
                year,
                description: payload.description,
                category_id,
                genre_ids,
            },
        )
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}",
    params(("title_id" = i64, Path, description = "Title ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    tag = "catalog"
)]
pub async fn delete_title(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
) -> AppResult<StatusCode> {
    CATALOG_GATE.check(Some(&user), &method, None)?;
    if !state.repo.delete_title(title_id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(title_id, "title deleted");
    Ok(StatusCode::NO_CONTENT)
}
