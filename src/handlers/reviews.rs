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
    models::{CreateReviewRequest, Page, PageQuery, Review, UpdateReviewRequest},
    permissions::{CONTENT_GATE, Resource},
    repository::duplicate_review,
    validators::{validate_required, validate_score},
};

async fn ensure_title(state: &AppState, title_id: i64) -> AppResult<()> {
    match state.repo.get_title(title_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound),
    }
}

/// Loads a review that must belong to `title_id`.
pub(crate) async fn load_review(state: &AppState, title_id: i64, review_id: i64) -> AppResult<Review> {
    state
        .repo
        .get_review(title_id, review_id)
        .await?
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title ID"), PageQuery),
    responses(
        (status = 200, description = "Reviews of the title", body = Page<Review>),
        (status = 404, description = "Unknown title")
    ),
    tag = "reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<Review>>> {
    ensure_title(&state, title_id).await?;
    let request = page_request(&state, page);
    let (reviews, count) = state.repo.list_reviews(title_id, request).await?;
    paged(reviews, count, request)
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 404, description = "Not Found")
    ),
    tag = "reviews"
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> AppResult<Json<Review>> {
    load_review(&state, title_id, review_id).await.map(Json)
}

/// create_review
///
/// [Authenticated Route] One review per user and title. A concurrent second
/// insert that slips past the pre-check fails on the storage constraint with
/// the same validation error.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews",
    params(("title_id" = i64, Path, description = "Title ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "Invalid score/text or already reviewed"),
        (status = 404, description = "Unknown title")
    ),
    tag = "reviews"
)]
pub async fn create_review(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(title_id): Path<i64>,
    payload: JsonBody<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    CONTENT_GATE.check(Some(&user), &method, None)?;
    ensure_title(&state, title_id).await?;
    let Json(payload) = payload?;

    validate_required("text", &payload.text, usize::MAX)?;
    let score = validate_score(payload.score)?;
    if state.repo.review_exists(title_id, user.id).await? {
        return Err(duplicate_review());
    }

    let review = state
        .repo
        .create_review(title_id, user.id, payload.text, score)
        .await?;
    let rating = state.repo.refresh_title_rating(title_id).await?;
    tracing::info!(title_id, review_id = review.id, ?rating, "review created");

    Ok((StatusCode::CREATED, Json(review)))
}

/// update_review
///
/// [Author, Moderator or Admin] Partial update of text and score.
#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not Found")
    ),
    tag = "reviews"
)]
pub async fn update_review(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    payload: JsonBody<UpdateReviewRequest>,
) -> AppResult<Json<Review>> {
    CONTENT_GATE.check(Some(&user), &method, None)?;
    let review = load_review(&state, title_id, review_id).await?;
    CONTENT_GATE.check(
        Some(&user),
        &method,
        Some(&Resource::authored_by(review.author_id)),
    )?;
    let Json(payload) = payload?;

    if let Some(text) = &payload.text {
        validate_required("text", text, usize::MAX)?;
    }
    let score = payload.score.map(validate_score).transpose()?;

    let updated = state
        .repo
        .update_review(review_id, payload.text, score)
        .await?
        .ok_or(ApiError::NotFound)?;
    state.repo.refresh_title_rating(title_id).await?;

    Ok(Json(updated))
}

/// delete_review
///
/// [Author, Moderator or Admin] Comments of the review go with it.
#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not Found")
    ),
    tag = "reviews"
)]
pub async fn delete_review(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    CONTENT_GATE.check(Some(&user), &method, None)?;
    let review = load_review(&state, title_id, review_id).await?;
    CONTENT_GATE.check(
        Some(&user),
        &method,
        Some(&Resource::authored_by(review.author_id)),
    )?;

    if !state.repo.delete_review(review_id).await? {
        return Err(ApiError::NotFound);
    }
    let rating = state.repo.refresh_title_rating(title_id).await?;
    tracing::info!(title_id, review_id, ?rating, "review deleted");

    Ok(StatusCode::NO_CONTENT)
}
