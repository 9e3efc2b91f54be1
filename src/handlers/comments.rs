use axum::{
    Json,
    extract::{Path, Query, State},
    http::{Method, StatusCode},
};

use super::{JsonBody, page_request, paged, reviews::load_review};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiError, AppResult},
    models::{Comment, CommentRequest, Page, PageQuery, UpdateCommentRequest},
    permissions::{CONTENT_GATE, Resource},
    validators::validate_required,
};

async fn load_comment(
    state: &AppState,
    title_id: i64,
    review_id: i64,
    comment_id: i64,
) -> AppResult<Comment> {
    load_review(state, title_id, review_id).await?;
    state
        .repo
        .get_comment(review_id, comment_id)
        .await?
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Comments of the review", body = Page<Comment>),
        (status = 404, description = "Unknown title or review")
    ),
    tag = "reviews"
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<Comment>>> {
    load_review(&state, title_id, review_id).await?;
    let request = page_request(&state, page);
    let (comments, count) = state.repo.list_comments(review_id, request).await?;
    paged(comments, count, request)
}

#[utoipa::path(
    get,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Not Found")
    ),
    tag = "reviews"
)]
pub async fn get_comment(
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> AppResult<Json<Comment>> {
    load_comment(&state, title_id, review_id, comment_id)
        .await
        .map(Json)
}

/// create_comment
///
/// [Authenticated Route] The review must belong to the title in the path.
#[utoipa::path(
    post,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID")
    ),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 404, description = "Unknown title or review")
    ),
    tag = "reviews"
)]
pub async fn create_comment(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    payload: JsonBody<CommentRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    CONTENT_GATE.check(Some(&user), &method, None)?;
    load_review(&state, title_id, review_id).await?;
    let Json(payload) = payload?;
    validate_required("text", &payload.text, usize::MAX)?;

    let comment = state
        .repo
        .create_comment(review_id, user.id, payload.text)
        .await?;
    tracing::info!(review_id, comment_id = comment.id, "comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not Found")
    ),
    tag = "reviews"
)]
pub async fn update_comment(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    payload: JsonBody<UpdateCommentRequest>,
) -> AppResult<Json<Comment>> {
    CONTENT_GATE.check(Some(&user), &method, None)?;
    let comment = load_comment(&state, title_id, review_id, comment_id).await?;
    CONTENT_GATE.check(
        Some(&user),
        &method,
        Some(&Resource::authored_by(comment.author_id)),
    )?;
    let Json(payload) = payload?;

    let Some(text) = payload.text else {
        return Ok(Json(comment));
    };
    validate_required("text", &text, usize::MAX)?;

    state
        .repo
        .update_comment(comment_id, text)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[utoipa::path(
    delete,
    path = "/api/v1/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
    params(
        ("title_id" = i64, Path, description = "Title ID"),
        ("review_id" = i64, Path, description = "Review ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not Found")
    ),
    tag = "reviews"
)]
pub async fn delete_comment(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> AppResult<StatusCode> {
    CONTENT_GATE.check(Some(&user), &method, None)?;
    let comment = load_comment(&state, title_id, review_id, comment_id).await?;
    CONTENT_GATE.check(
        Some(&user),
        &method,
        Some(&Resource::authored_by(comment.author_id)),
    )?;

    if !state.repo.delete_comment(comment_id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(review_id, comment_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}
