use axum::{Json, extract::State};
use chrono::{Duration, Utc};

use crate::{
    AppState,
    auth::issue_token,
    confirmation,
    error::{ApiError, AppResult},
    models::{SignupRequest, TokenRequest, TokenResponse, User},
    repository::{email_taken, username_taken},
    validators::{validate_email, validate_required, validate_username},
};

/// signup
///
/// [Public Route] Registers a pending account and mails a confirmation code.
///
/// Repeating the request with the exact same (username, email) pair issues a
/// fresh code, invalidating the previous one. A username or email that
/// belongs to a different account is a conflict on that field.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Code sent", body = SignupRequest),
        (status = 400, description = "Invalid or taken username/email")
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> AppResult<Json<SignupRequest>> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let by_username = state.repo.get_user_by_username(&payload.username).await?;
    let by_email = state.repo.get_user_by_email(&payload.email).await?;

    let user = match (by_username, by_email) {
        (Some(named), Some(mailed)) if named.id == mailed.id => named,
        (None, None) => {
            let created = state
                .repo
                .create_user(User::new(&payload.username, &payload.email))
                .await?;
            tracing::info!(username = %created.username, "pending account created");
            created
        }
        (by_username, by_email) => {
            let mut conflicts = Vec::new();
            if by_username.is_some() {
                conflicts.push(username_taken(&payload.username));
            }
            if by_email.is_some() {
                conflicts.push(email_taken(&payload.email));
            }
            return Err(ApiError::Conflict(conflicts));
        }
    };

    let code = confirmation::issue(
        user.id,
        Duration::minutes(state.config.confirmation_code_ttl_minutes),
    );
    let secret = code.code.clone();
    state.repo.store_confirmation_code(code).await?;
    state
        .mailer
        .send_confirmation_code(&user.email, &user.username, &secret)
        .await
        .map_err(ApiError::Mail)?;

    Ok(Json(SignupRequest {
        username: user.username,
        email: user.email,
    }))
}

/// obtain_token
///
/// [Public Route] Exchanges a confirmation code for an access token.
///
/// The stored code is consumed by every attempt, right or wrong, so a code
/// can never be tried twice.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 400, description = "Invalid or expired code"),
        (status = 404, description = "Unknown username")
    ),
    tag = "auth"
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    validate_required("username", &payload.username, usize::MAX)?;
    validate_required("confirmation_code", &payload.confirmation_code, usize::MAX)?;

    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::NotFound)?;

    let stored = state.repo.take_confirmation_code(user.id).await?;
    if let Err(rejection) =
        confirmation::verify(stored.as_ref(), &payload.confirmation_code, Utc::now())
    {
        tracing::debug!(username = %user.username, ?rejection, "confirmation code refused");
        return Err(rejection.into());
    }

    state.repo.activate_user(user.id).await?;
    let token = issue_token(user.id, &state.config)?;
    tracing::info!(username = %user.username, "access token issued");

    Ok(Json(TokenResponse { token }))
}
