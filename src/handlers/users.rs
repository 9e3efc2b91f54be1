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
        AccountState, CreateUserRequest, Page, PageQuery, SearchQuery, UpdateUserRequest, User,
        UserProfile,
    },
    permissions::USERS_GATE,
    validators::{PROFILE_FIELD_MAX_LENGTH, validate_email, validate_max_length, validate_username},
};

/// Applies a partial profile update to `user`, validating each present field.
/// `role` is only applied when `allow_role` is set.
fn apply_changes(mut user: User, payload: UpdateUserRequest, allow_role: bool) -> AppResult<User> {
    if let Some(username) = payload.username {
        validate_username(&username)?;
        user.username = username;
    }
    if let Some(email) = payload.email {
        validate_email(&email)?;
        user.email = email;
    }
    if let Some(first_name) = payload.first_name {
        validate_max_length("first_name", &first_name, PROFILE_FIELD_MAX_LENGTH)?;
        user.first_name = first_name;
    }
    if let Some(last_name) = payload.last_name {
        validate_max_length("last_name", &last_name, PROFILE_FIELD_MAX_LENGTH)?;
        user.last_name = last_name;
    }
    if let Some(bio) = payload.bio {
        user.bio = bio;
    }
    if allow_role {
        if let Some(role) = payload.role {
            user.role = role;
        }
    }
    Ok(user)
}

async fn find_user(state: &AppState, username: &str) -> AppResult<User> {
    state
        .repo
        .get_user_by_username(username)
        .await?
        .ok_or(ApiError::NotFound)
}

async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<User> {
    state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(ApiError::Unauthorized)
}

/// list_users
///
/// [Admin Only] `?search=` matches a substring of the username.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(PageQuery, SearchQuery),
    responses(
        (status = 200, description = "Users", body = Page<UserProfile>),
        (status = 403, description = "Not an admin")
    ),
    tag = "users"
)]
pub async fn list_users(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(search): Query<SearchQuery>,
) -> AppResult<Json<Page<UserProfile>>> {
    USERS_GATE.check(Some(&user), &method, None)?;
    let request = page_request(&state, page);
    let (users, count) = state
        .repo
        .list_users(search.search.as_deref(), request)
        .await?;
    paged(
        users.into_iter().map(UserProfile::from).collect(),
        count,
        request,
    )
}

/// create_user
///
/// [Admin Only] Accounts created here skip the confirmation step and start
/// active.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = UserProfile),
        (status = 400, description = "Invalid or taken username/email"),
        (status = 403, description = "Not an admin")
    ),
    tag = "users"
)]
pub async fn create_user(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    payload: JsonBody<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    USERS_GATE.check(Some(&user), &method, None)?;
    let Json(payload) = payload?;
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;

    let mut account = User::new(payload.username, payload.email);
    account.state = AccountState::Active;
    let account = apply_changes(
        account,
        UpdateUserRequest {
            role: payload.role,
            bio: payload.bio,
            first_name: payload.first_name,
            last_name: payload.last_name,
            ..Default::default()
        },
        true,
    )?;

    let created = state.repo.create_user(account).await?;
    tracing::info!(username = %created.username, role = ?created.role, "user created by admin");
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 404, description = "Not Found")
    ),
    tag = "users"
)]
pub async fn get_user(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<UserProfile>> {
    USERS_GATE.check(Some(&user), &method, None)?;
    Ok(Json(find_user(&state, &username).await?.into()))
}

/// update_user
///
/// [Admin Only] Partial update, including the role.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 404, description = "Not Found")
    ),
    tag = "users"
)]
pub async fn update_user(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(username): Path<String>,
    payload: JsonBody<UpdateUserRequest>,
) -> AppResult<Json<UserProfile>> {
    USERS_GATE.check(Some(&user), &method, None)?;
    let Json(payload) = payload?;
    let target = find_user(&state, &username).await?;
    let target = apply_changes(target, payload, true)?;
    state
        .repo
        .update_user(target)
        .await?
        .map(|updated| Json(updated.into()))
        .ok_or(ApiError::NotFound)
}

/// delete_user
///
/// [Admin Only] Reviews and comments of the user are removed and the ratings
/// they contributed to are recomputed.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    ),
    tag = "users"
)]
pub async fn delete_user(
    user: AuthUser,
    method: Method,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<StatusCode> {
    USERS_GATE.check(Some(&user), &method, None)?;
    let target = find_user(&state, &username).await?;
    if !state.repo.delete_user(target.id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(username = %username, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses((status = 200, description = "Profile", body = UserProfile)),
    tag = "users"
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserProfile>> {
    Ok(Json(current_user(&state, &user).await?.into()))
}

/// update_me
///
/// [Authenticated Route] Edits the caller's own profile. A `role` in the
/// payload is ignored.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserProfile),
        (status = 400, description = "Invalid or taken username/email")
    ),
    tag = "users"
)]
pub async fn update_me(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserProfile>> {
    let me = current_user(&state, &user).await?;
    let me = apply_changes(me, payload, false)?;
    state
        .repo
        .update_user(me)
        .await?
        .map(|updated| Json(updated.into()))
        .ok_or(ApiError::Unauthorized)
}
