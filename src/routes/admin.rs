use crate::{AppState, handlers::users};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// User management. Mounted behind the same authentication middleware as the
/// authenticated routes; each handler then requires the admin role or the
/// staff flag (`USERS_GATE`), answering 403 otherwise.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users?search=   POST /users
        // Lists accounts by username substring; creates active accounts directly.
        .route("/users", get(users::list_users).post(users::create_user))
        // GET/PATCH/DELETE /users/{username}
        // `/users/me` is a static route and wins over this one.
        .route(
            "/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
}
