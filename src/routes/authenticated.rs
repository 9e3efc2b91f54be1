use crate::{
    AppState,
    handlers::{comments, reviews, terms, titles, users},
};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `AuthUser` middleware, so anonymous
/// writes are refused with 401 before any handler runs. Role checks happen
/// inside the handlers through the permission gates:
/// catalog writes need an admin, content edits need the author, a moderator
/// or an admin.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Own profile ---
        // GET/PATCH /users/me
        // The role field is ignored on PATCH.
        .route("/users/me", get(users::get_me).patch(users::update_me))
        // --- Catalog (admin only) ---
        .route("/categories", post(terms::create_category))
        .route(
            "/categories/{slug}",
            put(terms::update_category).delete(terms::delete_category),
        )
        .route("/genres", post(terms::create_genre))
        .route(
            "/genres/{slug}",
            put(terms::update_genre).delete(terms::delete_genre),
        )
        .route("/titles", post(titles::create_title))
        .route(
            "/titles/{title_id}",
            patch(titles::update_title).delete(titles::delete_title),
        )
        // --- Reviews ---
        // POST refreshes the title's rating; one review per user and title.
        .route("/titles/{title_id}/reviews", post(reviews::create_review))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        // --- Comments ---
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
}
