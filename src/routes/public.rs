use crate::{
    AppState,
    handlers::{auth, comments, reviews, terms, titles},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token: every safe (read-only) method of the
/// catalog and content trees, and the two steps of the signup flow.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/signup
        // Creates a pending account (or re-issues a code) and mails the confirmation code.
        .route("/auth/signup", post(auth::signup))
        // POST /auth/token
        // Trades username + confirmation code for a JWT access token.
        .route("/auth/token", post(auth::obtain_token))
        // --- Catalog ---
        // GET /categories?search=  and  GET /genres?search=
        .route("/categories", get(terms::list_categories))
        .route("/categories/{slug}", get(terms::get_category))
        .route("/genres", get(terms::list_genres))
        .route("/genres/{slug}", get(terms::get_genre))
        // GET /titles?category=&genre=&name=&year=
        .route("/titles", get(titles::list_titles))
        .route("/titles/{title_id}", get(titles::get_title))
        // --- Reviews & Comments ---
        // Nested paths are checked for consistency: a review must belong to the
        // title in the path, a comment to the review.
        .route("/titles/{title_id}/reviews", get(reviews::list_reviews))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment),
        )
}
