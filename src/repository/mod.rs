use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{ApiError, AppResult},
    models::{
        Comment, ConfirmationCode, PageRequest, Review, Taxonomy, Term, TermRequest, Title,
        TitleFilter, User,
    },
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// NewTitle
///
/// A validated title insert with category and genres already resolved to ids.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub genre_ids: Vec<i64>,
}

/// TitleChanges
///
/// A validated partial update. `None` keeps the stored value; a `Some` genre
/// list replaces every association.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub genre_ids: Option<Vec<i64>>,
}

/// Repository Trait
///
/// The contract for every persistence operation. Handlers see only this
/// trait; `PostgresRepository` backs production and `MemoryRepository`
/// backs tests and database-less local runs.
///
/// Uniqueness (usernames, emails, term names and slugs, one review per title
/// and author) is enforced inside each implementation's write path, never by
/// a separate check-then-insert in the caller.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Username substring search, ordered by username.
    async fn list_users(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<User>, i64)>;
    /// Fails with `ApiError::Conflict` when username or email is taken.
    async fn create_user(&self, user: User) -> AppResult<User>;
    /// Writes every mutable column of `user`. Same conflict rules as create.
    async fn update_user(&self, user: User) -> AppResult<Option<User>>;
    /// Removes the user with their reviews and comments, refreshing the
    /// ratings of every title they had reviewed.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;
    async fn activate_user(&self, id: Uuid) -> AppResult<()>;

    // --- Confirmation codes ---
    /// Replaces any previous code of the same user.
    async fn store_confirmation_code(&self, code: ConfirmationCode) -> AppResult<()>;
    /// Atomically removes and returns the user's code. Two concurrent callers
    /// can never both receive it.
    async fn take_confirmation_code(&self, user_id: Uuid) -> AppResult<Option<ConfirmationCode>>;

    // --- Categories & Genres ---
    /// Exact-name search, ordered by name.
    async fn list_terms(
        &self,
        kind: Taxonomy,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Term>, i64)>;
    async fn get_term(&self, kind: Taxonomy, slug: &str) -> AppResult<Option<Term>>;
    async fn create_term(&self, kind: Taxonomy, term: TermRequest) -> AppResult<Term>;
    async fn update_term(
        &self,
        kind: Taxonomy,
        slug: &str,
        term: TermRequest,
    ) -> AppResult<Option<Term>>;
    /// Categories detach from their titles; genres drop their associations.
    async fn delete_term(&self, kind: Taxonomy, slug: &str) -> AppResult<bool>;

    // --- Titles ---
    async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Title>, i64)>;
    async fn get_title(&self, id: i64) -> AppResult<Option<Title>>;
    async fn create_title(&self, title: NewTitle) -> AppResult<Title>;
    async fn update_title(&self, id: i64, changes: TitleChanges) -> AppResult<Option<Title>>;
    async fn delete_title(&self, id: i64) -> AppResult<bool>;

    // --- Reviews ---
    async fn list_reviews(&self, title_id: i64, page: PageRequest)
    -> AppResult<(Vec<Review>, i64)>;
    /// `None` when the review is absent or belongs to another title.
    async fn get_review(&self, title_id: i64, review_id: i64) -> AppResult<Option<Review>>;
    async fn review_exists(&self, title_id: i64, author_id: Uuid) -> AppResult<bool>;
    /// Fails with `ApiError::Validation` when the author already reviewed the title.
    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        text: String,
        score: i16,
    ) -> AppResult<Review>;
    async fn update_review(
        &self,
        review_id: i64,
        text: Option<String>,
        score: Option<i16>,
    ) -> AppResult<Option<Review>>;
    async fn delete_review(&self, review_id: i64) -> AppResult<bool>;
    /// Recomputes and stores the mean score of the title's reviews.
    async fn refresh_title_rating(&self, title_id: i64) -> AppResult<Option<f64>>;

    // --- Comments ---
    async fn list_comments(
        &self,
        review_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Comment>, i64)>;
    /// `None` when the comment is absent or belongs to another review.
    async fn get_comment(&self, review_id: i64, comment_id: i64) -> AppResult<Option<Comment>>;
    async fn create_comment(
        &self,
        review_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment>;
    async fn update_comment(&self, comment_id: i64, text: String) -> AppResult<Option<Comment>>;
    async fn delete_comment(&self, comment_id: i64) -> AppResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Shared error vocabulary for both implementations ---

pub(crate) const DUPLICATE_REVIEW: &str = "You have already reviewed this title.";

pub(crate) fn duplicate_review() -> ApiError {
    ApiError::validation("non_field_errors", DUPLICATE_REVIEW)
}

pub(crate) fn username_taken(username: &str) -> (&'static str, String) {
    ("username", format!("Username {username} is already taken."))
}

pub(crate) fn email_taken(email: &str) -> (&'static str, String) {
    ("email", format!("Email {email} is already taken."))
}

pub(crate) fn term_taken(kind: Taxonomy, field: &'static str) -> ApiError {
    let entity = match kind {
        Taxonomy::Category => "Category",
        Taxonomy::Genre => "Genre",
    };
    ApiError::validation(field, format!("{entity} with this {field} already exists."))
}
