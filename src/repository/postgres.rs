use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use super::{
    NewTitle, Repository, TitleChanges, duplicate_review, email_taken, term_taken, username_taken,
};
use crate::{
    error::{ApiError, AppResult},
    models::{
        AccountState, Comment, ConfirmationCode, PageRequest, Review, Taxonomy, Term, TermRequest,
        Title, TitleFilter, TitleRow, User,
    },
};

const USER_COLUMNS: &str =
    "id, username, email, role, bio, first_name, last_name, is_staff, state, date_joined";

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.author_id, u.username AS author, r.text, r.score, r.pub_date
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

const REFRESH_RATING: &str = r#"
    UPDATE titles
    SET rating = (SELECT AVG(score)::float8 FROM reviews WHERE title_id = $1)
    WHERE id = $1
    RETURNING rating
"#;

/// Name of the unique constraint a failed write tripped, if that is why it failed.
fn unique_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

fn user_write_error(err: sqlx::Error, user: &User) -> ApiError {
    match unique_constraint(&err) {
        Some(constraint) if constraint.contains("email") => {
            ApiError::Conflict(vec![email_taken(&user.email)])
        }
        Some(_) => ApiError::Conflict(vec![username_taken(&user.username)]),
        None => ApiError::Database(err),
    }
}

fn term_write_error(err: sqlx::Error, kind: Taxonomy) -> ApiError {
    match unique_constraint(&err) {
        Some(constraint) if constraint.contains("slug") => term_taken(kind, "slug"),
        Some(_) => term_taken(kind, "name"),
        None => ApiError::Database(err),
    }
}

/// `%input%` for `ILIKE ... ESCAPE '\'`, with the input's own wildcards
/// matched literally.
fn contains_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Filters shared by the title page query and its count query. Expects the
/// builder to already hold `... FROM titles t LEFT JOIN categories c ... WHERE TRUE`.
fn push_title_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    if let Some(category) = &filter.category {
        builder.push(" AND c.slug = ");
        builder.push_bind(category.clone());
    }
    if let Some(genre) = &filter.genre {
        builder.push(
            " AND EXISTS (SELECT 1 FROM genre_title gt JOIN genres g ON g.id = gt.genre_id \
             WHERE gt.title_id = t.id AND g.slug = ",
        );
        builder.push_bind(genre.clone());
        builder.push(")");
    }
    if let Some(name) = &filter.name {
        builder.push(" AND t.name ILIKE ");
        builder.push_bind(contains_pattern(name));
        builder.push(" ESCAPE '\\'");
    }
    if let Some(year) = filter.year {
        builder.push(" AND t.year = ");
        builder.push_bind(year);
    }
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a `PgPool`.
/// Queries are built at runtime; the schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolves category and genres for a page of title rows in two queries.
    async fn enrich_titles(&self, rows: Vec<TitleRow>) -> AppResult<Vec<Title>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let title_ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let category_ids: Vec<i64> = rows.iter().filter_map(|row| row.category_id).collect();

        let categories: HashMap<i64, Term> =
            sqlx::query_as::<_, Term>("SELECT id, name, slug FROM categories WHERE id = ANY($1)")
                .bind(&category_ids[..])
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|term| (term.id, term))
                .collect();

        let genre_rows = sqlx::query_as::<_, (i64, i64, String, String)>(
            r#"
            SELECT gt.title_id, g.id, g.name, g.slug
            FROM genre_title gt
            JOIN genres g ON g.id = gt.genre_id
            WHERE gt.title_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(&title_ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<Term>> = HashMap::new();
        for (title_id, id, name, slug) in genre_rows {
            genres
                .entry(title_id)
                .or_default()
                .push(Term { id, name, slug });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let category = row.category_id.and_then(|id| categories.get(&id).cloned());
                let genre = genres.remove(&row.id).unwrap_or_default();
                Title::from_parts(row, category, genre)
            })
            .collect())
    }

    async fn fetch_title(&self, id: i64) -> AppResult<Title> {
        self.get_title(id)
            .await?
            .ok_or_else(|| ApiError::Internal(format!("title {id} vanished after write")))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<User>, i64)> {
        let pattern = search.map(contains_pattern);
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::text IS NULL OR username ILIKE $1 ESCAPE '\\') \
             ORDER BY username LIMIT $2 OFFSET $3"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(&pattern)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR username ILIKE $1 ESCAPE '\\')",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;
        Ok((users, count))
    }

    async fn create_user(&self, user: User) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.role)
            .bind(&user.bio)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_staff)
            .bind(user.state)
            .bind(user.date_joined)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| user_write_error(e, &user))
    }

    async fn update_user(&self, user: User) -> AppResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET username = $2, email = $3, role = $4, bio = $5, \
             first_name = $6, last_name = $7, is_staff = $8, state = $9 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(user.role)
            .bind(&user.bio)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_staff)
            .bind(user.state)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| user_write_error(e, &user))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let reviewed: Vec<i64> =
            sqlx::query_scalar("SELECT DISTINCT title_id FROM reviews WHERE author_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;
        for title_id in reviewed {
            sqlx::query(REFRESH_RATING)
                .bind(title_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }

    async fn activate_user(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET state = $2 WHERE id = $1")
            .bind(id)
            .bind(AccountState::Active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // --- CONFIRMATION CODES ---

    async fn store_confirmation_code(&self, code: ConfirmationCode) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO confirmation_codes (user_id, code, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
            SET code = EXCLUDED.code, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(code.user_id)
        .bind(&code.code)
        .bind(code.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn take_confirmation_code(&self, user_id: Uuid) -> AppResult<Option<ConfirmationCode>> {
        Ok(sqlx::query_as::<_, ConfirmationCode>(
            "DELETE FROM confirmation_codes WHERE user_id = $1 RETURNING user_id, code, expires_at",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    // --- CATEGORIES & GENRES ---

    async fn list_terms(
        &self,
        kind: Taxonomy,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Term>, i64)> {
        let table = kind.table();
        let sql = format!(
            "SELECT id, name, slug FROM {table} \
             WHERE ($1::text IS NULL OR name = $1) \
             ORDER BY name LIMIT $2 OFFSET $3"
        );
        let terms = sqlx::query_as::<_, Term>(&sql)
            .bind(search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE ($1::text IS NULL OR name = $1)");
        let count: i64 = sqlx::query_scalar(&count_sql)
            .bind(search)
            .fetch_one(&self.pool)
            .await?;
        Ok((terms, count))
    }

    async fn get_term(&self, kind: Taxonomy, slug: &str) -> AppResult<Option<Term>> {
        let sql = format!("SELECT id, name, slug FROM {} WHERE slug = $1", kind.table());
        Ok(sqlx::query_as::<_, Term>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_term(&self, kind: Taxonomy, term: TermRequest) -> AppResult<Term> {
        let sql = format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            kind.table()
        );
        sqlx::query_as::<_, Term>(&sql)
            .bind(&term.name)
            .bind(&term.slug)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| term_write_error(e, kind))
    }

    async fn update_term(
        &self,
        kind: Taxonomy,
        slug: &str,
        term: TermRequest,
    ) -> AppResult<Option<Term>> {
        let sql = format!(
            "UPDATE {} SET name = $2, slug = $3 WHERE slug = $1 RETURNING id, name, slug",
            kind.table()
        );
        sqlx::query_as::<_, Term>(&sql)
            .bind(slug)
            .bind(&term.name)
            .bind(&term.slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| term_write_error(e, kind))
    }

    async fn delete_term(&self, kind: Taxonomy, slug: &str) -> AppResult<bool> {
        // FK actions take care of titles.category_id (SET NULL) and genre_title (CASCADE).
        let sql = format!("DELETE FROM {} WHERE slug = $1", kind.table());
        let result = sqlx::query(&sql).bind(slug).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    // --- TITLES ---

    async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Title>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT t.id, t.name, t.year, t.description, t.category_id, t.rating
            FROM titles t
            LEFT JOIN categories c ON c.id = t.category_id
            WHERE TRUE
            "#,
        );
        push_title_filters(&mut builder, filter);
        builder.push(" ORDER BY t.name, t.id LIMIT ");
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());
        let rows = builder
            .build_query_as::<TitleRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id WHERE TRUE",
        );
        push_title_filters(&mut count_builder, filter);
        let count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        Ok((self.enrich_titles(rows).await?, count))
    }

    async fn get_title(&self, id: i64) -> AppResult<Option<Title>> {
        let row = sqlx::query_as::<_, TitleRow>(
            "SELECT id, name, year, description, category_id, rating FROM titles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(self.enrich_titles(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn create_title(&self, title: NewTitle) -> AppResult<Title> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO titles (name, year, description, category_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&title.name)
        .bind(title.year)
        .bind(&title.description)
        .bind(title.category_id)
        .fetch_one(&mut *tx)
        .await?;
        for genre_id in &title.genre_ids {
            sqlx::query(
                "INSERT INTO genre_title (genre_id, title_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(genre_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        self.fetch_title(id).await
    }

    async fn update_title(&self, id: i64, changes: TitleChanges) -> AppResult<Option<Title>> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE titles
            SET name = COALESCE($2, name),
                year = COALESCE($3, year),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.year)
        .bind(&changes.description)
        .bind(changes.category_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Ok(None);
        }

        if let Some(genre_ids) = &changes.genre_ids {
            sqlx::query("DELETE FROM genre_title WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for genre_id in genre_ids {
                sqlx::query(
                    "INSERT INTO genre_title (genre_id, title_id) VALUES ($1, $2) \
                     ON CONFLICT DO NOTHING",
                )
                .bind(genre_id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;
        self.fetch_title(id).await.map(Some)
    }

    async fn delete_title(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- REVIEWS ---

    async fn list_reviews(
        &self,
        title_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Review>, i64)> {
        let sql =
            format!("{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date, r.id LIMIT $2 OFFSET $3");
        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((reviews, count))
    }

    async fn get_review(&self, title_id: i64, review_id: i64) -> AppResult<Option<Review>> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = $1 AND r.title_id = $2");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(review_id)
            .bind(title_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn review_exists(&self, title_id: i64, author_id: Uuid) -> AppResult<bool> {
        Ok(sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?)
    }

    /// create_review
    ///
    /// The `reviews_title_author_key` constraint is the real guard against
    /// duplicate reviews; its violation becomes a validation error.
    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        text: String,
        score: i16,
    ) -> AppResult<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (title_id, author_id, text, score)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT i.id, i.title_id, i.author_id, u.username AS author, i.text, i.score, i.pub_date
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(title_id)
        .bind(author_id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if unique_constraint(&e).is_some() {
                duplicate_review()
            } else if is_foreign_key_violation(&e) {
                ApiError::NotFound
            } else {
                ApiError::Database(e)
            }
        })
    }

    async fn update_review(
        &self,
        review_id: i64,
        text: Option<String>,
        score: Option<i16>,
    ) -> AppResult<Option<Review>> {
        // pub_date is fixed at insert.
        Ok(sqlx::query_as::<_, Review>(
            r#"
            WITH updated AS (
                UPDATE reviews
                SET text = COALESCE($2, text), score = COALESCE($3, score)
                WHERE id = $1
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT d.id, d.title_id, d.author_id, u.username AS author, d.text, d.score, d.pub_date
            FROM updated d
            JOIN users u ON u.id = d.author_id
            "#,
        )
        .bind(review_id)
        .bind(text)
        .bind(score)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_review(&self, review_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn refresh_title_rating(&self, title_id: i64) -> AppResult<Option<f64>> {
        let rating = sqlx::query_scalar::<_, Option<f64>>(REFRESH_RATING)
            .bind(title_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(rating.flatten())
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        review_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Comment>, i64)> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date, c.id LIMIT $2 OFFSET $3"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((comments, count))
    }

    async fn get_comment(&self, review_id: i64, comment_id: i64) -> AppResult<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = $1 AND c.review_id = $2");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(comment_id)
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (review_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT i.id, i.review_id, i.author_id, u.username AS author, i.text, i.pub_date
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(review_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::NotFound
            } else {
                ApiError::Database(e)
            }
        })
    }

    async fn update_comment(&self, comment_id: i64, text: String) -> AppResult<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $2 WHERE id = $1
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT d.id, d.review_id, d.author_id, u.username AS author, d.text, d.pub_date
            FROM updated d
            JOIN users u ON u.id = d.author_id
            "#,
        )
        .bind(comment_id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_comment(&self, comment_id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn contains_pattern_escapes_like_wildcards() {
        assert_eq!(contains_pattern("solaris"), "%solaris%");
        assert_eq!(contains_pattern("%"), "%\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("c:\\x"), "%c:\\\\x%");
    }
}
