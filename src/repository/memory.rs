use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{
    NewTitle, Repository, TitleChanges, duplicate_review, email_taken, term_taken, username_taken,
};
use crate::{
    error::{ApiError, AppResult},
    models::{
        AccountState, Comment, ConfirmationCode, PageRequest, Review, Taxonomy, Term, TermRequest,
        Title, TitleFilter, TitleRow, User, aggregate_rating,
    },
};

#[derive(Debug, Clone)]
struct ReviewRecord {
    id: i64,
    title_id: i64,
    author_id: Uuid,
    text: String,
    score: i16,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRecord {
    id: i64,
    review_id: i64,
    author_id: Uuid,
    text: String,
    pub_date: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    codes: HashMap<Uuid, ConfirmationCode>,
    categories: BTreeMap<i64, Term>,
    genres: BTreeMap<i64, Term>,
    titles: BTreeMap<i64, TitleRow>,
    // (genre_id, title_id)
    genre_title: Vec<(i64, i64)>,
    reviews: BTreeMap<i64, ReviewRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    next_id: i64,
}

/// Slices one page out of an already ordered result set.
fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let count = items.len() as i64;
    let window = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (window, count)
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn terms(&self, kind: Taxonomy) -> &BTreeMap<i64, Term> {
        match kind {
            Taxonomy::Category => &self.categories,
            Taxonomy::Genre => &self.genres,
        }
    }

    fn terms_mut(&mut self, kind: Taxonomy) -> &mut BTreeMap<i64, Term> {
        match kind {
            Taxonomy::Category => &mut self.categories,
            Taxonomy::Genre => &mut self.genres,
        }
    }

    fn username_of(&self, id: Uuid) -> String {
        self.users
            .get(&id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    /// Every field of `user` that collides with an account other than itself.
    fn user_conflicts(&self, user: &User) -> Vec<(&'static str, String)> {
        let mut conflicts = Vec::new();
        let others = || self.users.values().filter(move |other| other.id != user.id);
        if others().any(|other| other.username == user.username) {
            conflicts.push(username_taken(&user.username));
        }
        if others().any(|other| other.email == user.email) {
            conflicts.push(email_taken(&user.email));
        }
        conflicts
    }

    fn term_conflict(&self, kind: Taxonomy, term: &TermRequest, own_id: Option<i64>) -> AppResult<()> {
        let others = || {
            self.terms(kind)
                .values()
                .filter(move |existing| Some(existing.id) != own_id)
        };
        if others().any(|existing| existing.name == term.name) {
            return Err(term_taken(kind, "name"));
        }
        if others().any(|existing| existing.slug == term.slug) {
            return Err(term_taken(kind, "slug"));
        }
        Ok(())
    }

    fn title(&self, id: i64) -> Option<Title> {
        let row = self.titles.get(&id)?.clone();
        let category = row
            .category_id
            .and_then(|cid| self.categories.get(&cid).cloned());
        let mut genre: Vec<Term> = self
            .genre_title
            .iter()
            .filter(|(_, title_id)| *title_id == id)
            .filter_map(|(genre_id, _)| self.genres.get(genre_id).cloned())
            .collect();
        genre.sort_by(|a, b| a.name.cmp(&b.name));
        Some(Title::from_parts(row, category, genre))
    }

    fn review(&self, record: &ReviewRecord) -> Review {
        Review {
            id: record.id,
            title_id: record.title_id,
            author_id: record.author_id,
            author: self.username_of(record.author_id),
            text: record.text.clone(),
            score: record.score,
            pub_date: record.pub_date,
        }
    }

    fn comment(&self, record: &CommentRecord) -> Comment {
        Comment {
            id: record.id,
            review_id: record.review_id,
            author_id: record.author_id,
            author: self.username_of(record.author_id),
            text: record.text.clone(),
            pub_date: record.pub_date,
        }
    }

    fn refresh_rating(&mut self, title_id: i64) -> Option<f64> {
        let scores: Vec<i16> = self
            .reviews
            .values()
            .filter(|review| review.title_id == title_id)
            .map(|review| review.score)
            .collect();
        let rating = aggregate_rating(&scores);
        if let Some(row) = self.titles.get_mut(&title_id) {
            row.rating = rating;
        }
        rating
    }

    fn set_genres(&mut self, title_id: i64, genre_ids: &[i64]) {
        self.genre_title.retain(|(_, tid)| *tid != title_id);
        for genre_id in genre_ids {
            if self.genres.contains_key(genre_id)
                && !self.genre_title.contains(&(*genre_id, title_id))
            {
                self.genre_title.push((*genre_id, title_id));
            }
        }
    }

    fn remove_review(&mut self, review_id: i64) -> Option<ReviewRecord> {
        let record = self.reviews.remove(&review_id)?;
        self.comments.retain(|_, comment| comment.review_id != review_id);
        Some(record)
    }
}

/// MemoryRepository
///
/// A `Repository` held entirely in process memory behind one mutex. Every
/// operation runs under the lock, so uniqueness checks and writes are atomic
/// with respect to each other. Mirrors the cascade rules of the SQL schema.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_users(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<User>, i64)> {
        let needle = search.map(str::to_lowercase);
        let mut users: Vec<User> = self
            .lock()
            .users
            .values()
            .filter(|user| match &needle {
                Some(needle) => user.username.to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(paginate(users, page))
    }

    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut store = self.lock();
        let conflicts = store.user_conflicts(&user);
        if !conflicts.is_empty() {
            return Err(ApiError::Conflict(conflicts));
        }
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AppResult<Option<User>> {
        let mut store = self.lock();
        if !store.users.contains_key(&user.id) {
            return Ok(None);
        }
        let conflicts = store.user_conflicts(&user);
        if !conflicts.is_empty() {
            return Err(ApiError::Conflict(conflicts));
        }
        store.users.insert(user.id, user.clone());
        Ok(Some(user))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut store = self.lock();
        if store.users.remove(&id).is_none() {
            return Ok(false);
        }
        store.codes.remove(&id);
        store.comments.retain(|_, comment| comment.author_id != id);

        let authored: Vec<(i64, i64)> = store
            .reviews
            .values()
            .filter(|review| review.author_id == id)
            .map(|review| (review.id, review.title_id))
            .collect();
        for (review_id, _) in &authored {
            store.remove_review(*review_id);
        }
        for (_, title_id) in authored {
            store.refresh_rating(title_id);
        }
        Ok(true)
    }

    async fn activate_user(&self, id: Uuid) -> AppResult<()> {
        if let Some(user) = self.lock().users.get_mut(&id) {
            user.state = AccountState::Active;
        }
        Ok(())
    }

    // --- CONFIRMATION CODES ---

    async fn store_confirmation_code(&self, code: ConfirmationCode) -> AppResult<()> {
        self.lock().codes.insert(code.user_id, code);
        Ok(())
    }

    async fn take_confirmation_code(&self, user_id: Uuid) -> AppResult<Option<ConfirmationCode>> {
        Ok(self.lock().codes.remove(&user_id))
    }

    // --- CATEGORIES & GENRES ---

    async fn list_terms(
        &self,
        kind: Taxonomy,
        search: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Term>, i64)> {
        let mut terms: Vec<Term> = self
            .lock()
            .terms(kind)
            .values()
            .filter(|term| search.is_none_or(|name| term.name == name))
            .cloned()
            .collect();
        terms.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(terms, page))
    }

    async fn get_term(&self, kind: Taxonomy, slug: &str) -> AppResult<Option<Term>> {
        Ok(self
            .lock()
            .terms(kind)
            .values()
            .find(|term| term.slug == slug)
            .cloned())
    }

    async fn create_term(&self, kind: Taxonomy, term: TermRequest) -> AppResult<Term> {
        let mut store = self.lock();
        store.term_conflict(kind, &term, None)?;
        let id = store.next_id();
        let created = Term {
            id,
            name: term.name,
            slug: term.slug,
        };
        store.terms_mut(kind).insert(id, created.clone());
        Ok(created)
    }

    async fn update_term(
        &self,
        kind: Taxonomy,
        slug: &str,
        term: TermRequest,
    ) -> AppResult<Option<Term>> {
        let mut store = self.lock();
        let Some(id) = store
            .terms(kind)
            .values()
            .find(|existing| existing.slug == slug)
            .map(|existing| existing.id)
        else {
            return Ok(None);
        };
        store.term_conflict(kind, &term, Some(id))?;
        let updated = Term {
            id,
            name: term.name,
            slug: term.slug,
        };
        store.terms_mut(kind).insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_term(&self, kind: Taxonomy, slug: &str) -> AppResult<bool> {
        let mut store = self.lock();
        let Some(id) = store
            .terms(kind)
            .values()
            .find(|existing| existing.slug == slug)
            .map(|existing| existing.id)
        else {
            return Ok(false);
        };
        store.terms_mut(kind).remove(&id);
        match kind {
            Taxonomy::Category => {
                for row in store.titles.values_mut() {
                    if row.category_id == Some(id) {
                        row.category_id = None;
                    }
                }
            }
            Taxonomy::Genre => store.genre_title.retain(|(genre_id, _)| *genre_id != id),
        }
        Ok(true)
    }

    // --- TITLES ---

    async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Title>, i64)> {
        let store = self.lock();
        let name = filter.name.as_ref().map(|n| n.to_lowercase());
        let mut titles: Vec<Title> = store
            .titles
            .keys()
            .filter_map(|id| store.title(*id))
            .filter(|title| {
                filter.category.as_ref().is_none_or(|slug| {
                    title.category.as_ref().is_some_and(|c| &c.slug == slug)
                })
            })
            .filter(|title| {
                filter
                    .genre
                    .as_ref()
                    .is_none_or(|slug| title.genre.iter().any(|g| &g.slug == slug))
            })
            .filter(|title| {
                name.as_ref()
                    .is_none_or(|n| title.name.to_lowercase().contains(n.as_str()))
            })
            .filter(|title| filter.year.is_none_or(|year| title.year == year))
            .collect();
        titles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(paginate(titles, page))
    }

    async fn get_title(&self, id: i64) -> AppResult<Option<Title>> {
        Ok(self.lock().title(id))
    }

    async fn create_title(&self, title: NewTitle) -> AppResult<Title> {
        let mut store = self.lock();
        if title
            .category_id
            .is_some_and(|cid| !store.categories.contains_key(&cid))
        {
            return Err(ApiError::NotFound);
        }
        let id = store.next_id();
        store.titles.insert(
            id,
            TitleRow {
                id,
                name: title.name,
                year: title.year,
                description: title.description,
                category_id: title.category_id,
                rating: None,
            },
        );
        store.set_genres(id, &title.genre_ids);
        store
            .title(id)
            .ok_or_else(|| ApiError::Internal(format!("title {id} vanished after write")))
    }

    async fn update_title(&self, id: i64, changes: TitleChanges) -> AppResult<Option<Title>> {
        let mut store = self.lock();
        let Some(row) = store.titles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(year) = changes.year {
            row.year = year;
        }
        if let Some(description) = changes.description {
            row.description = Some(description);
        }
        if let Some(category_id) = changes.category_id {
            row.category_id = Some(category_id);
        }
        if let Some(genre_ids) = changes.genre_ids {
            store.set_genres(id, &genre_ids);
        }
        Ok(store.title(id))
    }

    async fn delete_title(&self, id: i64) -> AppResult<bool> {
        let mut store = self.lock();
        if store.titles.remove(&id).is_none() {
            return Ok(false);
        }
        store.genre_title.retain(|(_, title_id)| *title_id != id);
        let review_ids: Vec<i64> = store
            .reviews
            .values()
            .filter(|review| review.title_id == id)
            .map(|review| review.id)
            .collect();
        for review_id in review_ids {
            store.remove_review(review_id);
        }
        Ok(true)
    }

    // --- REVIEWS ---

    async fn list_reviews(
        &self,
        title_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Review>, i64)> {
        let store = self.lock();
        let mut records: Vec<&ReviewRecord> = store
            .reviews
            .values()
            .filter(|review| review.title_id == title_id)
            .collect();
        records.sort_by(|a, b| a.pub_date.cmp(&b.pub_date).then(a.id.cmp(&b.id)));
        let reviews = records.into_iter().map(|r| store.review(r)).collect();
        Ok(paginate(reviews, page))
    }

    async fn get_review(&self, title_id: i64, review_id: i64) -> AppResult<Option<Review>> {
        let store = self.lock();
        Ok(store
            .reviews
            .get(&review_id)
            .filter(|review| review.title_id == title_id)
            .map(|review| store.review(review)))
    }

    async fn review_exists(&self, title_id: i64, author_id: Uuid) -> AppResult<bool> {
        Ok(self
            .lock()
            .reviews
            .values()
            .any(|review| review.title_id == title_id && review.author_id == author_id))
    }

    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        text: String,
        score: i16,
    ) -> AppResult<Review> {
        let mut store = self.lock();
        if !store.titles.contains_key(&title_id) || !store.users.contains_key(&author_id) {
            return Err(ApiError::NotFound);
        }
        if store
            .reviews
            .values()
            .any(|review| review.title_id == title_id && review.author_id == author_id)
        {
            return Err(duplicate_review());
        }
        let id = store.next_id();
        let record = ReviewRecord {
            id,
            title_id,
            author_id,
            text,
            score,
            pub_date: Utc::now(),
        };
        let review = store.review(&record);
        store.reviews.insert(id, record);
        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: i64,
        text: Option<String>,
        score: Option<i16>,
    ) -> AppResult<Option<Review>> {
        let mut store = self.lock();
        let Some(record) = store.reviews.get_mut(&review_id) else {
            return Ok(None);
        };
        if let Some(text) = text {
            record.text = text;
        }
        if let Some(score) = score {
            record.score = score;
        }
        let record = record.clone();
        Ok(Some(store.review(&record)))
    }

    async fn delete_review(&self, review_id: i64) -> AppResult<bool> {
        Ok(self.lock().remove_review(review_id).is_some())
    }

    async fn refresh_title_rating(&self, title_id: i64) -> AppResult<Option<f64>> {
        Ok(self.lock().refresh_rating(title_id))
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        review_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Comment>, i64)> {
        let store = self.lock();
        let mut records: Vec<&CommentRecord> = store
            .comments
            .values()
            .filter(|comment| comment.review_id == review_id)
            .collect();
        records.sort_by(|a, b| a.pub_date.cmp(&b.pub_date).then(a.id.cmp(&b.id)));
        let comments = records.into_iter().map(|c| store.comment(c)).collect();
        Ok(paginate(comments, page))
    }

    async fn get_comment(&self, review_id: i64, comment_id: i64) -> AppResult<Option<Comment>> {
        let store = self.lock();
        Ok(store
            .comments
            .get(&comment_id)
            .filter(|comment| comment.review_id == review_id)
            .map(|comment| store.comment(comment)))
    }

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment> {
        let mut store = self.lock();
        if !store.reviews.contains_key(&review_id) || !store.users.contains_key(&author_id) {
            return Err(ApiError::NotFound);
        }
        let id = store.next_id();
        let record = CommentRecord {
            id,
            review_id,
            author_id,
            text,
            pub_date: Utc::now(),
        };
        let comment = store.comment(&record);
        store.comments.insert(id, record);
        Ok(comment)
    }

    async fn update_comment(&self, comment_id: i64, text: String) -> AppResult<Option<Comment>> {
        let mut store = self.lock();
        let Some(record) = store.comments.get_mut(&comment_id) else {
            return Ok(None);
        };
        record.text = text;
        let record = record.clone();
        Ok(Some(store.comment(&record)))
    }

    async fn delete_comment(&self, comment_id: i64) -> AppResult<bool> {
        Ok(self.lock().comments.remove(&comment_id).is_some())
    }
}
