//! Bulk import of the YaMDb CSV fixtures.
//!
//! Files are read in dependency order and every row goes through the
//! `Repository` trait, so the same uniqueness and cascade rules apply as for
//! API writes. Fixture files carry their own integer ids; those are mapped to
//! the ids storage assigns. A bad row is logged and skipped, a missing file
//! skips its whole entity.

use serde::{Deserialize, de::DeserializeOwned};
use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    path::Path,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{AccountState, Role, Taxonomy, TermRequest, User},
    repository::{NewTitle, RepositoryState, TitleChanges},
    validators::{ValidationError, validate_email, validate_score, validate_username, validate_year},
};

pub const USERS_FILE: &str = "users.csv";
pub const CATEGORY_FILE: &str = "category.csv";
pub const GENRE_FILE: &str = "genre.csv";
pub const TITLES_FILE: &str = "titles.csv";
pub const GENRE_TITLE_FILE: &str = "genre_title.csv";
pub const REVIEW_FILE: &str = "review.csv";
pub const COMMENTS_FILE: &str = "comments.csv";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("cannot open {file}: {source}")]
    Open {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("malformed row: {0}")]
    Row(#[from] csv::Error),

    #[error("{0}")]
    Invalid(#[from] ValidationError),

    #[error("unknown {entity} id {id}")]
    MissingReference { entity: &'static str, id: i64 },

    #[error("rejected by storage: {0}")]
    Rejected(#[from] ApiError),
}

/// Outcome of one fixture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    pub file: &'static str,
    pub imported: usize,
    pub skipped: usize,
}

impl EntityReport {
    fn new(file: &'static str) -> Self {
        Self {
            file,
            imported: 0,
            skipped: 0,
        }
    }

    fn record(&mut self, line: usize, outcome: Result<(), ImportError>) {
        match outcome {
            Ok(()) => self.imported += 1,
            Err(e) => {
                self.skipped += 1;
                tracing::warn!(file = self.file, line, "row skipped: {}", e);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub entities: Vec<EntityReport>,
}

impl ImportReport {
    pub fn get(&self, file: &str) -> Option<&EntityReport> {
        self.entities.iter().find(|entity| entity.file == file)
    }
}

// --- Row shapes ---

#[derive(Debug, Deserialize)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    #[serde(default)]
    role: Option<Role>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TermRow {
    id: i64,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TitleCsvRow {
    id: i64,
    name: String,
    year: i32,
    #[serde(default)]
    category: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreTitleRow {
    title_id: i64,
    genre_id: i64,
}

#[derive(Debug, Deserialize)]
struct ReviewRow {
    id: i64,
    title_id: i64,
    text: String,
    author: i64,
    score: i16,
}

#[derive(Debug, Deserialize)]
struct CommentRow {
    review_id: i64,
    text: String,
    author: i64,
}

fn lookup<V: Copy>(map: &HashMap<i64, V>, entity: &'static str, id: i64) -> Result<V, ImportError> {
    map.get(&id)
        .copied()
        .ok_or(ImportError::MissingReference { entity, id })
}

/// Importer
///
/// Holds the fixture-id to storage-id maps while the files are processed.
pub struct Importer {
    repo: RepositoryState,
    users: HashMap<i64, Uuid>,
    categories: HashMap<i64, i64>,
    genres: HashMap<i64, i64>,
    titles: HashMap<i64, i64>,
    reviews: HashMap<i64, i64>,
    report: ImportReport,
}

impl Importer {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            repo,
            users: HashMap::new(),
            categories: HashMap::new(),
            genres: HashMap::new(),
            titles: HashMap::new(),
            reviews: HashMap::new(),
            report: ImportReport::default(),
        }
    }

    /// run
    ///
    /// Imports every fixture file found in `dir`, in dependency order.
    pub async fn run(mut self, dir: &Path) -> ImportReport {
        self.load_users(dir).await;
        self.load_terms(dir, Taxonomy::Category, CATEGORY_FILE).await;
        self.load_terms(dir, Taxonomy::Genre, GENRE_FILE).await;
        self.load_titles(dir).await;
        self.load_genre_titles(dir).await;
        self.load_reviews(dir).await;
        self.load_comments(dir).await;
        self.report
    }

    /// Reads a whole file up front. `None` when it cannot be opened.
    fn rows<T: DeserializeOwned>(
        &self,
        dir: &Path,
        file: &'static str,
    ) -> Option<Vec<(usize, Result<T, csv::Error>)>> {
        let reader = File::open(dir.join(file))
            .map_err(csv::Error::from)
            .map(csv::Reader::from_reader);
        match reader {
            Ok(mut reader) => Some(
                reader
                    .deserialize::<T>()
                    .enumerate()
                    // Line 1 is the header.
                    .map(|(index, row)| (index + 2, row))
                    .collect(),
            ),
            Err(source) => {
                tracing::error!("{}", ImportError::Open { file, source });
                None
            }
        }
    }

    fn finish(&mut self, tally: EntityReport) {
        tracing::info!(
            file = tally.file,
            imported = tally.imported,
            skipped = tally.skipped,
            "fixture loaded"
        );
        self.report.entities.push(tally);
    }

    async fn load_users(&mut self, dir: &Path) {
        let Some(rows) = self.rows::<UserRow>(dir, USERS_FILE) else {
            return;
        };
        let mut tally = EntityReport::new(USERS_FILE);
        for (line, row) in rows {
            let outcome = match row {
                Ok(row) => self.insert_user(row).await,
                Err(e) => Err(e.into()),
            };
            tally.record(line, outcome);
        }
        self.finish(tally);
    }

    async fn insert_user(&mut self, row: UserRow) -> Result<(), ImportError> {
        validate_username(&row.username)?;
        validate_email(&row.email)?;
        let mut user = User::new(row.username, row.email);
        user.role = row.role.unwrap_or_default();
        user.bio = row.bio.unwrap_or_default();
        user.first_name = row.first_name.unwrap_or_default();
        user.last_name = row.last_name.unwrap_or_default();
        user.state = AccountState::Active;

        let created = self.repo.create_user(user).await?;
        self.users.insert(row.id, created.id);
        Ok(())
    }

    async fn load_terms(&mut self, dir: &Path, kind: Taxonomy, file: &'static str) {
        let Some(rows) = self.rows::<TermRow>(dir, file) else {
            return;
        };
        let mut tally = EntityReport::new(file);
        for (line, row) in rows {
            let outcome = match row {
                Ok(row) => self.insert_term(kind, row).await,
                Err(e) => Err(e.into()),
            };
            tally.record(line, outcome);
        }
        self.finish(tally);
    }

    async fn insert_term(&mut self, kind: Taxonomy, row: TermRow) -> Result<(), ImportError> {
        let term = self
            .repo
            .create_term(
                kind,
                TermRequest {
                    name: row.name,
                    slug: row.slug,
                },
            )
            .await?;
        let ids = match kind {
            Taxonomy::Category => &mut self.categories,
            Taxonomy::Genre => &mut self.genres,
        };
        ids.insert(row.id, term.id);
        Ok(())
    }

    async fn load_titles(&mut self, dir: &Path) {
        let Some(rows) = self.rows::<TitleCsvRow>(dir, TITLES_FILE) else {
            return;
        };
        let mut tally = EntityReport::new(TITLES_FILE);
        for (line, row) in rows {
            let outcome = match row {
                Ok(row) => self.insert_title(row).await,
                Err(e) => Err(e.into()),
            };
            tally.record(line, outcome);
        }
        self.finish(tally);
    }

    async fn insert_title(&mut self, row: TitleCsvRow) -> Result<(), ImportError> {
        let year = validate_year(row.year)?;
        let category_id = row
            .category
            .map(|id| lookup(&self.categories, "category", id))
            .transpose()?;
        let title = self
            .repo
            .create_title(NewTitle {
                name: row.name,
                year,
                description: row.description.filter(|d| !d.is_empty()),
                category_id,
                genre_ids: vec![],
            })
            .await?;
        self.titles.insert(row.id, title.id);
        Ok(())
    }

    /// Associations are grouped per title and written with one update each.
    async fn load_genre_titles(&mut self, dir: &Path) {
        let Some(rows) = self.rows::<GenreTitleRow>(dir, GENRE_TITLE_FILE) else {
            return;
        };
        let mut tally = EntityReport::new(GENRE_TITLE_FILE);
        let mut per_title: HashMap<i64, Vec<i64>> = HashMap::new();
        for (line, row) in rows {
            let outcome = row.map_err(ImportError::from).and_then(|row| {
                let title_id = lookup(&self.titles, "title", row.title_id)?;
                let genre_id = lookup(&self.genres, "genre", row.genre_id)?;
                per_title.entry(title_id).or_default().push(genre_id);
                Ok(())
            });
            tally.record(line, outcome);
        }

        for (title_id, genre_ids) in per_title {
            let changes = TitleChanges {
                genre_ids: Some(genre_ids),
                ..Default::default()
            };
            if let Err(e) = self.repo.update_title(title_id, changes).await {
                tracing::error!(title_id, "genre associations not written: {}", e);
            }
        }
        self.finish(tally);
    }

    async fn load_reviews(&mut self, dir: &Path) {
        let Some(rows) = self.rows::<ReviewRow>(dir, REVIEW_FILE) else {
            return;
        };
        let mut tally = EntityReport::new(REVIEW_FILE);
        let mut reviewed = BTreeSet::new();
        for (line, row) in rows {
            let outcome = match row {
                Ok(row) => self.insert_review(row, &mut reviewed).await,
                Err(e) => Err(e.into()),
            };
            tally.record(line, outcome);
        }

        for title_id in reviewed {
            if let Err(e) = self.repo.refresh_title_rating(title_id).await {
                tracing::error!(title_id, "rating not refreshed: {}", e);
            }
        }
        self.finish(tally);
    }

    async fn insert_review(
        &mut self,
        row: ReviewRow,
        reviewed: &mut BTreeSet<i64>,
    ) -> Result<(), ImportError> {
        let title_id = lookup(&self.titles, "title", row.title_id)?;
        let author_id = lookup(&self.users, "user", row.author)?;
        let score = validate_score(row.score)?;
        let review = self
            .repo
            .create_review(title_id, author_id, row.text, score)
            .await?;
        self.reviews.insert(row.id, review.id);
        reviewed.insert(title_id);
        Ok(())
    }

    async fn load_comments(&mut self, dir: &Path) {
        let Some(rows) = self.rows::<CommentRow>(dir, COMMENTS_FILE) else {
            return;
        };
        let mut tally = EntityReport::new(COMMENTS_FILE);
        for (line, row) in rows {
            let outcome = match row {
                Ok(row) => self.insert_comment(row).await,
                Err(e) => Err(e.into()),
            };
            tally.record(line, outcome);
        }
        self.finish(tally);
    }

    async fn insert_comment(&mut self, row: CommentRow) -> Result<(), ImportError> {
        let review_id = lookup(&self.reviews, "review", row.review_id)?;
        let author_id = lookup(&self.users, "user", row.author)?;
        self.repo
            .create_comment(review_id, author_id, row.text)
            .await?;
        Ok(())
    }
}
