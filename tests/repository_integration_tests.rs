//! PostgresRepository against a live database.
//!
//! Runs only when `TEST_DATABASE_URL` is set; otherwise each test returns
//! early. Names are suffixed with a random tag so runs do not collide.

use sqlx::PgPool;
use uuid::Uuid;
use yamdb_api::{
    ApiError,
    models::{AccountState, ConfirmationCode, PageRequest, Taxonomy, TermRequest, TitleFilter, User},
    repository::{NewTitle, PostgresRepository, Repository, TitleChanges},
};

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
    tag: String,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();
        let Ok(db_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping Postgres test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext {
            pool,
            tag: Uuid::new_v4().simple().to_string()[..10].to_string(),
        })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }

    fn name(&self, base: &str) -> String {
        format!("{base}_{}", self.tag)
    }

    async fn user(&self, repo: &PostgresRepository, base: &str) -> User {
        let username = self.name(base);
        let email = format!("{username}@example.com");
        repo.create_user(User::new(username, email)).await.unwrap()
    }

    async fn title(&self, repo: &PostgresRepository) -> i64 {
        repo.create_title(NewTitle {
            name: self.name("Solaris"),
            year: 1972,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
    }
}

fn first_page() -> PageRequest {
    PageRequest { page: 1, size: 10 }
}

// --- Tests ---

#[tokio::test]
async fn test_user_uniqueness_maps_to_conflict() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let user = ctx.user(&repo, "alice").await;

    let clash = User::new(user.username.clone(), ctx.name("other") + "@example.com");
    match repo.create_user(clash).await.unwrap_err() {
        ApiError::Conflict(fields) => assert_eq!(fields[0].0, "username"),
        other => panic!("expected conflict, got {other:?}"),
    }

    let clash = User::new(ctx.name("bob"), user.email.clone());
    match repo.create_user(clash).await.unwrap_err() {
        ApiError::Conflict(fields) => assert_eq!(fields[0].0, "email"),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_confirmation_code_is_taken_once() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let user = ctx.user(&repo, "carol").await;

    let code = ConfirmationCode {
        user_id: user.id,
        code: "FIRSTCODE".into(),
        expires_at: chrono::Utc::now() + chrono::Duration::minutes(5),
    };
    repo.store_confirmation_code(code.clone()).await.unwrap();
    repo.store_confirmation_code(ConfirmationCode {
        code: "SECONDCODE".into(),
        ..code
    })
    .await
    .unwrap();

    let taken = repo.take_confirmation_code(user.id).await.unwrap().unwrap();
    assert_eq!(taken.code, "SECONDCODE");
    assert!(repo.take_confirmation_code(user.id).await.unwrap().is_none());

    repo.activate_user(user.id).await.unwrap();
    let user = repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(user.state, AccountState::Active);
}

#[tokio::test]
async fn test_duplicate_review_is_a_validation_error() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let author = ctx.user(&repo, "dave").await;
    let title_id = ctx.title(&repo).await;

    repo.create_review(title_id, author.id, "first".into(), 5)
        .await
        .unwrap();
    let err = repo
        .create_review(title_id, author.id, "second".into(), 6)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
}

#[tokio::test]
async fn test_rating_refresh_and_user_delete_cascade() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let eve = ctx.user(&repo, "eve").await;
    let frank = ctx.user(&repo, "frank").await;
    let title_id = ctx.title(&repo).await;

    let review = repo
        .create_review(title_id, eve.id, "meh".into(), 4)
        .await
        .unwrap();
    assert_eq!(review.author, eve.username);
    repo.create_review(title_id, frank.id, "good".into(), 8)
        .await
        .unwrap();
    assert_eq!(repo.refresh_title_rating(title_id).await.unwrap(), Some(6.0));

    repo.create_comment(review.id, frank.id, "disagree".into())
        .await
        .unwrap();
    assert!(repo.delete_user(eve.id).await.unwrap());

    let title = repo.get_title(title_id).await.unwrap().unwrap();
    assert_eq!(title.rating, Some(8.0));
    let (comments, count) = repo.list_comments(review.id, first_page()).await.unwrap();
    assert!(comments.is_empty());
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_title_filters_and_genre_replacement() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let category = repo
        .create_term(
            Taxonomy::Category,
            TermRequest {
                name: ctx.name("Film"),
                slug: ctx.name("film"),
            },
        )
        .await
        .unwrap();
    let drama = repo
        .create_term(
            Taxonomy::Genre,
            TermRequest {
                name: ctx.name("Drama"),
                slug: ctx.name("drama"),
            },
        )
        .await
        .unwrap();
    let scifi = repo
        .create_term(
            Taxonomy::Genre,
            TermRequest {
                name: ctx.name("SciFi"),
                slug: ctx.name("scifi"),
            },
        )
        .await
        .unwrap();

    let title = repo
        .create_title(NewTitle {
            name: ctx.name("Stalker"),
            year: 1979,
            description: Some("The Zone".into()),
            category_id: Some(category.id),
            genre_ids: vec![drama.id],
        })
        .await
        .unwrap();
    assert_eq!(title.genre.len(), 1);

    let filter = TitleFilter {
        category: Some(category.slug.clone()),
        name: Some(ctx.tag.to_uppercase()),
        ..Default::default()
    };
    let (titles, count) = repo.list_titles(&filter, first_page()).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(titles[0].id, title.id);

    let updated = repo
        .update_title(
            title.id,
            TitleChanges {
                genre_ids: Some(vec![scifi.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.genre[0].slug, scifi.slug);
    assert_eq!(updated.description.as_deref(), Some("The Zone"));

    assert!(repo.delete_term(Taxonomy::Category, &category.slug).await.unwrap());
    let detached = repo.get_title(title.id).await.unwrap().unwrap();
    assert!(detached.category.is_none());
}

#[tokio::test]
async fn test_term_slug_conflict() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let slug = ctx.name("books");
    repo.create_term(
        Taxonomy::Category,
        TermRequest {
            name: ctx.name("Books"),
            slug: slug.clone(),
        },
    )
    .await
    .unwrap();

    let err = repo
        .create_term(
            Taxonomy::Category,
            TermRequest {
                name: ctx.name("Novels"),
                slug,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation { ref field, .. } if field == "slug"));
}

#[tokio::test]
async fn test_search_wildcards_match_literally() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let literal = ctx.user(&repo, "a_b").await;
    ctx.user(&repo, "axb").await;

    let (users, count) = repo
        .list_users(Some(&literal.username), first_page())
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(users[0].id, literal.id);

    for name in [format!("Cent%{}", ctx.tag), format!("Centx{}", ctx.tag)] {
        repo.create_title(NewTitle {
            name,
            year: 2000,
            ..Default::default()
        })
        .await
        .unwrap();
    }
    let filter = TitleFilter {
        name: Some(format!("t%{}", ctx.tag)),
        ..Default::default()
    };
    let (titles, count) = repo.list_titles(&filter, first_page()).await.unwrap();
    assert_eq!(count, 1);
    assert!(titles[0].name.starts_with("Cent%"));
}
