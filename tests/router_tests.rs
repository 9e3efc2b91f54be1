use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use yamdb_api::{
    AppConfig, AppState, MemoryRepository, MockMailer, create_router,
    models::{AccountState, Role, User},
    repository::RepositoryState,
};

// --- Test Setup ---

struct TestRouter {
    router: Router,
    repo: RepositoryState,
}

fn test_router() -> TestRouter {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let state = AppState {
        repo: repo.clone(),
        mailer: Arc::new(MockMailer::new()),
        config: AppConfig::default(),
    };
    TestRouter {
        router: create_router(state),
        repo,
    }
}

async fn seed(app: &TestRouter, username: &str, role: Role) -> User {
    let mut user = User::new(username, format!("{username}@example.com"));
    user.role = role;
    user.state = AccountState::Active;
    app.repo.create_user(user).await.unwrap()
}

fn request(method: Method, uri: &str, as_user: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
        builder = builder.header("x-user-id", user.id.to_string());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestRouter, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// --- Tests ---

#[tokio::test]
async fn test_unknown_title_is_404_with_detail() {
    let app = test_router();
    let (status, body) = send(&app, request(Method::GET, "/api/v1/titles/999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_category_writes_are_admin_only() {
    let app = test_router();
    let admin = seed(&app, "boss", Role::Admin).await;
    let reader = seed(&app, "reader", Role::User).await;
    let payload = json!({ "name": "Film", "slug": "film" });

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/categories", None, Some(payload.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/categories", Some(&reader), Some(payload.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/v1/categories", Some(&admin), Some(payload)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "name": "Film", "slug": "film" }));

    let (status, body) = send(&app, request(Method::GET, "/api/v1/categories", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["next"], Value::Null);
}

#[tokio::test]
async fn test_page_past_the_end_is_404() {
    let app = test_router();
    let (status, _) = send(&app, request(Method::GET, "/api/v1/genres?page=1", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request(Method::GET, "/api/v1/genres?page=2", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_title_filters_over_http() {
    let app = test_router();
    let admin = seed(&app, "boss", Role::Admin).await;

    for (name, slug) in [("Film", "film"), ("Book", "book")] {
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/categories",
                Some(&admin),
                Some(json!({ "name": name, "slug": slug })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/genres",
            Some(&admin),
            Some(json!({ "name": "Drama", "slug": "drama" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let titles = [
        json!({ "name": "Stalker", "year": 1979, "category": "film", "genre": ["drama"] }),
        json!({ "name": "Roadside Picnic", "year": 1972, "category": "book" }),
    ];
    for title in titles {
        let (status, _) = send(
            &app,
            request(Method::POST, "/api/v1/titles", Some(&admin), Some(title)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/titles?category=book", None, None),
    )
    .await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["name"], "Roadside Picnic");

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/v1/titles?genre=drama&name=stalk", None, None),
    )
    .await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["genre"][0]["slug"], "drama");

    let (_, body) = send(&app, request(Method::GET, "/api/v1/titles?year=1980", None, None)).await;
    assert_eq!(body["count"], json!(0));
}

#[tokio::test]
async fn test_moderator_edits_foreign_review_but_user_cannot() {
    let app = test_router();
    let admin = seed(&app, "boss", Role::Admin).await;
    let author = seed(&app, "author", Role::User).await;
    let stranger = seed(&app, "stranger", Role::User).await;
    let moderator = seed(&app, "mod", Role::Moderator).await;

    let (_, title) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/titles",
            Some(&admin),
            Some(json!({ "name": "Solaris", "year": 1972 })),
        ),
    )
    .await;
    let title_id = title["id"].as_i64().unwrap();
    let reviews = format!("/api/v1/titles/{title_id}/reviews");

    let (status, review) = send(
        &app,
        request(
            Method::POST,
            &reviews,
            Some(&author),
            Some(json!({ "text": "Slow.", "score": 3 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let review_uri = format!("{reviews}/{}", review["id"]);

    let (status, _) = send(
        &app,
        request(Method::PATCH, &review_uri, Some(&stranger), Some(json!({ "score": 10 }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(Method::PATCH, &review_uri, Some(&moderator), Some(json!({ "score": 7 }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], json!(7));
    assert_eq!(body["author"], "author");

    let (_, title) = send(
        &app,
        request(Method::GET, &format!("/api/v1/titles/{title_id}"), None, None),
    )
    .await;
    assert_eq!(title["rating"], json!(7.0));
}

#[tokio::test]
async fn test_signup_validation_errors_are_field_keyed() {
    let app = test_router();
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({ "username": "me", "email": "me@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_array());
}

#[tokio::test]
async fn test_denied_caller_gets_403_even_with_a_malformed_body() {
    let app = test_router();
    let reader = seed(&app, "reader", Role::User).await;
    let admin = seed(&app, "boss", Role::Admin).await;

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/titles", Some(&reader), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/categories", Some(&reader), Some(json!({ "name": 5 }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/users", Some(&reader), Some(json!([]))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Past the gate the same body is a field-keyed 400.
    let (status, body) = send(
        &app,
        request(Method::POST, "/api/v1/categories", Some(&admin), Some(json!({ "name": 5 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn test_stranger_patching_a_review_with_a_bad_body_gets_403() {
    let app = test_router();
    let admin = seed(&app, "boss", Role::Admin).await;
    let author = seed(&app, "author", Role::User).await;
    let stranger = seed(&app, "stranger", Role::User).await;

    let (_, title) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/titles",
            Some(&admin),
            Some(json!({ "name": "Solaris", "year": 1972 })),
        ),
    )
    .await;
    let reviews = format!("/api/v1/titles/{}/reviews", title["id"]);
    let (_, review) = send(
        &app,
        request(
            Method::POST,
            &reviews,
            Some(&author),
            Some(json!({ "text": "Slow.", "score": 3 })),
        ),
    )
    .await;

    let (status, _) = send(
        &app,
        request(
            Method::PATCH,
            &format!("{reviews}/{}", review["id"]),
            Some(&stranger),
            Some(json!({ "score": "ten" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
