use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use yamdb_api::{
    AppConfig, AppState, MemoryRepository, MockMailer, create_router,
    models::{AccountState, Role, User},
    repository::RepositoryState,
};

pub struct TestApp {
    pub address: String,
    pub repo: RepositoryState,
    pub mailer: MockMailer,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    /// Full signup + token exchange through HTTP. Returns the bearer token.
    async fn register(&self, client: &reqwest::Client, username: &str) -> String {
        let email = format!("{username}@example.com");
        let response = client
            .post(self.url("/auth/signup"))
            .json(&json!({ "username": username, "email": email }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);

        let code = self.mailer.last_code_for(&email).expect("code mailed");
        let response = client
            .post(self.url("/auth/token"))
            .json(&json!({ "username": username, "confirmation_code": code }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let mailer = MockMailer::new();

    let state = AppState {
        repo: repo.clone(),
        mailer: Arc::new(mailer.clone()),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        mailer,
    }
}

async fn seed_admin(app: &TestApp) -> User {
    let mut admin = User::new("boss", "boss@example.com");
    admin.role = Role::Admin;
    admin.state = AccountState::Active;
    app.repo.create_user(admin).await.unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let body: Value = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert!(body["paths"]["/api/v1/titles"].is_object());
}

#[tokio::test]
async fn test_anonymous_write_is_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(app.url("/titles"))
        .json(&json!({ "name": "Solaris", "year": 1972 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(app.url("/titles"))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_review_lifecycle_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = seed_admin(&app).await;

    // 1. Admin creates the catalog entry (local bypass header).
    let response = client
        .post(app.url("/titles"))
        .header("x-user-id", admin.id.to_string())
        .json(&json!({ "name": "Solaris", "year": 1972 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);
    let title: Value = response.json().await.unwrap();
    let title_id = title["id"].as_i64().unwrap();
    assert!(title["rating"].is_null());

    // 2. Two readers register and review it.
    let alice = app.register(&client, "alice").await;
    let bob = app.register(&client, "bob").await;
    for (token, score) in [(&alice, 4), (&bob, 8)] {
        let response = client
            .post(app.url(&format!("/titles/{title_id}/reviews")))
            .bearer_auth(token)
            .json(&json!({ "text": "Thoughts.", "score": score }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // 3. The aggregate rating is visible on the title.
    let title: Value = client
        .get(app.url(&format!("/titles/{title_id}")))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(title["rating"], json!(6.0));

    // 4. A second review by alice is refused.
    let response = client
        .post(app.url(&format!("/titles/{title_id}/reviews")))
        .bearer_auth(&alice)
        .json(&json!({ "text": "Again.", "score": 1 }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // 5. Listing shows both reviews with their authors.
    let page: Value = client
        .get(app.url(&format!("/titles/{title_id}/reviews")))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    assert_eq!(page["count"], json!(2));
    let authors: Vec<&str> = page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|review| review["author"].as_str().unwrap())
        .collect();
    assert!(authors.contains(&"alice") && authors.contains(&"bob"));
}

#[tokio::test]
async fn test_users_me_roundtrip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let token = app.register(&client, "alice").await;

    let response = client
        .patch(app.url("/users/me"))
        .bearer_auth(&token)
        .json(&json!({ "first_name": "Alice", "role": "admin" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["first_name"], "Alice");
    assert_eq!(profile["role"], "user");

    // Plain users cannot reach user management.
    let response = client
        .get(app.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(app.url("/users/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
