use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod handlers;
pub mod import;
pub mod mailer;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod validators;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, AppResult};
pub use mailer::{ConsoleMailer, MailerState, MockMailer, SmtpMailer};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// Prefix shared by every API route.
pub const API_PREFIX: &str = "/api/v1";

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and wire schema into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::signup, handlers::auth::obtain_token,
        handlers::terms::list_categories, handlers::terms::get_category,
        handlers::terms::create_category, handlers::terms::update_category,
        handlers::terms::delete_category,
        handlers::terms::list_genres, handlers::terms::get_genre,
        handlers::terms::create_genre, handlers::terms::update_genre,
        handlers::terms::delete_genre,
        handlers::titles::list_titles, handlers::titles::get_title,
        handlers::titles::create_title, handlers::titles::update_title,
        handlers::titles::delete_title,
        handlers::reviews::list_reviews, handlers::reviews::get_review,
        handlers::reviews::create_review, handlers::reviews::update_review,
        handlers::reviews::delete_review,
        handlers::comments::list_comments, handlers::comments::get_comment,
        handlers::comments::create_comment, handlers::comments::update_comment,
        handlers::comments::delete_comment,
        handlers::users::list_users, handlers::users::create_user,
        handlers::users::get_user, handlers::users::update_user,
        handlers::users::delete_user, handlers::users::get_me, handlers::users::update_me,
    ),
    components(
        schemas(
            models::Role, models::Term, models::Title, models::Review, models::Comment,
            models::SignupRequest, models::TokenRequest, models::TokenResponse,
            models::TermRequest, models::CreateTitleRequest, models::UpdateTitleRequest,
            models::CreateReviewRequest, models::UpdateReviewRequest, models::CommentRequest,
            models::UpdateCommentRequest, models::CreateUserRequest, models::UpdateUserRequest,
            models::UserProfile,
        )
    ),
    tags(
        (name = "auth", description = "Signup and token exchange"),
        (name = "catalog", description = "Titles, categories and genres"),
        (name = "reviews", description = "Reviews and comments"),
        (name = "users", description = "Accounts and profiles")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container of application services. Cloning is cheap:
/// the repository and mailer are reference counted, the config is small.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory for tests and local runs.
    pub repo: RepositoryState,
    /// Outbound mail for confirmation codes.
    pub mailer: MailerState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 unless `AuthUser` can be extracted from it.
/// Handlers behind it extract `AuthUser` again for the identity itself.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, scoped middleware and the observability stack.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly
    // Public and protected routers share paths (GET vs. POST on `/titles`);
    // merging combines their method routers per path.
    let protected = authenticated::authenticated_routes().merge(admin::admin_routes());
    let api = Router::new()
        .merge(public::public_routes())
        .merge(protected.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        )));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health))
        .nest(API_PREFIX, api)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the `x-request-id` set by
/// `SetRequestIdLayer`, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
