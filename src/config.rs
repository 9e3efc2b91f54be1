use std::{env, str::FromStr};

/// AppConfig
///
/// The application's entire configuration state, immutable once loaded and
/// shared with handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the dev auth bypass and which
    // infrastructure is mandatory.
    pub env: Env,
    // Postgres connection string. Local runs without one use the in-memory store.
    pub db_url: Option<String>,
    // HS256 secret used to sign and verify access tokens.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub confirmation_code_ttl_minutes: i64,
    // Results per page on every list endpoint.
    pub page_size: u32,
    pub bind_addr: String,
    // SMTP relay; when absent, mail is written to the log instead.
    pub smtp: Option<SmtpConfig>,
    // Sender address of confirmation emails.
    pub mail_from: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Env
///
/// Local enables developer conveniences (console mail, in-memory store,
/// `x-user-id` bypass); Production demands every secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_MAIL_FROM: &str = "noreply@yamdb.local";

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for tests: local env, in-memory storage,
    /// console mail.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            confirmation_code_ttl_minutes: 60,
            page_size: 10,
            bind_addr: "0.0.0.0:3000".to_string(),
            smtp: None,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
        }
    }
}

/// Reads an optional variable and parses it, falling back to `default` when
/// unset. A malformed value aborts startup.
fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {key} has an invalid value: {raw}")),
        Err(_) => default,
    }
}

fn load_smtp() -> Option<SmtpConfig> {
    let host = env::var("SMTP_HOST").ok()?;
    Some(SmtpConfig {
        host,
        port: parsed_var("SMTP_PORT", 587),
        username: env::var("SMTP_USERNAME").ok(),
        password: env::var("SMTP_PASSWORD").ok(),
    })
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and fails fast.
    ///
    /// # Panics
    /// In production, when `DATABASE_URL`, `JWT_SECRET` or `SMTP_HOST` is
    /// missing. In any env, when a numeric variable does not parse.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let token_ttl_hours = parsed_var("TOKEN_TTL_HOURS", 24);
        let confirmation_code_ttl_minutes = parsed_var("CONFIRMATION_CODE_TTL_MINUTES", 60);
        let page_size = parsed_var("PAGE_SIZE", 10);
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let mail_from = env::var("MAIL_FROM").unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL").ok(),
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                token_ttl_hours,
                confirmation_code_ttl_minutes,
                page_size,
                bind_addr,
                smtp: load_smtp(),
                mail_from,
            },
            Env::Production => {
                let db_url =
                    env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod");
                let jwt_secret =
                    env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.");
                let smtp = load_smtp().expect("FATAL: SMTP_HOST required in prod");

                Self {
                    env: Env::Production,
                    db_url: Some(db_url),
                    jwt_secret,
                    token_ttl_hours,
                    confirmation_code_ttl_minutes,
                    page_size,
                    bind_addr,
                    smtp: Some(smtp),
                    mail_from,
                }
            }
        }
    }
}
