use clap::Parser;
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use yamdb_api::{
    import::Importer,
    repository::{MemoryRepository, PostgresRepository, RepositoryState},
};

/// Loads the YaMDb CSV fixtures (users, categories, genres, titles, genre
/// links, reviews, comments) into storage.
#[derive(Parser, Debug)]
#[command(name = "load_csv", version, about)]
struct Args {
    /// Directory holding users.csv, category.csv, genre.csv, titles.csv,
    /// genre_title.csv, review.csv and comments.csv.
    #[arg(long, default_value = "static/data")]
    dir: PathBuf,

    /// Postgres connection string. Falls back to DATABASE_URL; without either
    /// the rows are only validated against a throwaway in-memory store.
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yamdb_api=info,load_csv=info".into()),
        )
        .init();

    let args = Args::parse();
    if !args.dir.is_dir() {
        tracing::error!("{} is not a directory", args.dir.display());
        return ExitCode::FAILURE;
    }

    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok());
    let repo: RepositoryState = match database_url {
        Some(url) => {
            let pool = match sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await
            {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!("cannot connect to Postgres: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                tracing::error!("migrations failed: {}", e);
                return ExitCode::FAILURE;
            }
            Arc::new(PostgresRepository::new(pool))
        }
        None => {
            tracing::warn!("no database configured: dry run against an in-memory store");
            Arc::new(MemoryRepository::new())
        }
    };

    let report = Importer::new(repo).run(&args.dir).await;
    let skipped: usize = report.entities.iter().map(|entity| entity.skipped).sum();
    for entity in &report.entities {
        println!(
            "{:<16} imported {:>6}  skipped {:>6}",
            entity.file, entity.imported, entity.skipped
        );
    }

    if skipped > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
