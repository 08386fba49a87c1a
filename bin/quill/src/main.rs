//! # Quill Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::path::PathBuf;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ql_api::{middleware, AppState, PageCache};
use ql_config::Settings;
use ql_core::error::AppError;
use ql_core::models::Group;
use ql_core::traits::BlogRepo;
use secrecy::ExposeSecret;
use uuid::Uuid;

// Feature-gated imports: each port is filled by the plugin compiled in.
#[cfg(feature = "db-sqlite")]
use ql_db_sqlite::SqliteBlogRepo;

#[cfg(feature = "storage-local")]
use ql_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use ql_auth_simple::SimpleAuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-simple")))]
compile_error!("quill needs a repository, a media store and an auth provider plugin");

const GROUP_TITLE_MAX_LEN: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "A small blogging site")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (the default)
    Serve,
    /// Create a group posts can be filed under
    CreateGroup {
        /// URL slug, e.g. `rust` for /group/rust/
        #[arg(long)]
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let settings = Settings::load().context("load settings")?;

    let repo = SqliteBlogRepo::connect(&settings.database.url, settings.database.max_connections)
        .await
        .context("open database")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings, repo).await,
        Command::CreateGroup {
            slug,
            title,
            description,
        } => create_group(&repo, slug, title, description).await,
    }
}

async fn serve(settings: Settings, repo: SqliteBlogRepo) -> anyhow::Result<()> {
    let media_root = PathBuf::from(&settings.media.root);
    tokio::fs::create_dir_all(&media_root)
        .await
        .with_context(|| format!("create media root {}", media_root.display()))?;

    let store = LocalMediaStore::new(media_root.clone(), settings.media.url_prefix.clone());
    let auth = SimpleAuthProvider::new(settings.auth.secret.expose_secret());

    // Ports are held as trait objects
    let state = web::Data::new(AppState {
        repo: Box::new(repo),
        store: Box::new(store),
        auth: Box::new(auth),
        cache: PageCache::new(Duration::from_secs(settings.cache.index_ttl_secs)),
        feed: settings.feed,
        session_ttl: chrono::Duration::hours(settings.auth.session_ttl_hours),
    });

    let media_prefix = settings.media.url_prefix.trim_end_matches('/').to_string();
    let (host, port) = settings.bind_address();
    log::info!("Quill starting on http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::error_pages())
            .wrap(middleware::security_headers())
            .wrap(middleware::standard_middleware())
            .service(actix_files::Files::new(&media_prefix, &media_root))
            .configure(ql_api::configure_routes)
            .default_service(ql_api::not_found_service())
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("bind {host}:{port}"))?
    .run()
    .await
    .context("server stopped with an error")
}

async fn create_group(
    repo: &dyn BlogRepo,
    slug: String,
    title: String,
    description: String,
) -> anyhow::Result<()> {
    let slug_ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !slug_ok {
        bail!("slug {slug:?} may only contain letters, digits, '-' and '_'");
    }
    if title.trim().is_empty() || title.chars().count() > GROUP_TITLE_MAX_LEN {
        bail!("title must be 1 to {GROUP_TITLE_MAX_LEN} characters");
    }

    let group = Group {
        id: Uuid::now_v7(),
        title,
        slug: slug.clone(),
        description,
    };
    match repo.create_group(group).await {
        Ok(()) => {
            log::info!("created group /group/{slug}/");
            Ok(())
        }
        Err(err) if matches!(err.downcast_ref::<AppError>(), Some(AppError::Conflict(_))) => {
            bail!("a group with slug {slug:?} already exists")
        }
        Err(err) => Err(err.context("create group")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_core::traits::MockBlogRepo;

    #[tokio::test]
    async fn create_group_rejects_bad_slugs_before_touching_the_database() {
        let mut repo = MockBlogRepo::new();
        repo.expect_create_group().times(0);
        let err = create_group(&repo, "has space".into(), "Title".into(), String::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("slug"));

        let long_title = "t".repeat(GROUP_TITLE_MAX_LEN + 1);
        assert!(create_group(&repo, "ok".into(), long_title, String::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn create_group_reports_duplicate_slug() {
        let mut repo = MockBlogRepo::new();
        repo.expect_create_group()
            .times(1)
            .returning(|_| Err(AppError::Conflict("slug".into()).into()));
        let err = create_group(&repo, "rust".into(), "Rust".into(), String::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["quill"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["quill", "create-group", "--slug", "rust", "--title", "Rust"]);
        assert!(matches!(cli.command, Some(Command::CreateGroup { .. })));
    }
}
