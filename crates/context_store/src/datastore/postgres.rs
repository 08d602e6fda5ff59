use anyhow::Context;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::datastore::{ContextStore, MAX_CONTEXT_POSTS};

static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Debug, Clone)]
pub struct PgContextStore {
    pub pool: PgPool,
}

impl PgContextStore {
    /// Establish connection to database and create the context_posts table
    /// if not exists
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgContextStore { pool })
    }
}

/// Handles are stored without the leading `@`
fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

impl ContextStore for PgContextStore {
    async fn get_context_posts(&self, handle: &str, platform: &str) -> anyhow::Result<Vec<String>> {
        #[derive(sqlx::FromRow)]
        struct ContextPost {
            content: String,
        }

        let handle = normalize_handle(handle);
        let posts = sqlx::query_as::<_, ContextPost>(
            r#"
            SELECT content FROM context_posts
            WHERE lower(handle) = $1 AND platform = $2
            ORDER BY posted_at DESC
            LIMIT $3
            "#,
        )
        .bind(&handle)
        .bind(platform)
        .bind(MAX_CONTEXT_POSTS as i64)
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| {
            tracing::error!(error = ?e, %handle, platform, "Failed to fetch context posts");
        })
        .context("Failed to fetch context posts")?;

        Ok(posts.into_iter().map(|p| p.content).collect())
    }
}
