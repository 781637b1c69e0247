use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::PgPool;
use tracing::{error, info};

use crate::domain::article::Article;
use crate::domain::error::DomainError;

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Articles without a deletion timestamp, ordered by id.
    async fn list_active(&self) -> Result<Vec<Article>, DomainError>;
    /// Soft-deleted rows are returned too.
    async fn find_by_id(&self, id: i64) -> Result<Option<Article>, DomainError>;
    /// Inserts when `article.id` is `None`, otherwise upserts by id.
    async fn save(&self, article: Article) -> Result<Article, DomainError>;
    async fn delete_all(&self) -> Result<u64, DomainError>;
}

#[derive(Clone)]
pub struct PostgresArticleRepository {
    pool: PgPool,
}

impl PostgresArticleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArticleRepository for PostgresArticleRepository {
    async fn list_active(&self) -> Result<Vec<Article>, DomainError> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, description, content, author, created_at, updated_at, deleted_at
            FROM articles
            WHERE deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while listing articles: {}", e);
            DomainError::from(e)
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>, DomainError> {
        sqlx::query_as::<_, Article>(
            r#"
            SELECT id, title, description, content, author, created_at, updated_at, deleted_at
            FROM articles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to find article by id {}: {}", id, e);
            DomainError::from(e)
        })
    }

    async fn save(&self, article: Article) -> Result<Article, DomainError> {
        let saved = match article.id {
            None => {
                sqlx::query_as::<_, Article>(
                    r#"
                    INSERT INTO articles (title, description, content, author, deleted_at)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, title, description, content, author, created_at, updated_at, deleted_at
                    "#,
                )
                .bind(&article.title)
                .bind(&article.description)
                .bind(&article.content)
                .bind(&article.author)
                .bind(article.deleted_at)
                .fetch_one(&self.pool)
                .await
            }
            Some(id) => {
                sqlx::query_as::<_, Article>(
                    r#"
                    INSERT INTO articles (id, title, description, content, author, deleted_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (id) DO UPDATE SET
                        title = EXCLUDED.title,
                        description = EXCLUDED.description,
                        content = EXCLUDED.content,
                        author = EXCLUDED.author,
                        deleted_at = EXCLUDED.deleted_at,
                        updated_at = now()
                    RETURNING id, title, description, content, author, created_at, updated_at, deleted_at
                    "#,
                )
                .bind(id)
                .bind(&article.title)
                .bind(&article.description)
                .bind(&article.content)
                .bind(&article.author)
                .bind(article.deleted_at)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            error!("failed to save article: {}", e);
            DomainError::from(e)
        })?;

        info!(article_id = ?saved.id, "article saved");
        Ok(saved)
    }

    async fn delete_all(&self) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM articles")
            .execute(&self.pool)
            .await
            .map_err(DomainError::from)?;
        info!(rows = result.rows_affected(), "articles purged");
        Ok(result.rows_affected())
    }
}

#[derive(Default)]
struct ArticleTable {
    rows: BTreeMap<i64, Article>,
    last_id: i64,
}

/// Process-local store used when no database is configured.
#[derive(Default)]
pub struct InMemoryArticleRepository {
    table: Mutex<ArticleTable>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleRepository for InMemoryArticleRepository {
    async fn list_active(&self) -> Result<Vec<Article>, DomainError> {
        let table = self.table.lock();
        Ok(table
            .rows
            .values()
            .filter(|article| !article.is_deleted())
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>, DomainError> {
        Ok(self.table.lock().rows.get(&id).cloned())
    }

    async fn save(&self, mut article: Article) -> Result<Article, DomainError> {
        let now = Utc::now();
        let mut table = self.table.lock();

        let id = match article.id {
            Some(id) => id,
            None => {
                table.last_id += 1;
                table.last_id
            }
        };
        table.last_id = table.last_id.max(id);

        match table.rows.get(&id) {
            Some(existing) => {
                article.created_at = existing.created_at;
                article.updated_at = now.max(existing.created_at);
            }
            None => {
                article.created_at = now;
                article.updated_at = now;
            }
        }
        article.id = Some(id);

        table.rows.insert(id, article.clone());
        Ok(article)
    }

    async fn delete_all(&self) -> Result<u64, DomainError> {
        let mut table = self.table.lock();
        let removed = table.rows.len() as u64;
        table.rows.clear();
        Ok(removed)
    }
}
