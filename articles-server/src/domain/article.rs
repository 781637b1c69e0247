use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    /// `None` until the article has been persisted.
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn new(
        title: String,
        description: Option<String>,
        content: Option<String>,
        author: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title,
            description,
            content,
            author,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Overwrites every mutable field, blank values included.
    pub fn apply(&mut self, input: ArticleInput) {
        self.title = input.title;
        self.description = input.description;
        self.content = input.content;
        self.author = input.author;
    }
}

/// Caller-supplied article fields for create and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleInput {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: String,
}

impl From<ArticleInput> for Article {
    fn from(input: ArticleInput) -> Self {
        Article::new(input.title, input.description, input.content, input.author)
    }
}
