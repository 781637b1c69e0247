use serde::{Deserialize, Serialize};

use crate::application::auth_service::AuthSession;
use crate::domain::article::{ArticleInput, TITLE_MAX_CHARS};
use crate::domain::error::DomainError;
use crate::domain::user::{Hobby, Role, UserInput};

// ======================= Envelope =======================

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Common response wrapper: `{"status", "data", "message"?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub status: Status,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            message: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            status: Status::Success,
            data: None,
            message: None,
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            message: Some(message.into()),
        }
    }
}

// ======================= AUTH =======================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String, // "Bearer"
    pub expires_in: i64,
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl AuthResponse {
    pub fn new(session: AuthSession, expires_in: i64) -> Self {
        Self {
            token: session.token,
            token_type: "Bearer".to_string(),
            expires_in,
            id: session.user.id,
            email: session.user.email,
            username: session.user.username,
            role: session.user.role,
        }
    }
}

// ======================= ARTICLES =======================

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    pub author: String,
}

impl ArticleRequest {
    /// Shape checks applied to both create and update bodies.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push("Title is required");
        } else if self.title.chars().count() > TITLE_MAX_CHARS {
            problems.push("Title must not exceed 255 characters");
        }
        if self.author.trim().is_empty() {
            problems.push("Author is required");
        }
        schema_result(problems)
    }
}

impl From<ArticleRequest> for ArticleInput {
    fn from(req: ArticleRequest) -> Self {
        ArticleInput {
            title: req.title,
            description: req.description,
            content: req.content,
            author: req.author,
        }
    }
}

// ======================= USERS =======================

#[derive(Debug, Deserialize)]
pub struct HobbyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub hobbies: Vec<HobbyRequest>,
}

impl UserRequest {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut problems = Vec::new();
        if self.username.trim().is_empty() {
            problems.push("Username is required");
        }
        if self.email.trim().is_empty() {
            problems.push("Email is required");
        }
        if self.password.is_empty() {
            problems.push("Password is required");
        }
        if self.hobbies.iter().any(|h| h.name.trim().is_empty()) {
            problems.push("Hobby name is required");
        }
        schema_result(problems)
    }
}

impl From<UserRequest> for UserInput {
    fn from(req: UserRequest) -> Self {
        UserInput {
            username: req.username,
            email: req.email,
            password: req.password,
            role: req.role,
            hobbies: req
                .hobbies
                .into_iter()
                .map(|h| Hobby::new(h.name, h.description))
                .collect(),
        }
    }
}

// ======================= NOTIFICATIONS / FILES =======================

#[derive(Debug, Deserialize)]
pub struct EmailNotificationQuery {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

// ======================= Utils =======================

fn schema_result(problems: Vec<&str>) -> Result<(), DomainError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(DomainError::SchemaInvalid(problems.join("; ")))
    }
}
