use std::sync::Arc;

use tracing::instrument;

use crate::application::user_service::{hash, validate_account};
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{Role, User};
use crate::infrastructure::security::{JwtKeys, verify_password};

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn get_user(&self, id: i64) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<AuthSession, DomainError> {
        validate_account(&username, &email, &password)?;

        let user = User::new(
            username,
            email.trim().to_lowercase(),
            hash(&password)?,
            Role::User,
        );
        let user = self.repo.save(user).await?;
        self.session_for(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        let user = self
            .repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| DomainError::Unauthorized("invalid email or password".into()))?;

        let valid = verify_password(password, &user.password_hash)
            .map_err(|_| DomainError::Unauthorized("invalid email or password".into()))?;
        if !valid {
            return Err(DomainError::Unauthorized(
                "invalid email or password".into(),
            ));
        }

        self.session_for(user)
    }

    fn session_for(&self, user: User) -> Result<AuthSession, DomainError> {
        let id = user
            .id
            .ok_or_else(|| DomainError::Internal("user was not persisted".into()))?;
        let token = self
            .keys
            .generate_token(id)
            .map_err(|err| DomainError::Internal(err.to_string()))?;
        Ok(AuthSession { token, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user_repository::InMemoryUserRepository;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryUserRepository::new()),
            JwtKeys::new("test-secret".into(), 3600),
        )
    }

    #[tokio::test]
    async fn register_issues_token_for_new_user() {
        let service = service();
        let session = service
            .register("reja".into(), "Reja@Example.com".into(), "secret".into())
            .await
            .unwrap();

        let claims = service.keys().verify_token(&session.token).unwrap();
        assert_eq!(claims.user_id(), session.user.id);
        assert_eq!(session.user.role, Role::User);
        assert_eq!(session.user.email, "reja@example.com");
    }

    #[tokio::test]
    async fn register_twice_with_same_email_conflicts() {
        let service = service();
        service
            .register("a".into(), "a@example.com".into(), "secret".into())
            .await
            .unwrap();

        let err = service
            .register("b".into(), "A@example.com".into(), "secret".into())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let service = service();
        service
            .register("a".into(), "a@example.com".into(), "secret".into())
            .await
            .unwrap();

        assert!(service.login("a@example.com", "secret").await.is_ok());
        assert!(matches!(
            service.login("a@example.com", "wrong").await,
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            service.login("nobody@example.com", "secret").await,
            Err(DomainError::Unauthorized(_))
        ));
    }
}
