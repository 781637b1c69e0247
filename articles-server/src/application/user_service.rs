use std::sync::Arc;

use tracing::{info, instrument};

use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{User, UserInput};
use crate::infrastructure::security::hash_password;

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn find_all(&self) -> Result<Vec<User>, DomainError> {
        self.repo.find_all().await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create(&self, input: UserInput) -> Result<User, DomainError> {
        validate_account(&input.username, &input.email, &input.password)?;

        let user = User::new(
            input.username,
            input.email.trim().to_lowercase(),
            hash(&input.password)?,
            input.role,
        )
        .with_hobbies(input.hobbies);
        let user = self.repo.save(user).await?;

        info!(user_id = ?user.id, "user created");
        Ok(user)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: UserInput) -> Result<User, DomainError> {
        validate_account(&input.username, &input.email, &input.password)?;
        let mut user = self.find_by_id(id).await?;

        user.username = input.username;
        user.email = input.email.trim().to_lowercase();
        user.password_hash = hash(&input.password)?;
        user.role = input.role;
        user.hobbies = input.hobbies;
        let user = self.repo.save(user).await?;

        info!(user_id = id, "user updated");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        if !self.repo.delete(id).await? {
            return Err(DomainError::user_not_found(id));
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }
}

pub(crate) fn hash(password: &str) -> Result<String, DomainError> {
    hash_password(password).map_err(|err| DomainError::Internal(err.to_string()))
}

pub(crate) fn validate_account(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), DomainError> {
    if username.trim().is_empty() {
        return Err(DomainError::InvalidInput("Username must not be empty".into()));
    }
    if !email.contains('@') {
        return Err(DomainError::InvalidInput("Email must be valid".into()));
    }
    if password.is_empty() {
        return Err(DomainError::InvalidInput("Password must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user_repository::InMemoryUserRepository;
    use crate::domain::user::{Hobby, Role};
    use crate::infrastructure::security::verify_password;

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryUserRepository::new()))
    }

    fn input(username: &str, email: &str) -> UserInput {
        UserInput {
            username: username.into(),
            email: email.into(),
            password: "plainpassword".into(),
            role: Role::User,
            hobbies: vec![Hobby::new("test hobby 1".into(), None)],
        }
    }

    #[tokio::test]
    async fn create_hashes_password_and_keeps_hobbies() {
        let service = service();
        let user = service.create(input("newuser", "New@Example.com")).await.unwrap();

        assert!(user.id.is_some());
        assert_eq!(user.email, "new@example.com");
        assert_ne!(user.password_hash, "plainpassword");
        assert!(verify_password("plainpassword", &user.password_hash).unwrap());
        assert_eq!(user.hobbies.len(), 1);
        assert_eq!(user.hobbies[0].name, "test hobby 1");
    }

    #[tokio::test]
    async fn update_replaces_fields_and_hobbies() {
        let service = service();
        let id = service
            .create(input("oldusername", "old@example.com"))
            .await
            .unwrap()
            .id
            .unwrap();

        let mut change = input("newusername", "new@example.com");
        change.password = "newpassword".into();
        change.role = Role::Admin;
        change.hobbies = vec![Hobby::new("test hobby 3".into(), None)];
        let user = service.update(id, change).await.unwrap();

        assert_eq!(user.username, "newusername");
        assert_eq!(user.role, Role::Admin);
        assert!(verify_password("newpassword", &user.password_hash).unwrap());
        assert_eq!(user.hobbies.len(), 1);
        assert_eq!(user.hobbies[0].name, "test hobby 3");
    }

    #[tokio::test]
    async fn missing_users_are_not_found() {
        let service = service();

        let find = service.find_by_id(999).await.unwrap_err();
        let update = service.update(999, input("x", "x@example.com")).await.unwrap_err();
        let delete = service.delete(999).await.unwrap_err();

        for err in [find, update, delete] {
            assert_eq!(err.to_string(), "User not found with id: 999");
        }
    }

    #[tokio::test]
    async fn delete_removes_user() {
        let service = service();
        let id = service
            .create(input("gone", "gone@example.com"))
            .await
            .unwrap()
            .id
            .unwrap();

        service.delete(id).await.unwrap();
        assert!(service.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_malformed_email() {
        let err = service().create(input("user", "nope")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}
