use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{error, info, warn};

use crate::domain::error::DomainError;
use crate::domain::user::{Hobby, Role, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<User>, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    /// Inserts or updates the user and replaces its hobbies.
    async fn save(&self, user: User) -> Result<User, DomainError>;
    /// Returns `false` when no such user existed.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct HobbyRow {
    id: i64,
    user_id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self, hobbies: Vec<Hobby>) -> User {
        let role = self.role.parse().unwrap_or_else(|err| {
            warn!(user_id = self.id, "{}; falling back to USER", err);
            Role::User
        });
        User {
            id: Some(self.id),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role,
            hobbies,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<HobbyRow> for Hobby {
    fn from(row: HobbyRow) -> Self {
        Hobby {
            id: Some(row.id),
            user_id: Some(row.user_id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_write_error(e: sqlx::Error) -> DomainError {
    error!("failed to save user: {}", e);
    if e.as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c.contains("users_email"))
        == Some(true)
    {
        DomainError::Conflict("email already registered".to_string())
    } else {
        DomainError::from(e)
    }
}

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_hobbies(&self, rows: Vec<UserRow>) -> Result<Vec<User>, DomainError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let hobby_rows = sqlx::query_as::<_, HobbyRow>(
            r#"
            SELECT id, user_id, name, description, created_at, updated_at
            FROM hobbies
            WHERE user_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_user: HashMap<i64, Vec<Hobby>> = HashMap::new();
        for row in hobby_rows {
            by_user.entry(row.user_id).or_default().push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let hobbies = by_user.remove(&row.id).unwrap_or_default();
                row.into_user(hobbies)
            })
            .collect())
    }

    async fn replace_hobbies(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        hobbies: &[Hobby],
    ) -> Result<Vec<Hobby>, sqlx::Error> {
        sqlx::query("DELETE FROM hobbies WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        let mut saved = Vec::with_capacity(hobbies.len());
        for hobby in hobbies {
            let row = sqlx::query_as::<_, HobbyRow>(
                r#"
                INSERT INTO hobbies (user_id, name, description)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, name, description, created_at, updated_at
                "#,
            )
            .bind(user_id)
            .bind(&hobby.name)
            .bind(&hobby.description)
            .fetch_one(&mut **tx)
            .await?;
            saved.push(row.into());
        }
        Ok(saved)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_all(&self) -> Result<Vec<User>, DomainError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while listing users: {}", e);
            DomainError::from(e)
        })?;

        self.attach_hobbies(rows).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to find user by id {}: {}", id, e);
            DomainError::from(e)
        })?;

        match row {
            Some(row) => Ok(self.attach_hobbies(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("failed to find user by email {}: {}", email, e);
            DomainError::from(e)
        })?;

        match row {
            Some(row) => Ok(self.attach_hobbies(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn save(&self, user: User) -> Result<User, DomainError> {
        let mut tx = self.pool.begin().await?;

        let row = match user.id {
            None => sqlx::query_as::<_, UserRow>(
                r#"
                INSERT INTO users (username, email, password_hash, role)
                VALUES ($1, $2, $3, $4)
                RETURNING id, username, email, password_hash, role, created_at, updated_at
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?,
            Some(id) => sqlx::query_as::<_, UserRow>(
                r#"
                UPDATE users
                SET username = $2, email = $3, password_hash = $4, role = $5, updated_at = now()
                WHERE id = $1
                RETURNING id, username, email, password_hash, role, created_at, updated_at
                "#,
            )
            .bind(id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| DomainError::user_not_found(id))?,
        };

        let hobbies = Self::replace_hobbies(&mut tx, row.id, &user.hobbies).await?;
        tx.commit().await?;

        info!(user_id = row.id, email = %row.email, "user saved");
        Ok(row.into_user(hobbies))
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to delete user {}: {}", id, e);
                DomainError::from(e)
            })?;

        if deleted.rows_affected() > 0 {
            info!(user_id = id, "user deleted");
        }
        Ok(deleted.rows_affected() > 0)
    }
}

#[derive(Default)]
struct UserTable {
    rows: BTreeMap<i64, User>,
    last_id: i64,
    last_hobby_id: i64,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    table: Mutex<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_all(&self) -> Result<Vec<User>, DomainError> {
        Ok(self.table.lock().rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        Ok(self.table.lock().rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .table
            .lock()
            .rows
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn save(&self, mut user: User) -> Result<User, DomainError> {
        let now = Utc::now();
        let mut table = self.table.lock();

        let taken = table
            .rows
            .values()
            .any(|other| other.email == user.email && other.id != user.id);
        if taken {
            return Err(DomainError::Conflict("email already registered".to_string()));
        }

        let id = match user.id {
            Some(id) => {
                let existing = table
                    .rows
                    .get(&id)
                    .ok_or_else(|| DomainError::user_not_found(id))?;
                user.created_at = existing.created_at;
                user.updated_at = now.max(existing.created_at);
                id
            }
            None => {
                table.last_id += 1;
                user.created_at = now;
                user.updated_at = now;
                table.last_id
            }
        };
        user.id = Some(id);

        // hobbies are replaced wholesale, so every one is a fresh row
        for hobby in &mut user.hobbies {
            table.last_hobby_id += 1;
            hobby.id = Some(table.last_hobby_id);
            hobby.user_id = Some(id);
            hobby.created_at = now;
            hobby.updated_at = now;
        }

        table.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        Ok(self.table.lock().rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::infrastructure::database::{create_pool, run_migrations};

    fn user(email: &str) -> User {
        User::new("reja".into(), email.into(), "hash".into(), Role::User)
    }

    #[tokio::test]
    async fn save_rejects_duplicate_email() {
        let repo = InMemoryUserRepository::new();
        repo.save(user("a@example.com")).await.unwrap();

        let err = repo.save(user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn save_replaces_hobbies_with_fresh_ids() {
        let repo = InMemoryUserRepository::new();
        let saved = repo
            .save(user("a@example.com").with_hobbies(vec![Hobby::new("chess".into(), None)]))
            .await
            .unwrap();
        assert_eq!(saved.hobbies[0].id, Some(1));

        let updated = repo
            .save(saved.clone().with_hobbies(vec![Hobby::new("go".into(), Some("board game".into()))]))
            .await
            .unwrap();
        assert_eq!(updated.hobbies.len(), 1);
        assert_eq!(updated.hobbies[0].name, "go");
        assert_eq!(updated.hobbies[0].id, Some(2));
        assert_eq!(updated.hobbies[0].user_id, updated.id);
        assert!(updated.hobbies[0].created_at >= saved.created_at);
        assert_eq!(updated.hobbies[0].created_at, updated.hobbies[0].updated_at);
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let mut ghost = user("ghost@example.com");
        ghost.id = Some(42);

        let err = repo.save(ghost).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found with id: 42");
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let repo = InMemoryUserRepository::new();
        let saved = repo.save(user("a@example.com")).await.unwrap();

        assert!(repo.delete(saved.id.unwrap()).await.unwrap());
        assert!(!repo.delete(saved.id.unwrap()).await.unwrap());
        assert!(repo.find_by_email("a@example.com").await.unwrap().is_none());
    }

    /// Needs a live database; skipped when `DATABASE_URL` is unset.
    #[tokio::test]
    async fn postgres_save_round_trips_hobbies() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return;
        };
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let repo = PostgresUserRepository::new(pool);

        let email = format!("pg-{}@example.com", Uuid::new_v4());
        let saved = repo
            .save(user(&email).with_hobbies(vec![Hobby::new("chess".into(), None)]))
            .await
            .unwrap();
        let id = saved.id.unwrap();
        assert_eq!(saved.hobbies[0].user_id, Some(id));

        let found = repo.find_by_email(&email).await.unwrap().unwrap();
        assert_eq!(found.hobbies, saved.hobbies);

        let err = repo.save(user(&email)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        assert!(repo.delete(id).await.unwrap());
        assert!(repo.find_by_id(id).await.unwrap().is_none());
    }
}
