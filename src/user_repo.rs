// Dashboard accounts: bcrypt password hashes in SQLite.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("username already taken")]
    UsernameTaken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for UserError {
    fn from(e: sqlx::Error) -> Self {
        UserError::Other(e.into())
    }
}

#[derive(Clone)]
pub struct UserRepo {
    pool: SqlitePool,
    bcrypt_cost: u32,
}

impl UserRepo {
    pub fn new(pool: SqlitePool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }

    #[instrument(skip(self, password), fields(repo = "users", operation = "register"))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, UserError> {
        let cost = self.bcrypt_cost;
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("hash task: {}", e))?
            .map_err(|e| anyhow::anyhow!("bcrypt: {}", e))?;

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3)",
        )
        .bind(username)
        .bind(&hash)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(User {
                id: done.last_insert_rowid(),
                username: username.to_string(),
            }),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(UserError::UsernameTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, password), fields(repo = "users", operation = "authenticate"))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Err(UserError::InvalidCredentials);
        };
        let id: i64 = row.try_get("id")?;
        let hash: String = row.try_get("password_hash")?;

        let password = password.to_string();
        let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("verify task: {}", e))?
            .unwrap_or(false);
        if !ok {
            return Err(UserError::InvalidCredentials);
        }
        Ok(User {
            id,
            username: username.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn repo() -> (UserRepo, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let pool = crate::db::connect(path.to_str().unwrap(), 2).await.unwrap();
        crate::db::init(&pool).await.unwrap();
        (UserRepo::new(pool, 4), dir)
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let (repo, _dir) = repo().await;
        let user = repo.register("neo", "follow-the-rabbit").await.unwrap();
        assert_eq!(user.username, "neo");
        let again = repo.authenticate("neo", "follow-the-rabbit").await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_rejected() {
        let (repo, _dir) = repo().await;
        repo.register("trinity", "correct-horse").await.unwrap();
        assert!(matches!(
            repo.authenticate("trinity", "wrong-horse").await,
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            repo.authenticate("smith", "anything").await,
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn duplicate_username_rejected() {
        let (repo, _dir) = repo().await;
        repo.register("morpheus", "red-pill-123").await.unwrap();
        assert!(matches!(
            repo.register("morpheus", "blue-pill-456").await,
            Err(UserError::UsernameTaken)
        ));
    }
}
