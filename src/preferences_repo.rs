// Per-user metric visibility, one row per (user, category). Missing rows mean "enabled".

use crate::models::{MetricCategory, PreferenceUpdate, UserPreferenceSet};
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum PreferencesError {
    #[error("user no longer exists")]
    UnknownUser,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for PreferencesError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                PreferencesError::UnknownUser
            }
            e => PreferencesError::Other(e.into()),
        }
    }
}

#[derive(Clone)]
pub struct PreferencesRepo {
    pool: SqlitePool,
}

impl PreferencesRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), fields(repo = "preferences", operation = "get"))]
    pub async fn get(&self, user_id: i64) -> anyhow::Result<UserPreferenceSet> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, user_id).await
    }

    /// Upserts the known ids in `updates` and returns the full resulting set.
    /// The transaction writes before it reads, so it takes the write lock up front
    /// and concurrent updates queue on the busy timeout.
    #[instrument(skip(self, updates), fields(repo = "preferences", operation = "update", updates_count = updates.len()))]
    pub async fn update(
        &self,
        user_id: i64,
        updates: &[PreferenceUpdate],
    ) -> Result<UserPreferenceSet, PreferencesError> {
        let mut tx = self.pool.begin().await?;
        // Touch the user row first: a missing user fails here, and the write lock is held
        // before anything is read.
        let touched = sqlx::query("UPDATE users SET password_hash = password_hash WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(PreferencesError::UnknownUser);
        }
        for (id, enabled) in updates.iter().filter_map(|u| Some((u.category()?, u.enabled))) {
            sqlx::query(
                "INSERT INTO user_preferences (user_id, metric_id, enabled) VALUES ($1, $2, $3)
                 ON CONFLICT(user_id, metric_id) DO UPDATE SET enabled = excluded.enabled",
            )
            .bind(user_id)
            .bind(id.as_str())
            .bind(enabled)
            .execute(&mut *tx)
            .await?;
        }
        let set = load(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(set)
    }
}

async fn load(
    conn: &mut sqlx::SqliteConnection,
    user_id: i64,
) -> anyhow::Result<UserPreferenceSet> {
    let rows = sqlx::query("SELECT metric_id, enabled FROM user_preferences WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
    let mut set = UserPreferenceSet::default();
    for row in rows {
        let metric_id: String = row.try_get("metric_id")?;
        let enabled: bool = row.try_get("enabled")?;
        // Rows for categories that no longer exist are ignored
        let Ok(id) = metric_id.parse::<MetricCategory>() else {
            continue;
        };
        if let Some(pref) = set.0.iter_mut().find(|p| p.id == id) {
            pref.enabled = enabled;
        }
    }
    Ok(set)
}
