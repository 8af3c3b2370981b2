//! SQLite persistence for course workspaces.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::{CourseData, RosterError};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Course not found")]
    CourseNotFound(i64),

    #[error(transparent)]
    Roster(#[from] RosterError),

    #[error("Stored workspace is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Loads and saves `CourseData` documents, one row per course.
///
/// Mutations for the same course are serialized so the read-modify-write
/// cycle of one request cannot interleave with another.
pub struct WorkspaceStore {
    db: DbPool,
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl WorkspaceStore {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            locks: DashMap::new(),
        }
    }

    /// Lock handle for an existing course; unknown ids never get an entry
    async fn lock_for(&self, course_id: i64) -> Result<Arc<Mutex<()>>, WorkspaceError> {
        self.ensure_course(course_id).await?;
        Ok(self.locks.entry(course_id).or_default().clone())
    }

    /// Drop the lock entry of a deleted course
    pub fn forget(&self, course_id: i64) {
        self.locks.remove(&course_id);
    }

    /// Fetch a course's workspace, creating an empty one on first access
    pub async fn load(&self, course_id: i64) -> Result<CourseData, WorkspaceError> {
        let lock = self.lock_for(course_id).await?;
        let _guard = lock.lock().await;
        self.load_or_create(course_id).await
    }

    /// Apply `f` to the workspace and persist the result if it succeeds.
    ///
    /// On error nothing is written and the stored document is unchanged.
    pub async fn update<T, F>(&self, course_id: i64, f: F) -> Result<(CourseData, T), WorkspaceError>
    where
        F: FnOnce(&mut CourseData) -> Result<T, RosterError>,
    {
        let lock = self.lock_for(course_id).await?;
        let _guard = lock.lock().await;

        let mut data = self.load_or_create(course_id).await?;
        let value = f(&mut data)?;
        self.save(course_id, &data).await?;

        Ok((data, value))
    }

    /// Overwrite the whole document after checking the membership invariant
    pub async fn replace(&self, course_id: i64, data: CourseData) -> Result<CourseData, WorkspaceError> {
        data.validate()?;

        let lock = self.lock_for(course_id).await?;
        let _guard = lock.lock().await;

        self.save(course_id, &data).await?;
        Ok(data)
    }

    async fn load_or_create(&self, course_id: i64) -> Result<CourseData, WorkspaceError> {
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT data FROM course_workspaces WHERE course_id = ?")
                .bind(course_id)
                .fetch_optional(&self.db)
                .await?;

        match stored {
            Some((json,)) => Ok(serde_json::from_str(&json)?),
            None => {
                self.ensure_course(course_id).await?;
                let data = CourseData::default();
                self.save(course_id, &data).await?;
                tracing::debug!(course_id, "Created empty course workspace");
                Ok(data)
            }
        }
    }

    async fn ensure_course(&self, course_id: i64) -> Result<(), WorkspaceError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT course_id FROM courses WHERE course_id = ?")
            .bind(course_id)
            .fetch_optional(&self.db)
            .await?;

        match exists {
            Some(_) => Ok(()),
            None => Err(WorkspaceError::CourseNotFound(course_id)),
        }
    }

    async fn save(&self, course_id: i64, data: &CourseData) -> Result<(), WorkspaceError> {
        let json = serde_json::to_string(data)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO course_workspaces (course_id, data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(course_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(course_id)
        .bind(&json)
        .bind(&now)
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
