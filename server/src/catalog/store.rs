//! Catalog persistence contract and its `PostgreSQL` implementation.
//!
//! [`CatalogStore`] is the narrow remote-store surface the editor consumes:
//! row-level fetches and mutations, nothing else. The trait seam lets tests
//! drive [`super::session::EditorSession`] with scripted stores that record
//! call order.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::types::{Course, LessonRow, ModuleRow, UpdateCourseRequest};

/// Error from a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Target row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Database error.
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Store backend unavailable (used by scripted test stores).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Remote-store contract for the course-content editor.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Fetch a course by id.
    async fn fetch_course(&self, course_id: Uuid) -> Result<Course, StoreError>;

    /// List a course's modules ordered by position.
    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<ModuleRow>, StoreError>;

    /// List lessons for a module-id set, ordered by position.
    async fn list_lessons(&self, module_ids: &[Uuid]) -> Result<Vec<LessonRow>, StoreError>;

    /// Insert a module row, returning the stored row.
    async fn insert_module(
        &self,
        course_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<ModuleRow, StoreError>;

    /// Update a module's title only.
    async fn rename_module(&self, module_id: Uuid, title: &str) -> Result<(), StoreError>;

    /// Update a module's position only.
    async fn set_module_position(&self, module_id: Uuid, position: i32) -> Result<(), StoreError>;

    /// Delete a module row.
    async fn delete_module(&self, module_id: Uuid) -> Result<(), StoreError>;

    /// Insert a lesson row, returning the stored row.
    async fn insert_lesson(
        &self,
        module_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<LessonRow, StoreError>;

    /// Update a lesson's title only.
    async fn rename_lesson(&self, lesson_id: Uuid, title: &str) -> Result<(), StoreError>;

    /// Update a lesson's position only.
    async fn set_lesson_position(&self, lesson_id: Uuid, position: i32) -> Result<(), StoreError>;

    /// Re-home a lesson: parent module and position together.
    async fn set_lesson_placement(
        &self,
        lesson_id: Uuid,
        module_id: Uuid,
        position: i32,
    ) -> Result<(), StoreError>;

    /// Delete every lesson belonging to a module.
    async fn delete_lessons_in_module(&self, module_id: Uuid) -> Result<(), StoreError>;

    /// Delete a lesson row.
    async fn delete_lesson(&self, lesson_id: Uuid) -> Result<(), StoreError>;

    /// Replace a course's descriptive fields.
    async fn update_course(
        &self,
        course_id: Uuid,
        fields: &UpdateCourseRequest,
    ) -> Result<Course, StoreError>;

    /// Replace the course↔subject association set.
    async fn replace_course_subjects(
        &self,
        course_id: Uuid,
        subject_ids: &[Uuid],
    ) -> Result<(), StoreError>;
}

/// `PostgreSQL`-backed catalog store.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn fetch_course(&self, course_id: Uuid) -> Result<Course, StoreError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("Course"))
    }

    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<ModuleRow>, StoreError> {
        Ok(sqlx::query_as::<_, ModuleRow>(
            "SELECT * FROM course_modules WHERE course_id = $1 ORDER BY position",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_lessons(&self, module_ids: &[Uuid]) -> Result<Vec<LessonRow>, StoreError> {
        if module_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(sqlx::query_as::<_, LessonRow>(
            "SELECT * FROM lessons WHERE module_id = ANY($1) ORDER BY module_id, position",
        )
        .bind(module_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_module(
        &self,
        course_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<ModuleRow, StoreError> {
        Ok(sqlx::query_as::<_, ModuleRow>(
            r"
            INSERT INTO course_modules (id, course_id, title, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(Uuid::now_v7())
        .bind(course_id)
        .bind(title)
        .bind(position)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn rename_module(&self, module_id: Uuid, title: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE course_modules SET title = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(module_id)
        .bind(title)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Module"));
        }
        Ok(())
    }

    async fn set_module_position(&self, module_id: Uuid, position: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE course_modules SET position = $2, updated_at = NOW() WHERE id = $1")
            .bind(module_id)
            .bind(position)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_module(&self, module_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM course_modules WHERE id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Module"));
        }
        Ok(())
    }

    async fn insert_lesson(
        &self,
        module_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<LessonRow, StoreError> {
        Ok(sqlx::query_as::<_, LessonRow>(
            r"
            INSERT INTO lessons (id, module_id, title, position)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(Uuid::now_v7())
        .bind(module_id)
        .bind(title)
        .bind(position)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn rename_lesson(&self, lesson_id: Uuid, title: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE lessons SET title = $2, updated_at = NOW() WHERE id = $1")
                .bind(lesson_id)
                .bind(title)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Lesson"));
        }
        Ok(())
    }

    async fn set_lesson_position(&self, lesson_id: Uuid, position: i32) -> Result<(), StoreError> {
        sqlx::query("UPDATE lessons SET position = $2, updated_at = NOW() WHERE id = $1")
            .bind(lesson_id)
            .bind(position)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_lesson_placement(
        &self,
        lesson_id: Uuid,
        module_id: Uuid,
        position: i32,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE lessons
            SET module_id = $2, position = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(lesson_id)
        .bind(module_id)
        .bind(position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_lessons_in_module(&self, module_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM lessons WHERE module_id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Lesson"));
        }
        Ok(())
    }

    async fn update_course(
        &self,
        course_id: Uuid,
        fields: &UpdateCourseRequest,
    ) -> Result<Course, StoreError> {
        sqlx::query_as::<_, Course>(
            r"
            UPDATE courses
            SET title = $2,
                status = $3,
                summary = $4,
                description = $5,
                is_featured = $6,
                access_days = $7,
                objectives = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(course_id)
        .bind(&fields.title)
        .bind(fields.status)
        .bind(&fields.summary)
        .bind(&fields.description)
        .bind(fields.is_featured)
        .bind(fields.access_days)
        .bind(&fields.objectives)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("Course"))
    }

    async fn replace_course_subjects(
        &self,
        course_id: Uuid,
        subject_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        // Delete-then-insert reconciliation inside one transaction so a
        // partial failure cannot strand the course with no associations.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM course_subjects WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        for subject_id in subject_ids {
            sqlx::query(
                r"
                INSERT INTO course_subjects (course_id, subject_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                ",
            )
            .bind(course_id)
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
