//! Catalog row models and request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Course publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "course_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Draft,
    ComingSoon,
    Published,
    Archived,
}

/// Lesson publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, utoipa::ToSchema)]
#[sqlx(type_name = "lesson_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Draft,
    Published,
}

/// Course row.
#[derive(Debug, Clone, FromRow, Serialize, utoipa::ToSchema)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub status: CourseStatus,
    pub summary: String,
    pub description: String,
    pub is_featured: bool,
    /// How long learners keep access after enrollment, in days.
    pub access_days: Option<i32>,
    /// Ordered learning objectives.
    pub objectives: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course module row. Positions are 1-based and dense within a course.
#[derive(Debug, Clone, FromRow, Serialize, utoipa::ToSchema)]
pub struct ModuleRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lesson row. Positions are 1-based and dense within a module.
#[derive(Debug, Clone, FromRow, Serialize, utoipa::ToSchema)]
pub struct LessonRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub status: LessonStatus,
    pub position: i32,
    pub content: String,
    pub video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subject row.
#[derive(Debug, Clone, FromRow, Serialize, utoipa::ToSchema)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request types
// ============================================================================

/// Request to create a course.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub summary: String,
}

/// Request to replace a course's descriptive fields and subject set.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub status: CourseStatus,
    #[validate(length(max = 500))]
    pub summary: String,
    pub description: String,
    pub is_featured: bool,
    #[validate(range(min = 1, max = 3650))]
    pub access_days: Option<i32>,
    pub objectives: Vec<String>,
    /// Full replacement set for the course's subject associations.
    pub subject_ids: Vec<Uuid>,
}

/// Request to create a subject.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// Request to update a lesson's content fields directly.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateLessonRequest {
    pub status: Option<LessonStatus>,
    pub content: Option<String>,
    /// `None` = don't change, `Some(None)` = clear, `Some(Some(url))` = set.
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub video_url: Option<Option<String>>,
}

/// Serde helper distinguishing an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(de).map(Some)
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Course with its assembled module/lesson tree and subject set.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub subject_ids: Vec<Uuid>,
    pub modules: Vec<ModuleDetail>,
}

/// Module with its ordered lessons.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub module: ModuleRow,
    pub lessons: Vec<LessonRow>,
}

/// Rendered lesson preview.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LessonPreview {
    pub id: Uuid,
    pub title: String,
    pub html: String,
}
