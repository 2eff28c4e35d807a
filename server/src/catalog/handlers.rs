//! Catalog API Handlers
//!
//! Course/subject/lesson CRUD plus the stateful course-editor endpoints.
//! Everything here is admin-gated by the router in `mod.rs`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::api::AppState;

use super::editor::EditorTree;
use super::error::CatalogError;
use super::session::{EditorSession, ReorderRequest};
use super::store::{CatalogStore, PgCatalogStore};
use super::types::{
    Course, CourseDetail, CreateCourseRequest, CreateSubjectRequest, LessonPreview, LessonRow,
    ModuleDetail, Subject, UpdateCourseRequest, UpdateLessonRequest,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Inline-save request carrying the edited title.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SaveTitleRequest {
    pub title: String,
}

/// Editor snapshot returned by every editor endpoint.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EditorSnapshot {
    pub editor_id: Uuid,
    #[schema(value_type = Object)]
    pub tree: EditorTree,
}

/// Reorder response: whether the gesture changed anything.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReorderResponse {
    pub applied: bool,
    #[schema(value_type = Object)]
    pub tree: EditorTree,
}

fn validation_error(e: &validator::ValidationErrors) -> CatalogError {
    CatalogError::Validation(e.to_string())
}

// ============================================================================
// Courses
// ============================================================================

/// List all courses, newest first.
///
/// `GET /api/courses`
#[utoipa::path(
    get,
    path = "/api/courses",
    tag = "courses",
    responses((status = 200, description = "List of courses")),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, CatalogError> {
    let courses =
        sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(courses))
}

/// Create a new draft course.
///
/// `POST /api/courses`
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    request_body = CreateCourseRequest,
    responses((status = 201, description = "Course created", body = Course)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, body))]
pub async fn create_course(
    State(state): State<AppState>,
    Json(body): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<Course>), CatalogError> {
    body.validate().map_err(|e| validation_error(&e))?;

    let course = sqlx::query_as::<_, Course>(
        r"
        INSERT INTO courses (id, title, summary)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(body.title.trim())
    .bind(&body.summary)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Fetch a course with its assembled module/lesson tree.
///
/// `GET /api/courses/{id}`
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Course detail", body = CourseDetail)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<CourseDetail>, CatalogError> {
    let store = PgCatalogStore::new(state.db.clone());

    let course = store.fetch_course(course_id).await?;
    let module_rows = store.list_modules(course_id).await?;
    let module_ids: Vec<Uuid> = module_rows.iter().map(|m| m.id).collect();
    let lessons = store.list_lessons(&module_ids).await?;

    let subject_ids: Vec<(Uuid,)> =
        sqlx::query_as("SELECT subject_id FROM course_subjects WHERE course_id = $1")
            .bind(course_id)
            .fetch_all(&state.db)
            .await?;

    // Assemble the nested shape; lessons arrive ordered by position.
    let mut modules: Vec<ModuleDetail> = module_rows
        .into_iter()
        .map(|module| ModuleDetail {
            module,
            lessons: Vec::new(),
        })
        .collect();
    for lesson in lessons {
        if let Some(detail) = modules.iter_mut().find(|d| d.module.id == lesson.module_id) {
            detail.lessons.push(lesson);
        }
    }

    Ok(Json(CourseDetail {
        course,
        subject_ids: subject_ids.into_iter().map(|(id,)| id).collect(),
        modules,
    }))
}

/// Replace a course's descriptive fields and subject associations.
///
/// `PUT /api/courses/{id}`
///
/// Two store calls: the field update, then the subject reconciliation.
/// They are not atomic with each other; a failure between them is surfaced
/// and leaves the fields updated with the old associations.
#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses((status = 200, description = "Course updated", body = Course)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, body))]
pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(body): Json<UpdateCourseRequest>,
) -> Result<Json<Course>, CatalogError> {
    body.validate().map_err(|e| validation_error(&e))?;

    let store = PgCatalogStore::new(state.db.clone());
    let course = store.update_course(course_id, &body).await?;
    store.replace_course_subjects(course_id, &body.subject_ids).await?;

    Ok(Json(course))
}

/// Delete a course (modules and lessons cascade).
///
/// `DELETE /api/courses/{id}`
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 204, description = "Course deleted")),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<StatusCode, CatalogError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound("Course".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Subjects
// ============================================================================

/// List all subjects.
///
/// `GET /api/subjects`
#[utoipa::path(
    get,
    path = "/api/subjects",
    tag = "subjects",
    responses((status = 200, description = "List of subjects")),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn list_subjects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subject>>, CatalogError> {
    let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY name")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(subjects))
}

/// Create a subject.
///
/// `POST /api/subjects`
#[utoipa::path(
    post,
    path = "/api/subjects",
    tag = "subjects",
    request_body = CreateSubjectRequest,
    responses((status = 201, description = "Subject created", body = Subject)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, body))]
pub async fn create_subject(
    State(state): State<AppState>,
    Json(body): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), CatalogError> {
    body.validate().map_err(|e| validation_error(&e))?;

    let subject = sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (id, name) VALUES ($1, $2) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(body.name.trim())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(subject)))
}

// ============================================================================
// Lessons
// ============================================================================

/// Update a lesson's content fields.
///
/// `PUT /api/lessons/{id}`
#[utoipa::path(
    put,
    path = "/api/lessons/{id}",
    tag = "lessons",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    request_body = UpdateLessonRequest,
    responses((status = 200, description = "Lesson updated", body = LessonRow)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, body))]
pub async fn update_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
    Json(body): Json<UpdateLessonRequest>,
) -> Result<Json<LessonRow>, CatalogError> {
    let lesson = sqlx::query_as::<_, LessonRow>(
        r"
        UPDATE lessons
        SET
            status = COALESCE($2, status),
            content = COALESCE($3, content),
            video_url = CASE WHEN $4 THEN $5 ELSE video_url END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(lesson_id)
    .bind(body.status)
    .bind(&body.content)
    .bind(body.video_url.is_some()) // whether to update video_url
    .bind(body.video_url.flatten()) // the new video_url value
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| CatalogError::NotFound("Lesson".to_string()))?;

    Ok(Json(lesson))
}

/// Render a lesson's markdown body to HTML.
///
/// `GET /api/lessons/{id}/preview`
#[utoipa::path(
    get,
    path = "/api/lessons/{id}/preview",
    tag = "lessons",
    params(("id" = Uuid, Path, description = "Lesson ID")),
    responses((status = 200, description = "Rendered preview", body = LessonPreview)),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state))]
pub async fn preview_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<Uuid>,
) -> Result<Json<LessonPreview>, CatalogError> {
    let lesson = sqlx::query_as::<_, LessonRow>("SELECT * FROM lessons WHERE id = $1")
        .bind(lesson_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| CatalogError::NotFound("Lesson".to_string()))?;

    let parser = pulldown_cmark::Parser::new(&lesson.content);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);

    Ok(Json(LessonPreview {
        id: lesson.id,
        title: lesson.title,
        html,
    }))
}

// ============================================================================
// Editor sessions
// ============================================================================

/// Resolve an open editor session.
fn session(
    state: &AppState,
    editor_id: Uuid,
) -> Result<Arc<Mutex<EditorSession>>, CatalogError> {
    state
        .editor_sessions
        .get(&editor_id)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or(CatalogError::SessionNotFound)
}

fn snapshot(editor_id: Uuid, session: &EditorSession) -> EditorSnapshot {
    EditorSnapshot {
        editor_id,
        tree: session.tree().clone(),
    }
}

/// Open a course editor session.
///
/// `POST /api/courses/{id}/editor`
///
/// Loads the course tree from the store (all modules expanded) and
/// registers a session owned by this operator.
#[tracing::instrument(skip(state))]
pub async fn open_editor(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<(StatusCode, Json<EditorSnapshot>), CatalogError> {
    let store: Arc<dyn CatalogStore> = Arc::new(PgCatalogStore::new(state.db.clone()));
    let session = EditorSession::load(store, course_id).await?;

    let editor_id = Uuid::now_v7();
    let body = snapshot(editor_id, &session);
    state
        .editor_sessions
        .insert(editor_id, Arc::new(Mutex::new(session)));

    Ok((StatusCode::CREATED, Json(body)))
}

/// Get the current editor tree.
///
/// `GET /api/editor/{id}`
#[tracing::instrument(skip(state))]
pub async fn get_editor(
    State(state): State<AppState>,
    Path(editor_id): Path<Uuid>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let guard = session.lock().await;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Close an editor session.
///
/// `DELETE /api/editor/{id}`
///
/// In-flight store writes complete server-side regardless.
#[tracing::instrument(skip(state))]
pub async fn close_editor(
    State(state): State<AppState>,
    Path(editor_id): Path<Uuid>,
) -> Result<StatusCode, CatalogError> {
    state
        .editor_sessions
        .remove(&editor_id)
        .ok_or(CatalogError::SessionNotFound)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Append a transient module and enter edit mode for it.
///
/// `POST /api/editor/{id}/modules`
#[tracing::instrument(skip(state))]
pub async fn editor_add_module(
    State(state): State<AppState>,
    Path(editor_id): Path<Uuid>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.add_module_inline();
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Enter edit mode for an existing module.
///
/// `POST /api/editor/{id}/modules/{module_id}/edit`
#[tracing::instrument(skip(state))]
pub async fn editor_begin_module_edit(
    State(state): State<AppState>,
    Path((editor_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.begin_module_edit(module_id)?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Save a module's inline edit.
///
/// `PUT /api/editor/{id}/modules/{module_id}`
#[tracing::instrument(skip(state, body))]
pub async fn editor_save_module(
    State(state): State<AppState>,
    Path((editor_id, module_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SaveTitleRequest>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.save_module_inline(module_id, &body.title).await?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Cancel a module's inline edit.
///
/// `POST /api/editor/{id}/modules/{module_id}/cancel`
#[tracing::instrument(skip(state))]
pub async fn editor_cancel_module(
    State(state): State<AppState>,
    Path((editor_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.cancel_module_inline(module_id);
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Toggle a module's expand/collapse flag.
///
/// `POST /api/editor/{id}/modules/{module_id}/toggle`
#[tracing::instrument(skip(state))]
pub async fn editor_toggle_module(
    State(state): State<AppState>,
    Path((editor_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.toggle_module(module_id)?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Delete a module and its lessons (operator confirmation happens in the
/// UI; this endpoint is the confirmed action).
///
/// `DELETE /api/editor/{id}/modules/{module_id}`
#[tracing::instrument(skip(state))]
pub async fn editor_delete_module(
    State(state): State<AppState>,
    Path((editor_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.delete_module(module_id).await?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Append a transient lesson to a module.
///
/// `POST /api/editor/{id}/modules/{module_id}/lessons`
#[tracing::instrument(skip(state))]
pub async fn editor_add_lesson(
    State(state): State<AppState>,
    Path((editor_id, module_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.add_lesson_inline(module_id)?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Enter edit mode for an existing lesson.
///
/// `POST /api/editor/{id}/lessons/{lesson_id}/edit`
#[tracing::instrument(skip(state))]
pub async fn editor_begin_lesson_edit(
    State(state): State<AppState>,
    Path((editor_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.begin_lesson_edit(lesson_id)?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Save a lesson's inline edit.
///
/// `PUT /api/editor/{id}/lessons/{lesson_id}`
#[tracing::instrument(skip(state, body))]
pub async fn editor_save_lesson(
    State(state): State<AppState>,
    Path((editor_id, lesson_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<SaveTitleRequest>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.save_lesson_inline(lesson_id, &body.title).await?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Cancel a lesson's inline edit.
///
/// `POST /api/editor/{id}/lessons/{lesson_id}/cancel`
#[tracing::instrument(skip(state))]
pub async fn editor_cancel_lesson(
    State(state): State<AppState>,
    Path((editor_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.cancel_lesson_inline(lesson_id);
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Delete a lesson.
///
/// `DELETE /api/editor/{id}/lessons/{lesson_id}`
#[tracing::instrument(skip(state))]
pub async fn editor_delete_lesson(
    State(state): State<AppState>,
    Path((editor_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EditorSnapshot>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    guard.delete_lesson(lesson_id).await?;
    Ok(Json(snapshot(editor_id, &guard)))
}

/// Apply a completed drag gesture.
///
/// `POST /api/editor/{id}/reorder`
#[tracing::instrument(skip(state, body))]
pub async fn editor_reorder(
    State(state): State<AppState>,
    Path(editor_id): Path<Uuid>,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<ReorderResponse>, CatalogError> {
    let session = session(&state, editor_id)?;
    let mut guard = session.lock().await;
    let applied = guard.reorder(body).await?;

    Ok(Json(ReorderResponse {
        applied,
        tree: guard.tree().clone(),
    }))
}
