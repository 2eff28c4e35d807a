//! Course Catalog Module
//!
//! Courses, modules, lessons, subjects, and the stateful course-content
//! editor. The editor keeps an in-memory tree per open session and drives
//! the remote store through [`store::CatalogStore`].

pub mod editor;
pub mod error;
pub mod handlers;
pub mod session;
pub mod store;
pub mod types;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::api::AppState;

pub use editor::EditorTree;
pub use error::CatalogError;
pub use session::EditorSession;
pub use store::{CatalogStore, PgCatalogStore, StoreError};

/// Create the catalog router. Mounted behind auth + admin middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        // Courses
        .route("/courses", get(handlers::list_courses).post(handlers::create_course))
        .route(
            "/courses/{id}",
            get(handlers::get_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        // Subjects
        .route("/subjects", get(handlers::list_subjects).post(handlers::create_subject))
        // Lesson content
        .route("/lessons/{id}", put(handlers::update_lesson))
        .route("/lessons/{id}/preview", get(handlers::preview_lesson))
        // Editor sessions
        .route("/courses/{id}/editor", post(handlers::open_editor))
        .route(
            "/editor/{id}",
            get(handlers::get_editor).delete(handlers::close_editor),
        )
        .route("/editor/{id}/reorder", post(handlers::editor_reorder))
        .route("/editor/{id}/modules", post(handlers::editor_add_module))
        .route(
            "/editor/{id}/modules/{module_id}",
            put(handlers::editor_save_module).delete(handlers::editor_delete_module),
        )
        .route(
            "/editor/{id}/modules/{module_id}/edit",
            post(handlers::editor_begin_module_edit),
        )
        .route(
            "/editor/{id}/modules/{module_id}/cancel",
            post(handlers::editor_cancel_module),
        )
        .route(
            "/editor/{id}/modules/{module_id}/toggle",
            post(handlers::editor_toggle_module),
        )
        .route(
            "/editor/{id}/modules/{module_id}/lessons",
            post(handlers::editor_add_lesson),
        )
        .route(
            "/editor/{id}/lessons/{lesson_id}",
            put(handlers::editor_save_lesson).delete(handlers::editor_delete_lesson),
        )
        .route(
            "/editor/{id}/lessons/{lesson_id}/edit",
            post(handlers::editor_begin_lesson_edit),
        )
        .route(
            "/editor/{id}/lessons/{lesson_id}/cancel",
            post(handlers::editor_cancel_lesson),
        )
}
