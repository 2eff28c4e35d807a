//! Course editor session tests.
//!
//! Drives [`EditorSession`] against a scripted in-memory store that records
//! call order, covering the persistence contracts: cascade delete ordering,
//! title-only renames, sequential reorder writes (moved entity first), and
//! the keep-local-state-on-failure reorder policy.
//!
//! Run with: `cargo test --test editor_session_test`

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use at_server::catalog::session::{DragLocation, ReorderKind, ReorderRequest};
use at_server::catalog::types::{
    Course, CourseStatus, LessonRow, LessonStatus, ModuleRow, UpdateCourseRequest,
};
use at_server::catalog::{CatalogError, CatalogStore, EditorSession, StoreError};

// ============================================================================
// Recording store
// ============================================================================

/// One recorded store invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StoreCall {
    FetchCourse(Uuid),
    ListModules(Uuid),
    ListLessons(Vec<Uuid>),
    InsertModule {
        course_id: Uuid,
        title: String,
        position: i32,
    },
    RenameModule {
        id: Uuid,
        title: String,
    },
    SetModulePosition {
        id: Uuid,
        position: i32,
    },
    DeleteModule(Uuid),
    InsertLesson {
        module_id: Uuid,
        title: String,
        position: i32,
    },
    RenameLesson {
        id: Uuid,
        title: String,
    },
    SetLessonPosition {
        id: Uuid,
        position: i32,
    },
    SetLessonPlacement {
        id: Uuid,
        module_id: Uuid,
        position: i32,
    },
    DeleteLessonsInModule(Uuid),
    DeleteLesson(Uuid),
}

/// In-memory store that serves fixtures and records every call. Operations
/// named in `failing` return `StoreError::Unavailable`.
struct RecordingStore {
    course: Course,
    modules: Vec<ModuleRow>,
    lessons: Vec<LessonRow>,
    calls: Mutex<Vec<StoreCall>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl RecordingStore {
    fn new(course: Course, modules: Vec<ModuleRow>, lessons: Vec<LessonRow>) -> Arc<Self> {
        Arc::new(Self {
            course,
            modules,
            lessons,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    fn fail_on(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(StoreError::Unavailable(op.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for RecordingStore {
    async fn fetch_course(&self, course_id: Uuid) -> Result<Course, StoreError> {
        self.record(StoreCall::FetchCourse(course_id));
        self.check("fetch_course")?;
        if self.course.id == course_id {
            Ok(self.course.clone())
        } else {
            Err(StoreError::NotFound("Course"))
        }
    }

    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<ModuleRow>, StoreError> {
        self.record(StoreCall::ListModules(course_id));
        self.check("list_modules")?;
        Ok(self.modules.clone())
    }

    async fn list_lessons(&self, module_ids: &[Uuid]) -> Result<Vec<LessonRow>, StoreError> {
        self.record(StoreCall::ListLessons(module_ids.to_vec()));
        self.check("list_lessons")?;
        Ok(self.lessons.clone())
    }

    async fn insert_module(
        &self,
        course_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<ModuleRow, StoreError> {
        self.record(StoreCall::InsertModule {
            course_id,
            title: title.to_string(),
            position,
        });
        self.check("insert_module")?;
        Ok(module_row_with(Uuid::now_v7(), course_id, title, position))
    }

    async fn rename_module(&self, module_id: Uuid, title: &str) -> Result<(), StoreError> {
        self.record(StoreCall::RenameModule {
            id: module_id,
            title: title.to_string(),
        });
        self.check("rename_module")
    }

    async fn set_module_position(&self, module_id: Uuid, position: i32) -> Result<(), StoreError> {
        self.record(StoreCall::SetModulePosition {
            id: module_id,
            position,
        });
        self.check("set_module_position")
    }

    async fn delete_module(&self, module_id: Uuid) -> Result<(), StoreError> {
        self.record(StoreCall::DeleteModule(module_id));
        self.check("delete_module")
    }

    async fn insert_lesson(
        &self,
        module_id: Uuid,
        title: &str,
        position: i32,
    ) -> Result<LessonRow, StoreError> {
        self.record(StoreCall::InsertLesson {
            module_id,
            title: title.to_string(),
            position,
        });
        self.check("insert_lesson")?;
        Ok(lesson_row_with(Uuid::now_v7(), module_id, title, position))
    }

    async fn rename_lesson(&self, lesson_id: Uuid, title: &str) -> Result<(), StoreError> {
        self.record(StoreCall::RenameLesson {
            id: lesson_id,
            title: title.to_string(),
        });
        self.check("rename_lesson")
    }

    async fn set_lesson_position(&self, lesson_id: Uuid, position: i32) -> Result<(), StoreError> {
        self.record(StoreCall::SetLessonPosition {
            id: lesson_id,
            position,
        });
        self.check("set_lesson_position")
    }

    async fn set_lesson_placement(
        &self,
        lesson_id: Uuid,
        module_id: Uuid,
        position: i32,
    ) -> Result<(), StoreError> {
        self.record(StoreCall::SetLessonPlacement {
            id: lesson_id,
            module_id,
            position,
        });
        self.check("set_lesson_placement")
    }

    async fn delete_lessons_in_module(&self, module_id: Uuid) -> Result<(), StoreError> {
        self.record(StoreCall::DeleteLessonsInModule(module_id));
        self.check("delete_lessons_in_module")
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> Result<(), StoreError> {
        self.record(StoreCall::DeleteLesson(lesson_id));
        self.check("delete_lesson")
    }

    async fn update_course(
        &self,
        _course_id: Uuid,
        _fields: &UpdateCourseRequest,
    ) -> Result<Course, StoreError> {
        unimplemented!("not exercised by editor sessions")
    }

    async fn replace_course_subjects(
        &self,
        _course_id: Uuid,
        _subject_ids: &[Uuid],
    ) -> Result<(), StoreError> {
        unimplemented!("not exercised by editor sessions")
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn course_row(id: Uuid) -> Course {
    Course {
        id,
        title: "Rust Fundamentals".to_string(),
        status: CourseStatus::Draft,
        summary: String::new(),
        description: String::new(),
        is_featured: false,
        access_days: None,
        objectives: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn module_row_with(id: Uuid, course_id: Uuid, title: &str, position: i32) -> ModuleRow {
    ModuleRow {
        id,
        course_id,
        title: title.to_string(),
        position,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn lesson_row_with(id: Uuid, module_id: Uuid, title: &str, position: i32) -> LessonRow {
    LessonRow {
        id,
        module_id,
        title: title.to_string(),
        status: LessonStatus::Draft,
        position,
        content: String::new(),
        video_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

struct Fixture {
    store: Arc<RecordingStore>,
    course_id: Uuid,
    module_a: Uuid,
    module_b: Uuid,
    lessons_a: Vec<Uuid>,
    lesson_b: Uuid,
}

/// Course with Module A = [L1, L2, L3] and Module B = [L4].
fn fixture() -> Fixture {
    let course_id = Uuid::now_v7();
    let module_a = Uuid::now_v7();
    let module_b = Uuid::now_v7();
    let lessons_a: Vec<Uuid> = (0..3).map(|_| Uuid::now_v7()).collect();
    let lesson_b = Uuid::now_v7();

    let modules = vec![
        module_row_with(module_a, course_id, "Module A", 1),
        module_row_with(module_b, course_id, "Module B", 2),
    ];
    let lessons = vec![
        lesson_row_with(lessons_a[0], module_a, "L1", 1),
        lesson_row_with(lessons_a[1], module_a, "L2", 2),
        lesson_row_with(lessons_a[2], module_a, "L3", 3),
        lesson_row_with(lesson_b, module_b, "L4", 1),
    ];

    Fixture {
        store: RecordingStore::new(course_row(course_id), modules, lessons),
        course_id,
        module_a,
        module_b,
        lessons_a,
        lesson_b,
    }
}

async fn open_session(fx: &Fixture) -> EditorSession {
    let store: Arc<dyn CatalogStore> = fx.store.clone();
    let session = EditorSession::load(store, fx.course_id).await.unwrap();
    fx.store.calls.lock().unwrap().clear();
    session
}

fn module_drag(course_id: Uuid, from: usize, to: usize) -> ReorderRequest {
    ReorderRequest {
        kind: ReorderKind::Module,
        source: DragLocation {
            container: course_id,
            index: from,
        },
        destination: Some(DragLocation {
            container: course_id,
            index: to,
        }),
    }
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn test_load_fetches_course_then_modules_then_lessons() {
    let fx = fixture();
    let store: Arc<dyn CatalogStore> = fx.store.clone();

    let session = EditorSession::load(store, fx.course_id).await.unwrap();

    assert_eq!(
        fx.store.calls(),
        vec![
            StoreCall::FetchCourse(fx.course_id),
            StoreCall::ListModules(fx.course_id),
            StoreCall::ListLessons(vec![fx.module_a, fx.module_b]),
        ]
    );
    assert_eq!(session.tree().modules().len(), 2);
    assert!(session.tree().modules().iter().all(|m| m.expanded));
}

#[tokio::test]
async fn test_load_unknown_course_errors() {
    let fx = fixture();
    let store: Arc<dyn CatalogStore> = fx.store.clone();

    let result = EditorSession::load(store, Uuid::now_v7()).await;

    assert!(matches!(
        result,
        Err(CatalogError::Store(StoreError::NotFound("Course")))
    ));
}

// ============================================================================
// Inline save
// ============================================================================

#[tokio::test]
async fn test_save_transient_module_inserts_and_replaces_id() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    let temp_id = session.add_module_inline();
    session.save_module_inline(temp_id, "Module C").await.unwrap();

    assert_eq!(
        fx.store.calls(),
        vec![StoreCall::InsertModule {
            course_id: fx.course_id,
            title: "Module C".to_string(),
            position: 3,
        }]
    );
    // The draft id was replaced in place by the store-assigned row.
    assert!(session.tree().find_module(temp_id).is_none());
    let node = &session.tree().modules()[2];
    assert_eq!(node.title, "Module C");
    assert!(!node.is_new);
    assert!(session.editing().is_none());
}

#[tokio::test]
async fn test_rename_module_updates_title_only() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    session.begin_module_edit(fx.module_a).unwrap();
    session
        .save_module_inline(fx.module_a, "Introduction")
        .await
        .unwrap();

    assert_eq!(
        fx.store.calls(),
        vec![StoreCall::RenameModule {
            id: fx.module_a,
            title: "Introduction".to_string(),
        }]
    );
    let node = session.tree().find_module(fx.module_a).unwrap();
    assert_eq!(node.title, "Introduction");
    assert_eq!(node.position, 1);
}

#[tokio::test]
async fn test_blank_title_is_gated_before_any_remote_call() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    session.begin_module_edit(fx.module_a).unwrap();
    let result = session.save_module_inline(fx.module_a, "   ").await;

    assert!(matches!(result, Err(CatalogError::Validation(_))));
    assert!(fx.store.calls().is_empty());
    assert_eq!(session.tree().find_module(fx.module_a).unwrap().title, "Module A");
}

#[tokio::test]
async fn test_save_failure_exits_edit_mode_without_rollback() {
    let fx = fixture();
    let mut session = open_session(&fx).await;
    fx.store.fail_on("rename_module");

    session.begin_module_edit(fx.module_a).unwrap();
    let result = session.save_module_inline(fx.module_a, "Introduction").await;

    assert!(matches!(result, Err(CatalogError::Store(_))));
    assert!(session.editing().is_none());
    // Title untouched locally: the rename never applied.
    assert_eq!(session.tree().find_module(fx.module_a).unwrap().title, "Module A");
}

#[tokio::test]
async fn test_save_transient_lesson_inserts_at_draft_position() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    let temp_id = session.add_lesson_inline(fx.module_b).unwrap();
    session.save_lesson_inline(temp_id, "L5").await.unwrap();

    assert_eq!(
        fx.store.calls(),
        vec![StoreCall::InsertLesson {
            module_id: fx.module_b,
            title: "L5".to_string(),
            position: 2,
        }]
    );
    let module = session.tree().find_module(fx.module_b).unwrap();
    assert_eq!(module.lessons.len(), 2);
    assert!(module.lessons.iter().all(|l| !l.is_new));
}

#[tokio::test]
async fn test_cancel_transient_lesson_leaves_no_orphan() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    let temp_id = session.add_lesson_inline(fx.module_b).unwrap();
    session.cancel_lesson_inline(temp_id);

    assert!(fx.store.calls().is_empty());
    assert_eq!(session.tree().find_module(fx.module_b).unwrap().lessons.len(), 1);
    assert!(session.editing().is_none());
}

// ============================================================================
// Reorder persistence
// ============================================================================

#[tokio::test]
async fn test_module_reorder_persists_moved_entity_first() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    let applied = session
        .reorder(module_drag(fx.course_id, 0, 1))
        .await
        .unwrap();

    assert!(applied);
    assert_eq!(
        fx.store.calls(),
        vec![
            StoreCall::SetModulePosition { id: fx.module_a, position: 2 },
            StoreCall::SetModulePosition { id: fx.module_b, position: 1 },
        ]
    );
}

#[tokio::test]
async fn test_cancelled_drag_is_a_noop() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    let applied = session
        .reorder(ReorderRequest {
            kind: ReorderKind::Module,
            source: DragLocation {
                container: fx.course_id,
                index: 0,
            },
            destination: None,
        })
        .await
        .unwrap();

    assert!(!applied);
    assert!(fx.store.calls().is_empty());
}

#[tokio::test]
async fn test_cross_module_move_persists_placement_then_source_then_dest() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    // Move L2 from A to the head of B.
    let applied = session
        .reorder(ReorderRequest {
            kind: ReorderKind::Lesson,
            source: DragLocation {
                container: fx.module_a,
                index: 1,
            },
            destination: Some(DragLocation {
                container: fx.module_b,
                index: 0,
            }),
        })
        .await
        .unwrap();
    assert!(applied);

    let calls = fx.store.calls();
    assert_eq!(
        calls[0],
        StoreCall::SetLessonPlacement {
            id: fx.lessons_a[1],
            module_id: fx.module_b,
            position: 1,
        }
    );
    // Then the source siblings (L1, L3), then the destination sibling (L4).
    assert_eq!(
        &calls[1..],
        &[
            StoreCall::SetLessonPosition { id: fx.lessons_a[0], position: 1 },
            StoreCall::SetLessonPosition { id: fx.lessons_a[2], position: 2 },
            StoreCall::SetLessonPosition { id: fx.lesson_b, position: 2 },
        ]
    );

    // Local tree: A=[L1,L3] positions 1,2; B=[L2,L4] positions 1,2.
    let module_a = session.tree().find_module(fx.module_a).unwrap();
    let module_b = session.tree().find_module(fx.module_b).unwrap();
    assert_eq!(
        module_a.lessons.iter().map(|l| l.position).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(
        module_b.lessons.iter().map(|l| (l.title.as_str(), l.position)).collect::<Vec<_>>(),
        vec![("L2", 1), ("L4", 2)]
    );
    assert_eq!(
        session.tree().find_lesson(fx.lessons_a[1]).unwrap().module_id,
        fx.module_b
    );
}

#[tokio::test]
async fn test_reorder_persistence_failure_keeps_optimistic_state() {
    let fx = fixture();
    let mut session = open_session(&fx).await;
    fx.store.fail_on("set_module_position");

    let result = session.reorder(module_drag(fx.course_id, 0, 1)).await;

    // The distinct reorder failure, not a generic store error.
    assert!(matches!(result, Err(CatalogError::ReorderPersistence(_))));
    // Local order was NOT reverted: the operator is told to refresh.
    assert_eq!(session.tree().modules()[0].id, fx.module_b);
    assert_eq!(session.tree().modules()[1].id, fx.module_a);
}

#[tokio::test]
async fn test_lesson_reorder_noop_while_module_mid_rename() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    session.begin_module_edit(fx.module_b).unwrap();
    let applied = session
        .reorder(ReorderRequest {
            kind: ReorderKind::Lesson,
            source: DragLocation {
                container: fx.module_a,
                index: 0,
            },
            destination: Some(DragLocation {
                container: fx.module_a,
                index: 2,
            }),
        })
        .await
        .unwrap();

    assert!(!applied);
    assert!(fx.store.calls().is_empty());
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn test_delete_module_removes_lessons_strictly_before_module_row() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    session.delete_module(fx.module_a).await.unwrap();

    let calls = fx.store.calls();
    assert_eq!(calls[0], StoreCall::DeleteLessonsInModule(fx.module_a));
    assert_eq!(calls[1], StoreCall::DeleteModule(fx.module_a));
    // Remaining sibling renumbered to keep positions dense.
    assert_eq!(
        &calls[2..],
        &[StoreCall::SetModulePosition { id: fx.module_b, position: 1 }]
    );
    assert_eq!(session.tree().modules().len(), 1);
    assert_eq!(session.tree().modules()[0].position, 1);
}

#[tokio::test]
async fn test_delete_module_aborts_local_removal_when_lesson_delete_fails() {
    let fx = fixture();
    let mut session = open_session(&fx).await;
    fx.store.fail_on("delete_lessons_in_module");

    let result = session.delete_module(fx.module_a).await;

    assert!(matches!(result, Err(CatalogError::Store(_))));
    // Nothing was removed locally and the module row was never touched.
    assert_eq!(session.tree().modules().len(), 2);
    assert!(!fx.store.calls().contains(&StoreCall::DeleteModule(fx.module_a)));
}

#[tokio::test]
async fn test_delete_transient_module_never_calls_store() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    let temp_id = session.add_module_inline();
    session.delete_module(temp_id).await.unwrap();

    assert!(fx.store.calls().is_empty());
    assert_eq!(session.tree().modules().len(), 2);
}

#[tokio::test]
async fn test_delete_lesson_renumbers_siblings() {
    let fx = fixture();
    let mut session = open_session(&fx).await;

    session.delete_lesson(fx.lessons_a[0]).await.unwrap();

    let calls = fx.store.calls();
    assert_eq!(calls[0], StoreCall::DeleteLesson(fx.lessons_a[0]));
    assert_eq!(
        &calls[1..],
        &[
            StoreCall::SetLessonPosition { id: fx.lessons_a[1], position: 1 },
            StoreCall::SetLessonPosition { id: fx.lessons_a[2], position: 2 },
        ]
    );
}
