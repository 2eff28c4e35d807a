//! Server-side course editor sessions.
//!
//! An [`EditorSession`] pairs the in-memory [`EditorTree`] with the remote
//! store and drives every editor operation: local mutation first
//! (optimistic), then sequential, awaited persistence. Within one
//! operation the store calls are issued in a fixed order (moved entity
//! first, then remaining siblings) and each is awaited before the next —
//! higher latency, no concurrent-write risk. Across operations there is no
//! mutual exclusion beyond the session mutex; the store sees
//! last-write-wins.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use super::editor::{EditTarget, EditorTree, LessonMovePlan, PositionUpdate};
use super::error::CatalogError;
use super::store::CatalogStore;

/// What a completed drag gesture is reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReorderKind {
    Module,
    Lesson,
}

/// One end of a drag gesture: container id plus index within it.
///
/// For modules the container is the course; for lessons it is the parent
/// module.
#[derive(Debug, Clone, Copy, Deserialize, utoipa::ToSchema)]
pub struct DragLocation {
    pub container: Uuid,
    pub index: usize,
}

/// A completed drag gesture. `destination: None` means the drag was
/// cancelled mid-air and the whole request is a no-op.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct ReorderRequest {
    pub kind: ReorderKind,
    pub source: DragLocation,
    pub destination: Option<DragLocation>,
}

/// One operator's open editor for one course.
pub struct EditorSession {
    tree: EditorTree,
    store: Arc<dyn CatalogStore>,
}

impl EditorSession {
    /// Load the course tree from the store.
    ///
    /// Fetches the course, its modules ordered by position, then all
    /// lessons for those modules, and assembles the nested tree
    /// client-side. Errors surface as-is; nothing is retried.
    pub async fn load(store: Arc<dyn CatalogStore>, course_id: Uuid) -> Result<Self, CatalogError> {
        let course = store.fetch_course(course_id).await?;
        let modules = store.list_modules(course.id).await?;
        let module_ids: Vec<Uuid> = modules.iter().map(|m| m.id).collect();
        let lessons = store.list_lessons(&module_ids).await?;

        Ok(Self {
            tree: EditorTree::from_rows(course.id, modules, lessons),
            store,
        })
    }

    /// Current tree snapshot.
    #[must_use]
    pub const fn tree(&self) -> &EditorTree {
        &self.tree
    }

    /// The entity currently in inline-edit mode, if any.
    #[must_use]
    pub const fn editing(&self) -> Option<EditTarget> {
        self.tree.editing()
    }

    // ========================================================================
    // Module operations
    // ========================================================================

    /// Append a transient module and enter edit mode. Pure local mutation.
    pub fn add_module_inline(&mut self) -> Uuid {
        self.tree.add_module_inline()
    }

    /// Enter edit mode for an existing module.
    pub fn begin_module_edit(&mut self, id: Uuid) -> Result<(), CatalogError> {
        if self.tree.begin_module_edit(id) {
            Ok(())
        } else {
            Err(CatalogError::NotFound("Module".to_string()))
        }
    }

    /// Save a module's inline edit.
    ///
    /// A transient target becomes a store insert whose returned row
    /// replaces the draft in place; a permanent target gets a title-only
    /// update. Blank titles are gated before any remote call. On store
    /// failure edit mode is exited and the error surfaces; the local tree
    /// is not rolled back.
    pub async fn save_module_inline(
        &mut self,
        id: Uuid,
        title: &str,
    ) -> Result<(), CatalogError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::Validation("Title must not be blank".to_string()));
        }

        let node = self
            .tree
            .find_module(id)
            .ok_or_else(|| CatalogError::NotFound("Module".to_string()))?;

        if node.is_new {
            let position = node.position;
            match self
                .store
                .insert_module(self.tree.course_id(), title, position)
                .await
            {
                Ok(row) => {
                    self.tree.apply_module_saved(id, &row);
                    Ok(())
                }
                Err(e) => {
                    self.tree.exit_edit_mode();
                    Err(e.into())
                }
            }
        } else {
            match self.store.rename_module(id, title).await {
                Ok(()) => {
                    self.tree.apply_module_renamed(id, title);
                    Ok(())
                }
                Err(e) => {
                    self.tree.exit_edit_mode();
                    Err(e.into())
                }
            }
        }
    }

    /// Cancel a module's inline edit (transient drafts vanish).
    pub fn cancel_module_inline(&mut self, id: Uuid) {
        self.tree.cancel_module_inline(id);
    }

    /// Flip a module's expand/collapse flag. No remote effect.
    pub fn toggle_module(&mut self, id: Uuid) -> Result<(), CatalogError> {
        if self.tree.toggle_module(id) {
            Ok(())
        } else {
            Err(CatalogError::NotFound("Module".to_string()))
        }
    }

    /// Delete a module with its lessons.
    ///
    /// Remote order is fixed: child lessons first, then the module row.
    /// A failure at either step aborts before the local removal, so the
    /// tree stays consistent with whatever completed remotely. Sibling
    /// renumbering is persisted afterwards under the reorder failure
    /// policy (surfaced, not rolled back).
    pub async fn delete_module(&mut self, id: Uuid) -> Result<(), CatalogError> {
        let node = self
            .tree
            .find_module(id)
            .ok_or_else(|| CatalogError::NotFound("Module".to_string()))?;

        // A draft never reached the store; discard it locally.
        if node.is_new {
            self.tree.cancel_module_inline(id);
            return Ok(());
        }

        self.store.delete_lessons_in_module(id).await?;
        self.store.delete_module(id).await?;

        let Some((_removed, sibling_updates)) = self.tree.remove_module(id) else {
            return Ok(());
        };
        self.persist_module_positions(&sibling_updates).await
    }

    // ========================================================================
    // Lesson operations
    // ========================================================================

    /// Append a transient lesson to a module and enter edit mode.
    pub fn add_lesson_inline(&mut self, module_id: Uuid) -> Result<Uuid, CatalogError> {
        match self.tree.find_module(module_id) {
            None => Err(CatalogError::NotFound("Module".to_string())),
            Some(node) if node.is_new => Err(CatalogError::Validation(
                "Save the module before adding lessons".to_string(),
            )),
            Some(_) => self
                .tree
                .add_lesson_inline(module_id)
                .ok_or_else(|| CatalogError::NotFound("Module".to_string())),
        }
    }

    /// Enter edit mode for an existing lesson.
    pub fn begin_lesson_edit(&mut self, id: Uuid) -> Result<(), CatalogError> {
        if self.tree.begin_lesson_edit(id) {
            Ok(())
        } else {
            Err(CatalogError::NotFound("Lesson".to_string()))
        }
    }

    /// Save a lesson's inline edit. Mirrors [`Self::save_module_inline`]
    /// one level down.
    pub async fn save_lesson_inline(
        &mut self,
        id: Uuid,
        title: &str,
    ) -> Result<(), CatalogError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::Validation("Title must not be blank".to_string()));
        }

        let node = self
            .tree
            .find_lesson(id)
            .ok_or_else(|| CatalogError::NotFound("Lesson".to_string()))?;

        if node.is_new {
            let (module_id, position) = (node.module_id, node.position);
            match self.store.insert_lesson(module_id, title, position).await {
                Ok(row) => {
                    self.tree.apply_lesson_saved(id, &row);
                    Ok(())
                }
                Err(e) => {
                    self.tree.exit_edit_mode();
                    Err(e.into())
                }
            }
        } else {
            match self.store.rename_lesson(id, title).await {
                Ok(()) => {
                    self.tree.apply_lesson_renamed(id, title);
                    Ok(())
                }
                Err(e) => {
                    self.tree.exit_edit_mode();
                    Err(e.into())
                }
            }
        }
    }

    /// Cancel a lesson's inline edit (transient drafts vanish).
    pub fn cancel_lesson_inline(&mut self, id: Uuid) {
        self.tree.cancel_lesson_inline(id);
    }

    /// Delete a lesson.
    pub async fn delete_lesson(&mut self, id: Uuid) -> Result<(), CatalogError> {
        let node = self
            .tree
            .find_lesson(id)
            .ok_or_else(|| CatalogError::NotFound("Lesson".to_string()))?;

        if node.is_new {
            self.tree.cancel_lesson_inline(id);
            return Ok(());
        }

        self.store.delete_lesson(id).await?;

        let Some((_removed, sibling_updates)) = self.tree.remove_lesson(id) else {
            return Ok(());
        };
        self.persist_lesson_positions(&sibling_updates).await
    }

    // ========================================================================
    // Reordering
    // ========================================================================

    /// Apply a completed drag gesture.
    ///
    /// Returns `Ok(false)` for no-op gestures (cancelled drag, same slot,
    /// ineligible target). The local splice is applied before persistence
    /// starts; persistence failures surface as
    /// [`CatalogError::ReorderPersistence`] and the local tree is kept
    /// as-is — the operator is told to refresh.
    pub async fn reorder(&mut self, request: ReorderRequest) -> Result<bool, CatalogError> {
        let Some(destination) = request.destination else {
            return Ok(false);
        };

        match request.kind {
            ReorderKind::Module => {
                // Module drags are course-level; reject a stale container id.
                if request.source.container != self.tree.course_id()
                    || destination.container != self.tree.course_id()
                {
                    return Ok(false);
                }

                let Some(plan) = self
                    .tree
                    .reorder_modules(request.source.index, destination.index)
                else {
                    return Ok(false);
                };
                self.persist_module_positions(&plan).await?;
                Ok(true)
            }
            ReorderKind::Lesson => {
                let Some(plan) = self.tree.move_lesson(
                    (request.source.container, request.source.index),
                    (destination.container, destination.index),
                ) else {
                    return Ok(false);
                };
                self.persist_lesson_move(&plan).await?;
                Ok(true)
            }
        }
    }

    /// Persist module positions sequentially, one awaited write at a time.
    async fn persist_module_positions(
        &self,
        updates: &[PositionUpdate],
    ) -> Result<(), CatalogError> {
        for update in updates {
            self.store
                .set_module_position(update.id, update.position)
                .await
                .map_err(CatalogError::ReorderPersistence)?;
        }
        Ok(())
    }

    /// Persist a lesson move: the moved lesson's placement first, then the
    /// source siblings, then the destination siblings.
    async fn persist_lesson_move(&self, plan: &LessonMovePlan) -> Result<(), CatalogError> {
        self.store
            .set_lesson_placement(plan.moved.id, plan.moved.module_id, plan.moved.position)
            .await
            .map_err(CatalogError::ReorderPersistence)?;

        self.persist_lesson_positions(&plan.source_updates).await?;
        self.persist_lesson_positions(&plan.dest_updates).await
    }

    async fn persist_lesson_positions(
        &self,
        updates: &[PositionUpdate],
    ) -> Result<(), CatalogError> {
        for update in updates {
            self.store
                .set_lesson_position(update.id, update.position)
                .await
                .map_err(CatalogError::ReorderPersistence)?;
        }
        Ok(())
    }
}
