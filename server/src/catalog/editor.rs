//! Course-content editor state machine.
//!
//! An in-memory Module→Lesson tree for one course, supporting inline
//! create/rename/cancel, expand/collapse, and cross-container reordering.
//! Everything here is synchronous and I/O-free: structural operations
//! return persistence *plans* (ordered position updates) which
//! [`super::session::EditorSession`] replays against the remote store.
//!
//! Invariants:
//! - Positions are 1-based and dense within their container; every
//!   structural change renumbers the full sibling set (no fractional or
//!   gap-based assignment, a few extra writes buy zero drift).
//! - A transient node (`is_new`) has a client-generated id until the store
//!   returns the permanent row; cancelling removes it entirely, saving
//!   replaces the id in place.
//! - Transient nodes and nodes in edit mode are excluded from drag, and all
//!   lessons are undraggable while any module is mid-rename (structural
//!   mutation must not race a pending text edit).

use serde::Serialize;
use uuid::Uuid;

use super::types::{LessonRow, LessonStatus, ModuleRow};

/// Module node in the editor tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleNode {
    pub id: Uuid,
    pub title: String,
    pub position: i32,
    pub expanded: bool,
    pub is_new: bool,
    pub lessons: Vec<LessonNode>,
}

/// Lesson node in the editor tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonNode {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub status: LessonStatus,
    pub position: i32,
    pub is_new: bool,
}

/// The entity currently in inline-edit mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EditTarget {
    Module(Uuid),
    Lesson(Uuid),
}

/// A single position write to replay against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub id: Uuid,
    pub position: i32,
}

/// Where a moved lesson landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPlacement {
    pub id: Uuid,
    pub module_id: Uuid,
    pub position: i32,
}

/// Persistence plan for a lesson drag: the moved lesson's placement is
/// written first, then the source siblings, then the destination siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonMovePlan {
    pub moved: LessonPlacement,
    pub source_updates: Vec<PositionUpdate>,
    /// Empty for a within-module reorder.
    pub dest_updates: Vec<PositionUpdate>,
}

/// In-memory editor tree for one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorTree {
    course_id: Uuid,
    modules: Vec<ModuleNode>,
    editing: Option<EditTarget>,
}

impl EditorTree {
    /// Assemble the nested tree from store rows (the store has no native
    /// nested fetch for this shape). All modules start expanded.
    #[must_use]
    pub fn from_rows(course_id: Uuid, modules: Vec<ModuleRow>, lessons: Vec<LessonRow>) -> Self {
        let mut nodes: Vec<ModuleNode> = modules
            .into_iter()
            .map(|m| ModuleNode {
                id: m.id,
                title: m.title,
                position: m.position,
                expanded: true,
                is_new: false,
                lessons: Vec::new(),
            })
            .collect();

        // Lessons arrive ordered by position; distribute preserving order.
        for lesson in lessons {
            if let Some(module) = nodes.iter_mut().find(|m| m.id == lesson.module_id) {
                module.lessons.push(LessonNode {
                    id: lesson.id,
                    module_id: lesson.module_id,
                    title: lesson.title,
                    status: lesson.status,
                    position: lesson.position,
                    is_new: false,
                });
            }
        }

        Self {
            course_id,
            modules: nodes,
            editing: None,
        }
    }

    #[must_use]
    pub const fn course_id(&self) -> Uuid {
        self.course_id
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleNode] {
        &self.modules
    }

    #[must_use]
    pub const fn editing(&self) -> Option<EditTarget> {
        self.editing
    }

    #[must_use]
    pub fn find_module(&self, id: Uuid) -> Option<&ModuleNode> {
        self.modules.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn find_lesson(&self, id: Uuid) -> Option<&LessonNode> {
        self.modules.iter().flat_map(|m| &m.lessons).find(|l| l.id == id)
    }

    fn find_module_mut(&mut self, id: Uuid) -> Option<&mut ModuleNode> {
        self.modules.iter_mut().find(|m| m.id == id)
    }

    /// Clear the inline-edit marker.
    pub fn exit_edit_mode(&mut self) {
        self.editing = None;
    }

    // ========================================================================
    // Inline create / rename / cancel
    // ========================================================================

    /// Append a transient module and enter edit mode for it.
    ///
    /// Pure local mutation; nothing is persisted until the inline save.
    pub fn add_module_inline(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        let position = self.modules.iter().map(|m| m.position).max().unwrap_or(0) + 1;

        self.modules.push(ModuleNode {
            id,
            title: String::new(),
            position,
            expanded: true,
            is_new: true,
            lessons: Vec::new(),
        });
        self.editing = Some(EditTarget::Module(id));
        id
    }

    /// Enter edit mode for an existing module. Returns false if unknown.
    pub fn begin_module_edit(&mut self, id: Uuid) -> bool {
        if self.find_module(id).is_none() {
            return false;
        }
        self.editing = Some(EditTarget::Module(id));
        true
    }

    /// Cancel a module's inline edit.
    ///
    /// A transient module is removed from the tree entirely (no orphaned
    /// temporary rows); a permanent one just leaves edit mode untouched.
    pub fn cancel_module_inline(&mut self, id: Uuid) {
        if self.find_module(id).is_some_and(|m| m.is_new) {
            self.modules.retain(|m| m.id != id);
        }
        if self.editing == Some(EditTarget::Module(id)) {
            self.editing = None;
        }
    }

    /// Replace a saved transient module with the store's returned row,
    /// preserving its place in the tree.
    pub fn apply_module_saved(&mut self, temp_id: Uuid, row: &ModuleRow) {
        if let Some(module) = self.find_module_mut(temp_id) {
            module.id = row.id;
            module.title.clone_from(&row.title);
            module.position = row.position;
            module.is_new = false;
            module.expanded = true;
            module.lessons.clear();
        }
        if self.editing == Some(EditTarget::Module(temp_id)) {
            self.editing = None;
        }
    }

    /// Apply a rename to a permanent module; only the title changes.
    pub fn apply_module_renamed(&mut self, id: Uuid, title: &str) {
        if let Some(module) = self.find_module_mut(id) {
            module.title = title.to_string();
        }
        if self.editing == Some(EditTarget::Module(id)) {
            self.editing = None;
        }
    }

    /// Flip a module's expand/collapse flag. Pure UI state, never persisted.
    pub fn toggle_module(&mut self, id: Uuid) -> bool {
        self.find_module_mut(id).is_some_and(|m| {
            m.expanded = !m.expanded;
            true
        })
    }

    /// Append a transient lesson to a module and enter edit mode for it.
    ///
    /// Returns `None` if the module is unknown or itself transient (a
    /// module must be saved before lessons can hang off it).
    pub fn add_lesson_inline(&mut self, module_id: Uuid) -> Option<Uuid> {
        let module = self.find_module_mut(module_id).filter(|m| !m.is_new)?;

        let id = Uuid::new_v4();
        let position = module.lessons.iter().map(|l| l.position).max().unwrap_or(0) + 1;
        module.lessons.push(LessonNode {
            id,
            module_id,
            title: String::new(),
            status: LessonStatus::Draft,
            position,
            is_new: true,
        });
        self.editing = Some(EditTarget::Lesson(id));
        Some(id)
    }

    /// Enter edit mode for an existing lesson. Returns false if unknown.
    pub fn begin_lesson_edit(&mut self, id: Uuid) -> bool {
        if self.find_lesson(id).is_none() {
            return false;
        }
        self.editing = Some(EditTarget::Lesson(id));
        true
    }

    /// Cancel a lesson's inline edit (transient lessons are removed).
    pub fn cancel_lesson_inline(&mut self, id: Uuid) {
        for module in &mut self.modules {
            if module.lessons.iter().any(|l| l.id == id && l.is_new) {
                module.lessons.retain(|l| l.id != id);
            }
        }
        if self.editing == Some(EditTarget::Lesson(id)) {
            self.editing = None;
        }
    }

    /// Replace a saved transient lesson with the store's returned row.
    pub fn apply_lesson_saved(&mut self, temp_id: Uuid, row: &LessonRow) {
        for module in &mut self.modules {
            if let Some(lesson) = module.lessons.iter_mut().find(|l| l.id == temp_id) {
                lesson.id = row.id;
                lesson.module_id = row.module_id;
                lesson.title.clone_from(&row.title);
                lesson.status = row.status;
                lesson.position = row.position;
                lesson.is_new = false;
            }
        }
        if self.editing == Some(EditTarget::Lesson(temp_id)) {
            self.editing = None;
        }
    }

    /// Apply a rename to a permanent lesson; only the title changes.
    pub fn apply_lesson_renamed(&mut self, id: Uuid, title: &str) {
        for module in &mut self.modules {
            if let Some(lesson) = module.lessons.iter_mut().find(|l| l.id == id) {
                lesson.title = title.to_string();
            }
        }
        if self.editing == Some(EditTarget::Lesson(id)) {
            self.editing = None;
        }
    }

    // ========================================================================
    // Reordering
    // ========================================================================

    /// Reorder modules within the course.
    ///
    /// Splices the dragged module from `source_index` to `dest_index`, then
    /// renumbers every module to its 1-based array index. Returns the
    /// persistence plan (moved module first, then remaining siblings), or
    /// `None` when the drag is a no-op: out-of-range source, same slot,
    /// transient target, or target mid-edit.
    pub fn reorder_modules(
        &mut self,
        source_index: usize,
        dest_index: usize,
    ) -> Option<Vec<PositionUpdate>> {
        if source_index >= self.modules.len() {
            return None;
        }

        let dragged_id = self.modules[source_index].id;
        if self.modules[source_index].is_new {
            return None;
        }
        if self.editing == Some(EditTarget::Module(dragged_id)) {
            return None;
        }

        let dest_index = dest_index.min(self.modules.len() - 1);
        if source_index == dest_index {
            return None;
        }

        let module = self.modules.remove(source_index);
        self.modules.insert(dest_index, module);
        self.renumber_modules();

        Some(self.module_updates_moved_first(dragged_id))
    }

    /// Move a lesson within or across modules.
    ///
    /// `source`/`dest` are (module id, index) pairs. Returns the
    /// persistence plan or `None` for a no-op drag: unknown containers,
    /// out-of-range source, same slot, transient lesson, lesson mid-edit,
    /// or any module currently mid-rename (all lesson drags are disabled
    /// while a module title edit is pending).
    pub fn move_lesson(
        &mut self,
        source: (Uuid, usize),
        dest: (Uuid, usize),
    ) -> Option<LessonMovePlan> {
        let (source_module_id, source_index) = source;
        let (dest_module_id, dest_index) = dest;

        if matches!(self.editing, Some(EditTarget::Module(_))) {
            return None;
        }
        if self.find_module(dest_module_id).is_none() {
            return None;
        }

        let source_module = self.find_module(source_module_id)?;
        let dragged = source_module.lessons.get(source_index)?;
        if dragged.is_new {
            return None;
        }
        if self.editing == Some(EditTarget::Lesson(dragged.id)) {
            return None;
        }

        if source_module_id == dest_module_id {
            return self.reorder_lesson_within(source_module_id, source_index, dest_index);
        }
        self.move_lesson_across(source_module_id, source_index, dest_module_id, dest_index)
    }

    fn reorder_lesson_within(
        &mut self,
        module_id: Uuid,
        source_index: usize,
        dest_index: usize,
    ) -> Option<LessonMovePlan> {
        let module = self.find_module_mut(module_id)?;
        let dest_index = dest_index.min(module.lessons.len() - 1);
        if source_index == dest_index {
            return None;
        }

        let lesson = module.lessons.remove(source_index);
        let moved_id = lesson.id;
        module.lessons.insert(dest_index, lesson);
        Self::renumber_lessons(module);

        let moved = module
            .lessons
            .iter()
            .find(|l| l.id == moved_id)
            .map(|l| LessonPlacement {
                id: l.id,
                module_id,
                position: l.position,
            })?;
        let source_updates = module
            .lessons
            .iter()
            .filter(|l| !l.is_new && l.id != moved_id)
            .map(|l| PositionUpdate {
                id: l.id,
                position: l.position,
            })
            .collect();

        Some(LessonMovePlan {
            moved,
            source_updates,
            dest_updates: Vec::new(),
        })
    }

    fn move_lesson_across(
        &mut self,
        source_module_id: Uuid,
        source_index: usize,
        dest_module_id: Uuid,
        dest_index: usize,
    ) -> Option<LessonMovePlan> {
        // Remove from the source container and re-home the node.
        let mut lesson = {
            let source_module = self.find_module_mut(source_module_id)?;
            let lesson = source_module.lessons.remove(source_index);
            Self::renumber_lessons(source_module);
            lesson
        };
        lesson.module_id = dest_module_id;
        let moved_id = lesson.id;

        if let Some(dest_module) = self.find_module_mut(dest_module_id) {
            let dest_index = dest_index.min(dest_module.lessons.len());
            dest_module.lessons.insert(dest_index, lesson);
            Self::renumber_lessons(dest_module);
        } else {
            // Caller verified the destination, but restore rather than drop
            // the lesson if it is ever absent.
            lesson.module_id = source_module_id;
            if let Some(source_module) = self.find_module_mut(source_module_id) {
                let index = source_index.min(source_module.lessons.len());
                source_module.lessons.insert(index, lesson);
                Self::renumber_lessons(source_module);
            }
            return None;
        }

        let moved = self.find_lesson(moved_id).map(|l| LessonPlacement {
            id: l.id,
            module_id: l.module_id,
            position: l.position,
        })?;
        let source_updates = self.lesson_updates(source_module_id, moved_id);
        let dest_updates = self.lesson_updates(dest_module_id, moved_id);

        Some(LessonMovePlan {
            moved,
            source_updates,
            dest_updates,
        })
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove a module locally and renumber the remaining siblings.
    ///
    /// Returns the removed node and the sibling renumber plan. The caller
    /// deletes remotely *before* invoking this; a remote failure must leave
    /// the tree untouched.
    pub fn remove_module(&mut self, id: Uuid) -> Option<(ModuleNode, Vec<PositionUpdate>)> {
        let index = self.modules.iter().position(|m| m.id == id)?;
        let removed = self.modules.remove(index);
        if self.editing == Some(EditTarget::Module(id)) {
            self.editing = None;
        }

        let before: Vec<(Uuid, i32)> =
            self.modules.iter().map(|m| (m.id, m.position)).collect();
        self.renumber_modules();

        // Only persist siblings whose position actually shifted.
        let updates = self
            .modules
            .iter()
            .zip(before)
            .filter(|(m, (_, old))| !m.is_new && m.position != *old)
            .map(|(m, _)| PositionUpdate {
                id: m.id,
                position: m.position,
            })
            .collect();

        Some((removed, updates))
    }

    /// Remove a lesson locally and renumber its siblings.
    pub fn remove_lesson(&mut self, id: Uuid) -> Option<(LessonNode, Vec<PositionUpdate>)> {
        let module_id = self.find_lesson(id)?.module_id;
        let module = self.find_module_mut(module_id)?;

        let index = module.lessons.iter().position(|l| l.id == id)?;
        let removed = module.lessons.remove(index);

        let before: Vec<(Uuid, i32)> =
            module.lessons.iter().map(|l| (l.id, l.position)).collect();
        Self::renumber_lessons(module);
        let updates = module
            .lessons
            .iter()
            .zip(before)
            .filter(|(l, (_, old))| !l.is_new && l.position != *old)
            .map(|(l, _)| PositionUpdate {
                id: l.id,
                position: l.position,
            })
            .collect();

        if self.editing == Some(EditTarget::Lesson(id)) {
            self.editing = None;
        }

        Some((removed, updates))
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn renumber_modules(&mut self) {
        for (index, module) in self.modules.iter_mut().enumerate() {
            module.position = index as i32 + 1;
        }
    }

    fn renumber_lessons(module: &mut ModuleNode) {
        for (index, lesson) in module.lessons.iter_mut().enumerate() {
            lesson.position = index as i32 + 1;
        }
    }

    /// Full module position plan with the moved entity first.
    fn module_updates_moved_first(&self, moved_id: Uuid) -> Vec<PositionUpdate> {
        self.modules
            .iter()
            .filter(|m| m.id == moved_id)
            .chain(self.modules.iter().filter(|m| !m.is_new && m.id != moved_id))
            .map(|m| PositionUpdate {
                id: m.id,
                position: m.position,
            })
            .collect()
    }

    fn lesson_updates(&self, module_id: Uuid, exclude: Uuid) -> Vec<PositionUpdate> {
        self.find_module(module_id)
            .map(|module| {
                module
                    .lessons
                    .iter()
                    .filter(|l| !l.is_new && l.id != exclude)
                    .map(|l| PositionUpdate {
                        id: l.id,
                        position: l.position,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn module_row(course_id: Uuid, title: &str, position: i32) -> ModuleRow {
        ModuleRow {
            id: Uuid::new_v4(),
            course_id,
            title: title.to_string(),
            position,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lesson_row(module_id: Uuid, title: &str, position: i32) -> LessonRow {
        LessonRow {
            id: Uuid::new_v4(),
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

    /// Tree with modules A(3 lessons) and B(1 lesson).
    fn sample_tree() -> EditorTree {
        let course_id = Uuid::new_v4();
        let module_a = module_row(course_id, "Module A", 1);
        let module_b = module_row(course_id, "Module B", 2);
        let lessons = vec![
            lesson_row(module_a.id, "L1", 1),
            lesson_row(module_a.id, "L2", 2),
            lesson_row(module_a.id, "L3", 3),
            lesson_row(module_b.id, "L4", 1),
        ];
        EditorTree::from_rows(course_id, vec![module_a, module_b], lessons)
    }

    fn module_positions(tree: &EditorTree) -> Vec<i32> {
        tree.modules().iter().map(|m| m.position).collect()
    }

    #[test]
    fn test_load_assembles_tree_expanded() {
        let tree = sample_tree();

        assert_eq!(tree.modules().len(), 2);
        assert!(tree.modules().iter().all(|m| m.expanded));
        assert_eq!(tree.modules()[0].lessons.len(), 3);
        assert_eq!(tree.modules()[1].lessons.len(), 1);
        assert!(tree.editing().is_none());
    }

    #[test]
    fn test_add_module_appends_transient_at_next_position() {
        let mut tree = sample_tree();

        let id = tree.add_module_inline();

        let node = tree.find_module(id).unwrap();
        assert!(node.is_new);
        assert_eq!(node.position, 3);
        assert!(node.expanded);
        assert_eq!(tree.editing(), Some(EditTarget::Module(id)));
    }

    #[test]
    fn test_add_module_on_empty_course_starts_at_one() {
        let mut tree = EditorTree::from_rows(Uuid::new_v4(), vec![], vec![]);

        let id = tree.add_module_inline();

        assert_eq!(tree.find_module(id).unwrap().position, 1);
    }

    #[test]
    fn test_add_then_cancel_restores_tree_by_value() {
        let mut tree = sample_tree();
        let snapshot = tree.clone();

        let id = tree.add_module_inline();
        tree.cancel_module_inline(id);

        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_cancel_permanent_module_only_exits_edit_mode() {
        let mut tree = sample_tree();
        let id = tree.modules()[0].id;

        tree.begin_module_edit(id);
        tree.cancel_module_inline(id);

        assert_eq!(tree.modules().len(), 2);
        assert_eq!(tree.find_module(id).unwrap().title, "Module A");
        assert!(tree.editing().is_none());
    }

    #[test]
    fn test_apply_module_saved_replaces_id_in_place() {
        let mut tree = sample_tree();
        let temp_id = tree.add_module_inline();
        let row = module_row(tree.course_id(), "Fresh Module", 3);

        tree.apply_module_saved(temp_id, &row);

        assert!(tree.find_module(temp_id).is_none());
        let node = tree.find_module(row.id).unwrap();
        assert_eq!(node.title, "Fresh Module");
        assert_eq!(node.position, 3);
        assert!(!node.is_new);
        assert!(node.expanded);
        assert!(node.lessons.is_empty());
        // Tree position preserved: still the last module.
        assert_eq!(tree.modules()[2].id, row.id);
        assert!(tree.editing().is_none());
    }

    #[test]
    fn test_rename_changes_title_only() {
        let mut tree = sample_tree();
        let id = tree.modules()[0].id;
        tree.begin_module_edit(id);

        tree.apply_module_renamed(id, "Introduction");

        let node = tree.find_module(id).unwrap();
        assert_eq!(node.title, "Introduction");
        assert_eq!(node.position, 1);
        assert!(tree.editing().is_none());
    }

    #[test]
    fn test_toggle_module_flips_flag() {
        let mut tree = sample_tree();
        let id = tree.modules()[0].id;

        assert!(tree.toggle_module(id));
        assert!(!tree.find_module(id).unwrap().expanded);
        assert!(tree.toggle_module(id));
        assert!(tree.find_module(id).unwrap().expanded);
    }

    #[test]
    fn test_add_lesson_appends_transient() {
        let mut tree = sample_tree();
        let module_id = tree.modules()[0].id;

        let id = tree.add_lesson_inline(module_id).unwrap();

        let lesson = tree.find_lesson(id).unwrap();
        assert!(lesson.is_new);
        assert_eq!(lesson.position, 4);
        assert_eq!(tree.editing(), Some(EditTarget::Lesson(id)));
    }

    #[test]
    fn test_add_lesson_rejected_on_transient_module() {
        let mut tree = sample_tree();
        let draft = tree.add_module_inline();

        assert!(tree.add_lesson_inline(draft).is_none());
    }

    #[test]
    fn test_reorder_modules_renumbers_densely() {
        let mut tree = sample_tree();
        let first = tree.modules()[0].id;
        let second = tree.modules()[1].id;

        let plan = tree.reorder_modules(0, 1).unwrap();

        assert_eq!(tree.modules()[0].id, second);
        assert_eq!(tree.modules()[1].id, first);
        assert_eq!(module_positions(&tree), vec![1, 2]);
        // Moved entity persisted first.
        assert_eq!(plan[0], PositionUpdate { id: first, position: 2 });
        assert_eq!(plan[1], PositionUpdate { id: second, position: 1 });
    }

    #[test]
    fn test_reorder_same_slot_is_noop() {
        let mut tree = sample_tree();
        let snapshot = tree.clone();

        assert!(tree.reorder_modules(1, 1).is_none());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_reorder_transient_module_is_noop() {
        let mut tree = sample_tree();
        tree.add_module_inline();
        let snapshot = tree.clone();

        assert!(tree.reorder_modules(2, 0).is_none());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_reorder_module_mid_edit_is_noop() {
        let mut tree = sample_tree();
        let id = tree.modules()[0].id;
        tree.begin_module_edit(id);
        let snapshot = tree.clone();

        assert!(tree.reorder_modules(0, 1).is_none());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_lesson_reorder_within_module() {
        let mut tree = sample_tree();
        let module_id = tree.modules()[0].id;
        let l1 = tree.modules()[0].lessons[0].id;
        let l3 = tree.modules()[0].lessons[2].id;

        let plan = tree.move_lesson((module_id, 0), (module_id, 2)).unwrap();

        let titles: Vec<&str> = tree.modules()[0]
            .lessons
            .iter()
            .map(|l| l.title.as_str())
            .collect();
        assert_eq!(titles, vec!["L2", "L3", "L1"]);
        assert_eq!(
            tree.modules()[0].lessons.iter().map(|l| l.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            plan.moved,
            LessonPlacement { id: l1, module_id, position: 3 }
        );
        assert!(plan.dest_updates.is_empty());
        assert_eq!(plan.source_updates.len(), 2);
        assert!(plan.source_updates.contains(&PositionUpdate { id: l3, position: 2 }));
    }

    #[test]
    fn test_lesson_move_across_modules() {
        let mut tree = sample_tree();
        let module_a = tree.modules()[0].id;
        let module_b = tree.modules()[1].id;
        let l2 = tree.modules()[0].lessons[1].id;
        let l4 = tree.modules()[1].lessons[0].id;

        // Move L2 from A to the head of B.
        let plan = tree.move_lesson((module_a, 1), (module_b, 0)).unwrap();

        let a_titles: Vec<&str> = tree.modules()[0]
            .lessons
            .iter()
            .map(|l| l.title.as_str())
            .collect();
        let b_titles: Vec<&str> = tree.modules()[1]
            .lessons
            .iter()
            .map(|l| l.title.as_str())
            .collect();
        assert_eq!(a_titles, vec!["L1", "L3"]);
        assert_eq!(b_titles, vec!["L2", "L4"]);
        assert_eq!(
            tree.modules()[0].lessons.iter().map(|l| l.position).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(
            tree.modules()[1].lessons.iter().map(|l| l.position).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(tree.find_lesson(l2).unwrap().module_id, module_b);

        assert_eq!(
            plan.moved,
            LessonPlacement { id: l2, module_id: module_b, position: 1 }
        );
        // Source siblings renumbered, destination excludes the moved lesson.
        assert_eq!(plan.source_updates.len(), 2);
        assert_eq!(plan.dest_updates, vec![PositionUpdate { id: l4, position: 2 }]);
    }

    #[test]
    fn test_lesson_drag_disabled_while_module_mid_rename() {
        let mut tree = sample_tree();
        let module_a = tree.modules()[0].id;
        let module_b = tree.modules()[1].id;
        tree.begin_module_edit(module_b);
        let snapshot = tree.clone();

        assert!(tree.move_lesson((module_a, 0), (module_a, 2)).is_none());
        assert!(tree.move_lesson((module_a, 0), (module_b, 0)).is_none());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_transient_lesson_excluded_from_drag() {
        let mut tree = sample_tree();
        let module_id = tree.modules()[0].id;
        tree.add_lesson_inline(module_id).unwrap();
        tree.exit_edit_mode();
        let snapshot = tree.clone();

        // Index 3 is the transient lesson.
        assert!(tree.move_lesson((module_id, 3), (module_id, 0)).is_none());
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_remove_module_renumbers_remaining() {
        let mut tree = sample_tree();
        let first = tree.modules()[0].id;
        let second = tree.modules()[1].id;

        let (removed, updates) = tree.remove_module(first).unwrap();

        assert_eq!(removed.id, first);
        assert_eq!(module_positions(&tree), vec![1]);
        assert_eq!(updates, vec![PositionUpdate { id: second, position: 1 }]);
    }

    #[test]
    fn test_remove_last_module_needs_no_updates() {
        let mut tree = sample_tree();
        let second = tree.modules()[1].id;

        let (_, updates) = tree.remove_module(second).unwrap();

        assert!(updates.is_empty());
        assert_eq!(module_positions(&tree), vec![1]);
    }

    #[test]
    fn test_remove_lesson_renumbers_siblings() {
        let mut tree = sample_tree();
        let module_id = tree.modules()[0].id;
        let l1 = tree.modules()[0].lessons[0].id;

        let (removed, updates) = tree.remove_lesson(l1).unwrap();

        assert_eq!(removed.id, l1);
        assert_eq!(
            tree.modules()[0].lessons.iter().map(|l| l.position).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(updates.len(), 2);
        assert_eq!(tree.find_module(module_id).unwrap().lessons.len(), 2);
    }

    #[test]
    fn test_positions_stay_dense_through_mixed_operations() {
        let mut tree = sample_tree();

        let draft = tree.add_module_inline();
        let row = module_row(tree.course_id(), "Module C", 3);
        tree.apply_module_saved(draft, &row);
        tree.reorder_modules(2, 0).unwrap();
        let victim = tree.modules()[1].id;
        tree.remove_module(victim).unwrap();

        assert_eq!(module_positions(&tree), vec![1, 2]);
    }

    #[test]
    fn test_dest_index_clamped_to_container() {
        let mut tree = sample_tree();
        let module_a = tree.modules()[0].id;
        let module_b = tree.modules()[1].id;

        let plan = tree.move_lesson((module_a, 0), (module_b, 99)).unwrap();

        assert_eq!(plan.moved.position, 2);
        assert_eq!(tree.modules()[1].lessons.len(), 2);
    }
}
