//! Multi-item drag reordering within a folder plus cross-folder moves with
//! rollback. The drop surface reports *names* and a slot index; all order
//! math happens here against the live child list.

use std::collections::HashSet;

use crate::model::order::OrderStore;
use crate::model::vpath;

/// A completed drop as reported by the drag surface. `target_index` is the
/// slot the item adjacent to the drop occupied when the drag ended.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub source_folder: String,
    pub dest_folder: String,
    /// Dragged base names in selection order.
    pub dragged: Vec<String>,
    pub target_index: usize,
}

impl DropEvent {
    pub fn is_cross_folder(&self) -> bool {
        self.source_folder != self.dest_folder
    }
}

#[derive(Debug, Clone)]
pub struct DragSession {
    pub folder: String,
    pub dragged: Vec<String>,
}

/// Snapshot of the order records a cross-folder move may touch, taken before
/// asking the host to move anything.
#[derive(Debug, Clone)]
pub struct CrossMove {
    snapshots: Vec<(String, Option<Vec<String>>)>,
}

/// Tracks whether drag sorting is live and which drop surfaces have it. The
/// enable/disable toggle flips all surfaces at once; per-folder opt-outs stay
/// disabled until [`enable_folder`](Self::enable_folder) clears them.
#[derive(Debug, Default)]
pub struct DragController {
    sorting_enabled: bool,
    disabled_folders: HashSet<String>,
    session: Option<DragSession>,
    drag_delay_ms: u64,
}

impl DragController {
    pub fn new(drag_delay_ms: u64) -> Self {
        Self { drag_delay_ms, ..Self::default() }
    }

    pub fn drag_delay_ms(&self) -> u64 {
        self.drag_delay_ms
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.sorting_enabled = enabled;
        if !enabled {
            self.session = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sorting_enabled
    }

    pub fn disable_folder(&mut self, folder: &str) {
        self.disabled_folders.insert(folder.to_string());
    }

    pub fn enable_folder(&mut self, folder: &str) {
        self.disabled_folders.remove(folder);
    }

    pub fn accepts(&self, folder: &str) -> bool {
        self.sorting_enabled && !self.disabled_folders.contains(folder)
    }

    pub fn begin(&mut self, folder: &str, dragged: Vec<String>) -> bool {
        if !self.accepts(folder) {
            return false;
        }
        self.session = Some(DragSession { folder: folder.to_string(), dragged });
        true
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn end(&mut self) -> Option<DragSession> {
        self.session.take()
    }
}

/// Moves one name from wherever it is to `target`, clamped to the list.
pub(crate) fn reorder_array(order: &mut Vec<String>, name: &str, target: usize) {
    let Some(from) = order.iter().position(|n| n == name) else {
        return;
    };
    order.remove(from);
    let target = target.min(order.len());
    order.insert(target, name.to_string());
}

/// Applies a multi-item drop to a live order. Each dragged name is moved to
/// the target slot in turn; when the selection starts above the target the
/// iteration reverses so the final block keeps the selection's own order.
pub fn reorder_within(order: &mut Vec<String>, dragged: &[String], target_index: usize) {
    let Some(first) = dragged.first() else {
        return;
    };
    let Some(first_idx) = order.iter().position(|n| n == first) else {
        return;
    };
    if first_idx > target_index {
        for name in dragged.iter().rev() {
            reorder_array(order, name, target_index);
        }
    } else {
        for name in dragged {
            reorder_array(order, name, target_index);
        }
    }
}

/// Records the before-state of both folders' order records. Call before the
/// host move; on failure [`rollback_cross_move`] puts every record back
/// byte-for-byte.
pub fn begin_cross_move(store: &OrderStore, event: &DropEvent) -> CrossMove {
    let mut snapshots = vec![
        (event.source_folder.clone(), store.snapshot(&event.source_folder)),
        (event.dest_folder.clone(), store.snapshot(&event.dest_folder)),
    ];
    // a dragged folder carries its own record too
    for name in &event.dragged {
        let folder = vpath::join(&event.source_folder, name);
        if store.has(&folder) {
            snapshots.push((folder.clone(), store.snapshot(&folder)));
        }
    }
    CrossMove { snapshots }
}

pub fn rollback_cross_move(store: &mut OrderStore, cross: CrossMove) {
    for (folder, snapshot) in cross.snapshots {
        store.restore(&folder, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::order::InsertAt;

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn single_item_drop_moves_to_slot() {
        let mut live = order(&["a", "b", "c", "d"]);
        reorder_within(&mut live, &order(&["d"]), 1);
        assert_eq!(live, order(&["a", "d", "b", "c"]));
    }

    #[test]
    fn multi_drag_downward_keeps_selection_order() {
        let mut live = order(&["a", "b", "c", "d"]);
        reorder_within(&mut live, &order(&["a", "b"]), 2);
        assert_eq!(live, order(&["c", "a", "b", "d"]));
    }

    #[test]
    fn multi_drag_upward_keeps_selection_order() {
        let mut live = order(&["a", "b", "c", "d"]);
        reorder_within(&mut live, &order(&["c", "d"]), 0);
        assert_eq!(live, order(&["c", "d", "a", "b"]));
    }

    #[test]
    fn dragging_an_unknown_name_leaves_order_alone() {
        let mut live = order(&["a", "b"]);
        reorder_within(&mut live, &order(&["zzz"]), 0);
        assert_eq!(live, order(&["a", "b"]));
    }

    #[test]
    fn controller_gates_sessions_on_enablement() {
        let mut drag = DragController::new(200);
        assert!(!drag.begin("/", order(&["a"])));
        drag.set_enabled(true);
        assert!(drag.begin("/", order(&["a"])));
        assert_eq!(drag.session().map(|s| s.folder.as_str()), Some("/"));
        drag.set_enabled(false);
        assert!(drag.session().is_none());
    }

    #[test]
    fn disabled_folders_reject_drags_while_others_accept() {
        let mut drag = DragController::new(200);
        drag.set_enabled(true);
        drag.disable_folder("locked");
        assert!(!drag.accepts("locked"));
        assert!(drag.accepts("open"));
    }

    #[test]
    fn disabled_folders_can_be_enabled_again() {
        let mut drag = DragController::new(200);
        drag.set_enabled(true);
        drag.disable_folder("locked");
        assert!(!drag.begin("locked", order(&["a"])));
        drag.enable_folder("locked");
        assert!(drag.begin("locked", order(&["a"])));
    }

    #[test]
    fn cross_move_rollback_restores_records_exactly() {
        let mut store = OrderStore::default();
        store.set("src", vec!["a.md".into(), "b.md".into()]);
        // dest has no record at all
        let event = DropEvent {
            source_folder: "src".into(),
            dest_folder: "dst".into(),
            dragged: vec!["a.md".into()],
            target_index: 0,
        };
        let before = store.clone();
        let cross = begin_cross_move(&store, &event);

        store.remove("src", "a.md");
        store.insert("dst", "a.md", InsertAt::Start);
        rollback_cross_move(&mut store, cross);

        assert_eq!(store, before);
    }

    #[test]
    fn cross_move_snapshots_a_dragged_folders_own_record() {
        let mut store = OrderStore::default();
        store.set("src", vec!["sub".into()]);
        store.set("src/sub", vec!["x.md".into()]);
        let event = DropEvent {
            source_folder: "src".into(),
            dest_folder: "/".into(),
            dragged: vec!["sub".into()],
            target_index: 0,
        };
        let before = store.clone();
        let cross = begin_cross_move(&store, &event);
        store.set("src/sub", vec![]);
        rollback_cross_move(&mut store, cross);
        assert_eq!(store, before);
    }
}
