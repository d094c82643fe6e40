//! Keeps the order records consistent with the real tree as the vault
//! mutates underneath them. Every handler returns the folder(s) whose index
//! must be rebuilt; the caller funnels those into a single refresh.

use tracing::debug;

use crate::host::TreeView;
use crate::model::order::{InsertAt, OrderStore};
use crate::model::vpath;

/// A newly created child goes to the front of its parent's order,
/// most-recent-first. Returns the parent folder.
pub fn on_create(store: &mut OrderStore, path: &str) -> String {
    let folder = vpath::parent(path);
    store.insert(&folder, vpath::name(path), InsertAt::Start);
    folder
}

/// Returns the parent folder the child was removed from. A deleted folder
/// takes its own record, and its descendants', with it.
pub fn on_delete(store: &mut OrderStore, path: &str) -> String {
    let folder = vpath::parent(path);
    store.remove(&folder, vpath::name(path));
    store.remove_subtree(path);
    folder
}

/// A rename within one folder substitutes the name in place; a rename that
/// crosses folders is a delete from the old parent plus a most-recent-first
/// insert into the new one. Returns the old folder, and the new folder when
/// it differs.
pub fn on_rename(store: &mut OrderStore, from: &str, to: &str) -> (String, Option<String>) {
    let old_folder = vpath::parent(from);
    let new_folder = vpath::parent(to);
    // a renamed folder keeps its own record, and its descendants', under
    // the new key
    store.rekey_subtree(from, to);
    if old_folder == new_folder {
        store.rename(&old_folder, vpath::name(from), vpath::name(to));
        (old_folder, None)
    } else {
        store.remove(&old_folder, vpath::name(from));
        store.insert(&new_folder, vpath::name(to), InsertAt::Start);
        (old_folder, Some(new_folder))
    }
}

/// The order the live children *should* render in: stable sort by recorded
/// position, untracked names keeping their live relative order at the end.
pub fn expected_order(store: &OrderStore, folder: &str, live: &[String]) -> Vec<String> {
    let record = store.get(folder);
    let mut names = live.to_vec();
    names.sort_by_key(|name| {
        record
            .iter()
            .position(|n| n == name)
            .unwrap_or(usize::MAX)
    });
    names
}

/// Folders whose live rendered order disagrees with what their record calls
/// for. Only recorded folders can be out of sync; unordered folders are the
/// host's business.
pub fn folders_out_of_sync(store: &OrderStore, view: &TreeView) -> Vec<String> {
    let mut stale = Vec::new();
    for folder in view.folder_paths() {
        if !store.has(&folder) {
            continue;
        }
        let Some(live) = view.live_order(&folder) else {
            continue;
        };
        let record_has_ghosts = store.get(&folder).iter().any(|name| !live.contains(name));
        if record_has_ghosts || live != expected_order(store, &folder, &live) {
            debug!("order drift in {folder}");
            stale.push(folder);
        }
    }
    stale
}

/// Recorded folders that no longer exist anywhere in the tree. Their records
/// serve no one and would otherwise sit in the persisted blob forever.
pub fn dead_records(store: &OrderStore, view: &TreeView) -> Vec<String> {
    store
        .folders()
        .filter(|folder| *folder != vpath::ROOT && view.find_folder(folder).is_none())
        .map(str::to_string)
        .collect()
}

/// Repairs one folder's record against the live tree: stale names pruned,
/// untracked live names appended. Returns whether the record changed.
pub fn align_folder(store: &mut OrderStore, folder: &str, view: &TreeView) -> bool {
    let Some(live) = view.live_order(folder) else {
        return false;
    };
    store.align(folder, &live)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostCaps, TreeView};

    #[test]
    fn created_children_go_first() {
        let mut store = OrderStore::default();
        store.set("notes", vec!["a.md".into(), "b.md".into()]);
        let folder = on_create(&mut store, "notes/new.md");
        assert_eq!(folder, "notes");
        assert_eq!(store.get("notes"), ["new.md", "a.md", "b.md"]);
    }

    #[test]
    fn create_in_an_unordered_folder_starts_a_record() {
        let mut store = OrderStore::default();
        on_create(&mut store, "fresh.md");
        assert_eq!(store.get("/"), ["fresh.md"]);
    }

    #[test]
    fn rename_across_folders_is_delete_plus_insert() {
        let mut store = OrderStore::default();
        store.set("a", vec!["x.md".into(), "y.md".into()]);
        store.set("b", vec!["z.md".into()]);
        let (old, new) = on_rename(&mut store, "a/x.md", "b/x.md");
        assert_eq!(old, "a");
        assert_eq!(new.as_deref(), Some("b"));
        assert_eq!(store.get("a"), ["y.md"]);
        assert_eq!(store.get("b"), ["x.md", "z.md"]);
    }

    #[test]
    fn renaming_a_folder_carries_its_records_to_the_new_key() {
        let mut store = OrderStore::default();
        store.set("/", vec!["old".into(), "top.md".into()]);
        store.set("old", vec!["b.md".into(), "a.md".into()]);
        store.set("old/deep", vec!["x.md".into()]);
        let (old_folder, new_folder) = on_rename(&mut store, "old", "new");
        assert_eq!(old_folder, "/");
        assert!(new_folder.is_none());
        assert_eq!(store.get("/"), ["new", "top.md"]);
        assert_eq!(store.get("new"), ["b.md", "a.md"]);
        assert_eq!(store.get("new/deep"), ["x.md"]);
        assert!(!store.has("old"));
    }

    #[test]
    fn deleting_a_folder_drops_its_records() {
        let mut store = OrderStore::default();
        store.set("/", vec!["gone".into(), "top.md".into()]);
        store.set("gone", vec!["a.md".into()]);
        store.set("gone/deep", vec!["x.md".into()]);
        on_delete(&mut store, "gone");
        assert_eq!(store.get("/"), ["top.md"]);
        assert!(!store.has("gone"));
        assert!(!store.has("gone/deep"));
    }

    #[test]
    fn records_for_vanished_folders_are_reported_dead() {
        let mut view = TreeView::new(&HostCaps::default());
        view.insert("kept", true);
        let mut store = OrderStore::default();
        store.set("/", vec!["kept".into()]);
        store.set("kept", vec!["a.md".into()]);
        store.set("vanished", vec!["b.md".into()]);
        assert_eq!(dead_records(&store, &view), vec!["vanished"]);
    }

    #[test]
    fn rename_in_place_keeps_position() {
        let mut store = OrderStore::default();
        store.set("a", vec!["x.md".into(), "y.md".into()]);
        let (old, new) = on_rename(&mut store, "a/x.md", "a/renamed.md");
        assert_eq!(old, "a");
        assert!(new.is_none());
        assert_eq!(store.get("a"), ["renamed.md", "y.md"]);
    }

    #[test]
    fn expected_order_puts_untracked_live_names_last_in_live_order() {
        let mut store = OrderStore::default();
        store.set("/", vec!["b.md".into(), "a.md".into()]);
        let live = vec![
            "a.md".to_string(),
            "n1.md".to_string(),
            "b.md".to_string(),
            "n2.md".to_string(),
        ];
        assert_eq!(
            expected_order(&store, "/", &live),
            vec!["b.md", "a.md", "n1.md", "n2.md"]
        );
    }

    #[test]
    fn drift_is_detected_and_repairable() {
        let mut view = TreeView::new(&HostCaps::default());
        view.insert("notes", true);
        view.insert("notes/a.md", false);
        view.insert("notes/b.md", false);

        let mut store = OrderStore::default();
        store.set("notes", vec!["gone.md".into(), "b.md".into(), "a.md".into()]);

        // live order is a,b but record wants b,a (plus a stale name)
        assert_eq!(folders_out_of_sync(&store, &view), vec!["notes"]);

        assert!(align_folder(&mut store, "notes", &view));
        assert_eq!(store.get("notes"), ["b.md", "a.md"]);

        // after a render applies the record, live matches and the check clears
        if let Some(children) = view.find_folder_mut("notes").and_then(|n| n.children.as_mut()) {
            let mut nodes = std::mem::take(children.items_mut());
            nodes.sort_by_key(|n| {
                store
                    .get("notes")
                    .iter()
                    .position(|x| *x == n.item.name)
                    .unwrap_or(usize::MAX)
            });
            children.replace(nodes);
        }
        assert!(folders_out_of_sync(&store, &view).is_empty());
    }

    #[test]
    fn unordered_folders_are_never_flagged() {
        let mut view = TreeView::new(&HostCaps::default());
        view.insert("z.md", false);
        view.insert("a.md", false);
        let store = OrderStore::default();
        assert!(folders_out_of_sync(&store, &view).is_empty());
    }
}
