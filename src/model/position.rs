use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::order::OrderStore;
use crate::model::vpath;

/// Derived cache mapping absolute path to its custom position, rebuilt per
/// folder from the order store. Never persisted — always derivable — and
/// rebuilt *before* any render is requested so the comparator never sees a
/// half-updated folder.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    by_path: HashMap<String, usize>,
}

impl PositionIndex {
    pub fn rebuild(&mut self, folder: &str, store: &OrderStore) {
        self.by_path.retain(|path, _| vpath::parent(path) != folder);
        for (position, name) in store.get(folder).iter().enumerate() {
            self.by_path.insert(vpath::join(folder, name), position);
        }
    }

    pub fn rebuild_all(&mut self, store: &OrderStore) {
        self.by_path.clear();
        for folder in store.folders() {
            for (position, name) in store.get(folder).iter().enumerate() {
                self.by_path.insert(vpath::join(folder, name), position);
            }
        }
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// Comparator injected into the host's child-sort step. Untracked items
    /// sort last; ties report `Equal` so a stable sort keeps their original
    /// relative order instead of oscillating.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let pa = self.position(a).unwrap_or(usize::MAX);
        let pb = self.position(b).unwrap_or(usize::MAX);
        pa.cmp(&pb)
    }

    /// Path-to-position slice for one folder, handed to the compute hook.
    pub fn folder_map(&self, folder: &str) -> HashMap<String, usize> {
        self.by_path
            .iter()
            .filter(|(path, _)| vpath::parent(path) == folder)
            .map(|(path, position)| (path.clone(), *position))
            .collect()
    }
}
