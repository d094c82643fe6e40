use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an inserted child lands within a folder's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    /// Most-recent-first slot, used for newly created files.
    Start,
    /// Used for files discovered but not yet ordered.
    End,
    Index(usize),
}

/// Canonical per-folder child ordering. Keys are folder paths (`"/"` for the
/// vault root), values are immediate-child base names whose sequence *is* the
/// display order. The single source of truth for ordering — the position
/// index is always re-derived from here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStore {
    records: BTreeMap<String, Vec<String>>,
}

impl OrderStore {
    /// Stored order for a folder, empty if none was ever recorded.
    pub fn get(&self, folder: &str) -> &[String] {
        self.records.get(folder).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, folder: &str) -> bool {
        self.records.contains_key(folder)
    }

    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Wholesale replacement, used when capturing the live tree order after a
    /// drag. An empty order drops the record entirely.
    pub fn set(&mut self, folder: &str, order: Vec<String>) {
        if order.is_empty() {
            self.records.remove(folder);
        } else {
            self.records.insert(folder.to_string(), order);
        }
    }

    /// Inserts a name, removing any prior occurrence first, so moving a name
    /// within its own list is a single idempotent call.
    pub fn insert(&mut self, folder: &str, name: &str, at: InsertAt) {
        let record = self.records.entry(folder.to_string()).or_default();
        record.retain(|n| n != name);
        let index = match at {
            InsertAt::Start => 0,
            InsertAt::End => record.len(),
            InsertAt::Index(i) => i.min(record.len()),
        };
        record.insert(index, name.to_string());
    }

    /// No-op if the name is absent.
    pub fn remove(&mut self, folder: &str, name: &str) {
        if let Some(record) = self.records.get_mut(folder) {
            record.retain(|n| n != name);
            if record.is_empty() {
                self.records.remove(folder);
            }
        }
    }

    /// In-place substitution preserving position. If `old` is absent the new
    /// name is appended instead.
    pub fn rename(&mut self, folder: &str, old: &str, new: &str) {
        if old == new {
            return;
        }
        let record = self.records.entry(folder.to_string()).or_default();
        let Some(mut at) = record.iter().position(|n| n == old) else {
            self.insert(folder, new, InsertAt::End);
            return;
        };
        // A record can already hold the new name from an earlier event;
        // drop it first to keep the no-duplicates invariant.
        if let Some(dup) = record.iter().position(|n| n == new) {
            record.remove(dup);
            if dup < at {
                at -= 1;
            }
        }
        record[at] = new.to_string();
    }

    /// Prunes names no longer present in the live tree and appends live
    /// children the record does not know about yet, in their live relative
    /// order. Folders with no record stay unordered. Returns whether the
    /// record changed.
    pub fn align(&mut self, folder: &str, live: &[String]) -> bool {
        let Some(record) = self.records.get_mut(folder) else {
            return false;
        };
        let before = record.clone();
        record.retain(|n| live.contains(n));
        for name in live {
            if !record.contains(name) {
                record.push(name.clone());
            }
        }
        let changed = *record != before;
        if record.is_empty() {
            self.records.remove(folder);
        }
        changed
    }

    /// Re-keys a folder's record, descendants included, after the folder
    /// itself moved. Keys are compared whole-segment, so `notes` never
    /// drags `notes2` along.
    pub fn rekey_subtree(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        let prefix = format!("{from}/");
        let moved: Vec<String> = self
            .records
            .keys()
            .filter(|k| *k == from || k.starts_with(&prefix))
            .cloned()
            .collect();
        for key in moved {
            if let Some(order) = self.records.remove(&key) {
                self.records.insert(format!("{to}{}", &key[from.len()..]), order);
            }
        }
    }

    /// Drops the record of a deleted folder along with everything under it.
    pub fn remove_subtree(&mut self, folder: &str) {
        let prefix = format!("{folder}/");
        self.records
            .retain(|k, _| k != folder && !k.starts_with(&prefix));
    }

    /// Snapshot/restore pair used to roll a folder back after a failed move.
    pub fn snapshot(&self, folder: &str) -> Option<Vec<String>> {
        self.records.get(folder).cloned()
    }

    pub fn restore(&mut self, folder: &str, snapshot: Option<Vec<String>>) {
        match snapshot {
            Some(order) => {
                self.records.insert(folder.to_string(), order);
            }
            None => {
                self.records.remove(folder);
            }
        }
    }
}
