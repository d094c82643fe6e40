//! Fuzzy filter over the file tree. The unfiltered root child list is
//! snapshotted once when a filter first appears, matching runs against full
//! paths, and clearing the filter puts the snapshot back verbatim.

use std::fmt;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::host::{Node, TreeView};

const MAX_RESULTS: usize = 200;

pub struct FilterOverlay {
    filter: String,
    filtered: bool,
    snapshot: Option<Vec<Node>>,
    matcher: SkimMatcherV2,
    max_results: usize,
}

impl Default for FilterOverlay {
    fn default() -> Self {
        Self {
            filter: String::new(),
            filtered: false,
            snapshot: None,
            matcher: SkimMatcherV2::default().ignore_case(),
            max_results: MAX_RESULTS,
        }
    }
}

impl fmt::Debug for FilterOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOverlay")
            .field("filter", &self.filter)
            .field("filtered", &self.filtered)
            .field("snapshotted", &self.snapshot.is_some())
            .finish()
    }
}

impl FilterOverlay {
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    /// Applies the current filter to the view, replacing the root child list
    /// with a flat ranked result list, or restoring the snapshot when the
    /// filter is empty. Idempotent for an unchanged filter string: every call
    /// recomputes from the same snapshot. Returns whether the view is
    /// filtered afterwards.
    pub fn compute(&mut self, view: &mut TreeView) -> bool {
        if self.filter.is_empty() {
            self.restore(view);
            return false;
        }

        if self.snapshot.is_none() {
            self.snapshot = Some(view.root_children_clone());
        }
        let mut matches: Vec<(i64, Node)> = Vec::new();
        let Some(snapshot) = self.snapshot.as_ref() else {
            return false;
        };
        for node in snapshot {
            collect_matches(&self.matcher, &self.filter, node, &mut matches);
        }
        matches.sort_by(|a, b| b.0.cmp(&a.0));
        matches.truncate(self.max_results);
        view.set_root_children(matches.into_iter().map(|(_, n)| n).collect());
        self.filtered = true;
        true
    }

    /// Puts the snapshot back and strips any highlight markers, leaving the
    /// tree exactly as it was before filtering. Safe to call when nothing is
    /// filtered.
    pub fn restore(&mut self, view: &mut TreeView) {
        if !self.filtered {
            return;
        }
        if let Some(snapshot) = self.snapshot.take() {
            view.set_root_children(snapshot);
        }
        view.for_each_item_mut(&mut |item| item.highlight.clear());
        self.filtered = false;
    }

    /// Drops the filter string and un-filters the view in one step, used by
    /// teardown and by the sort toggle.
    pub fn clear(&mut self, view: &mut TreeView) {
        self.filter.clear();
        self.restore(view);
    }
}

/// Matches one subtree against the filter, flattening results to leaves with
/// highlight indices. Folders match too and appear as childless rows.
fn collect_matches(
    matcher: &SkimMatcherV2,
    filter: &str,
    node: &Node,
    out: &mut Vec<(i64, Node)>,
) {
    if let Some((score, indices)) = matcher.fuzzy_indices(&node.item.path, filter) {
        let mut item = node.item.clone();
        item.highlight = indices;
        out.push((score, Node::leaf(item)));
    }
    if let Some(children) = node.children.as_ref() {
        for child in children.items() {
            collect_matches(matcher, filter, child, out);
        }
    }
}
