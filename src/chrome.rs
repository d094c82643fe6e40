//! Ordering for the host's chrome bars: status bar, ribbon, tab headers, and
//! per-view action bars. Bar items carry no paths, so each gets a stable
//! synthetic id derived from its class/aria/icon, and saved orders are lists
//! of those ids.

use std::collections::HashSet;

use crate::model::settings::ArrangeSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarKind {
    Status,
    Ribbon,
    Tabs,
    ViewActions,
}

/// Which element attributes participate in id generation. Tab headers and
/// action bars have no aria labels worth keying on.
#[derive(Debug, Clone, Copy)]
pub struct IdOptions {
    pub use_class: bool,
    pub use_aria: bool,
    pub use_icon: bool,
}

impl IdOptions {
    pub fn for_bar(kind: BarKind) -> Self {
        match kind {
            BarKind::Status | BarKind::Ribbon => {
                Self { use_class: true, use_aria: true, use_icon: true }
            }
            BarKind::Tabs | BarKind::ViewActions => {
                Self { use_class: true, use_aria: false, use_icon: true }
            }
        }
    }
}

/// One item in a chrome bar, as reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarElement {
    pub id: String,
    pub class: String,
    pub aria: String,
    pub icon: String,
    pub hidden: bool,
    /// The collapse toggle we inject; never reordered or hidden.
    pub separator: bool,
}

impl BarElement {
    pub fn new(class: &str, aria: &str, icon: &str) -> Self {
        Self {
            class: class.to_string(),
            aria: aria.to_string(),
            icon: icon.to_string(),
            ..Self::default()
        }
    }

    pub fn separator() -> Self {
        Self { separator: true, ..Self::default() }
    }
}

fn slug(part: &str) -> String {
    part.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn generate_id(el: &BarElement, options: IdOptions) -> String {
    let mut parts = Vec::new();
    if options.use_class && !el.class.is_empty() {
        parts.push(slug(&el.class));
    }
    if options.use_aria && !el.aria.is_empty() {
        parts.push(slug(&el.aria));
    }
    if options.use_icon && !el.icon.is_empty() {
        parts.push(slug(&el.icon));
    }
    parts.retain(|p| !p.is_empty());
    parts.join("-")
}

/// Fills in missing ids, leaving ids the host already assigned untouched.
pub fn assign_ids(elements: &mut [BarElement], options: IdOptions) {
    for el in elements.iter_mut() {
        if el.id.is_empty() && !el.separator {
            el.id = generate_id(el, options);
        }
    }
}

/// Current bar order as a saveable id list. Separators and id-less items
/// are not persisted.
pub fn capture_order(elements: &[BarElement]) -> Vec<String> {
    elements
        .iter()
        .filter(|el| !el.separator && !el.id.is_empty())
        .map(|el| el.id.clone())
        .collect()
}

/// Reorders a bar to match a saved id list. Items the list does not know
/// keep their relative order after the known ones; a stable sort guarantees
/// the same input produces the same layout every time.
pub fn apply_order(elements: &mut [BarElement], saved: &[String]) {
    let rank = |el: &BarElement| {
        saved
            .iter()
            .position(|id| *id == el.id)
            .unwrap_or(usize::MAX)
    };
    elements.sort_by_key(rank);
}

/// Moves one element from `old_index` to `new_index`, the tab-header drop
/// rule. Indexes out of range are ignored.
pub fn reorder_index<T>(list: &mut Vec<T>, old_index: usize, new_index: usize) {
    if old_index >= list.len() || new_index >= list.len() {
        return;
    }
    let item = list.remove(old_index);
    list.insert(new_index, item);
}

/// Collapse state for one auto-hiding bar. Deadlines are tick counters, not
/// wall-clock sleeps; the plugin's tick handler drives expiry.
#[derive(Debug, Clone, Default)]
pub struct BarState {
    pub collapsed: bool,
    hide_deadline: Option<u64>,
}

impl BarState {
    pub fn collapse(&mut self, elements: &mut [BarElement]) {
        for el in elements.iter_mut() {
            if !el.separator {
                el.hidden = true;
            }
        }
        self.collapsed = true;
        self.hide_deadline = None;
    }

    pub fn expand(&mut self, elements: &mut [BarElement]) {
        for el in elements.iter_mut() {
            el.hidden = false;
        }
        self.collapsed = false;
        self.hide_deadline = None;
    }

    pub fn toggle(&mut self, elements: &mut [BarElement]) {
        if self.collapsed {
            self.expand(elements);
        } else {
            self.collapse(elements);
        }
    }

    /// Arms the auto-hide timer when the pointer leaves the bar.
    pub fn schedule_hide(&mut self, now_tick: u64, delay_ticks: u64) {
        if !self.collapsed {
            self.hide_deadline = Some(now_tick + delay_ticks);
        }
    }

    /// Pointer re-entered the bar.
    pub fn cancel_hide(&mut self) {
        self.hide_deadline = None;
    }

    /// True when the armed deadline has passed and the bar should collapse.
    pub fn hide_due(&mut self, now_tick: u64) -> bool {
        match self.hide_deadline {
            Some(deadline) if now_tick >= deadline => {
                self.hide_deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Duplicate-id check used when deciding whether a saved order is still
/// trustworthy for a bar.
pub fn ids_are_unique(elements: &[BarElement]) -> bool {
    let mut seen = HashSet::new();
    elements
        .iter()
        .filter(|el| !el.separator)
        .all(|el| seen.insert(el.id.as_str()))
}

/// Saved order list for a bar, if any.
pub fn saved_order<'a>(settings: &'a ArrangeSettings, kind: BarKind, view_type: &str) -> Option<&'a [String]> {
    match kind {
        BarKind::Status => Some(&settings.status_bar_order),
        BarKind::Ribbon => Some(&settings.ribbon_bar_order),
        BarKind::ViewActions => settings.action_bar_order.get(view_type).map(Vec::as_slice),
        BarKind::Tabs => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> Vec<BarElement> {
        vec![
            BarElement::separator(),
            BarElement::new("status-bar-item plugin-sync", "Sync status", "sync"),
            BarElement::new("status-bar-item", "Backlinks", ""),
            BarElement::new("status-bar-item", "", "clock"),
        ]
    }

    #[test]
    fn ids_come_from_class_aria_and_icon() {
        let mut elements = bar();
        assign_ids(&mut elements, IdOptions::for_bar(BarKind::Status));
        assert_eq!(elements[1].id, "status-bar-item-plugin-sync-sync-status-sync");
        assert_eq!(elements[2].id, "status-bar-item-backlinks");
        assert_eq!(elements[3].id, "status-bar-item-clock");
        assert!(elements[0].id.is_empty());
        assert!(ids_are_unique(&elements));
    }

    #[test]
    fn tab_ids_skip_aria() {
        let el = BarElement::new("workspace-tab", "Close tab", "document");
        assert_eq!(
            generate_id(&el, IdOptions::for_bar(BarKind::Tabs)),
            "workspace-tab-document"
        );
    }

    #[test]
    fn existing_ids_are_never_overwritten() {
        let mut elements = bar();
        elements[1].id = "host-given".to_string();
        assign_ids(&mut elements, IdOptions::for_bar(BarKind::Status));
        assert_eq!(elements[1].id, "host-given");
    }

    #[test]
    fn apply_order_is_stable_with_unknown_items_last() {
        let mut elements = bar();
        assign_ids(&mut elements, IdOptions::for_bar(BarKind::Status));
        let saved = vec!["status-bar-item-clock".to_string()];
        // the separator has no id and sorts with the unknowns, keeping its
        // relative position among them
        apply_order(&mut elements[1..], &saved);
        assert_eq!(elements[1].id, "status-bar-item-clock");
        assert_eq!(elements[2].id, "status-bar-item-plugin-sync-sync-status-sync");
        assert_eq!(elements[3].id, "status-bar-item-backlinks");
        // idempotent
        let once = elements.clone();
        apply_order(&mut elements[1..], &saved);
        assert_eq!(elements, once);
    }

    #[test]
    fn capture_skips_separators() {
        let mut elements = bar();
        assign_ids(&mut elements, IdOptions::for_bar(BarKind::Status));
        let order = capture_order(&elements);
        assert_eq!(order.len(), 3);
        assert!(!order.iter().any(String::is_empty));
    }

    #[test]
    fn tab_drop_moves_by_index() {
        let mut tabs = vec!["a", "b", "c", "d"];
        reorder_index(&mut tabs, 3, 1);
        assert_eq!(tabs, ["a", "d", "b", "c"]);
        reorder_index(&mut tabs, 9, 0);
        assert_eq!(tabs, ["a", "d", "b", "c"]);
    }

    #[test]
    fn auto_hide_fires_once_after_the_deadline() {
        let mut state = BarState::default();
        let mut elements = bar();
        state.schedule_hide(10, 40);
        assert!(!state.hide_due(30));
        assert!(state.hide_due(50));
        assert!(!state.hide_due(51));
        state.collapse(&mut elements);
        assert!(state.collapsed);
        assert!(elements[1].hidden && !elements[0].hidden);

        // re-entering the bar cancels the pending hide
        state.expand(&mut elements);
        state.schedule_hide(60, 40);
        state.cancel_hide();
        assert!(!state.hide_due(1000));
    }
}
