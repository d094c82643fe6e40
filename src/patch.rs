//! Interception points over host behaviors. Instead of mutating host
//! internals, each hook the engine cares about is a [`PatchSlot`]: the host's
//! original behavior plus a removable stack of advice closures. Uninstalling
//! everything provably restores the original (`Rc::ptr_eq` with the handler
//! captured at construction).

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use tracing::warn;

use crate::chrome::BarKind;
use crate::event::PluginEvent;
use crate::host::{NATIVE_SORT_OPTIONS, Node, native_sort};
use crate::model::settings::SortOrder;

/// What an advice closure decided about the original behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Let the original (and any earlier advice) run.
    Continue,
    /// The advice handled the call; skip the original.
    Suppress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(u64);

type Handler<C> = Rc<dyn Fn(&mut C)>;
type Advice<C> = Rc<dyn Fn(&mut C) -> Result<Flow>>;

/// One interception point. Advice runs most-recently-installed first; an
/// advice error is logged and treated as [`Flow::Continue`] so a broken
/// extension can never wedge the host behavior it wrapped.
pub struct PatchSlot<C> {
    name: &'static str,
    original: Handler<C>,
    stack: Vec<(PatchId, Advice<C>)>,
    next_id: u64,
}

impl<C> PatchSlot<C> {
    pub fn new(name: &'static str, original: impl Fn(&mut C) + 'static) -> Self {
        Self {
            name,
            original: Rc::new(original),
            stack: Vec::new(),
            next_id: 0,
        }
    }

    pub fn install(&mut self, advice: impl Fn(&mut C) -> Result<Flow> + 'static) -> PatchId {
        let id = PatchId(self.next_id);
        self.next_id += 1;
        self.stack.push((id, Rc::new(advice)));
        id
    }

    /// Removes one advice by id, wherever it sits in the stack.
    pub fn rollback(&mut self, id: PatchId) -> bool {
        let before = self.stack.len();
        self.stack.retain(|(i, _)| *i != id);
        self.stack.len() != before
    }

    pub fn rollback_all(&mut self) {
        self.stack.clear();
    }

    pub fn wrap_count(&self) -> usize {
        self.stack.len()
    }

    pub fn is_pristine(&self) -> bool {
        self.stack.is_empty()
    }

    /// The untouched host behavior, as captured at construction.
    pub fn original(&self) -> Handler<C> {
        Rc::clone(&self.original)
    }

    /// The handler a caller would reach right now. Only the pristine slot
    /// resolves to the original itself.
    pub fn resolved(&self) -> Option<Handler<C>> {
        self.stack.is_empty().then(|| Rc::clone(&self.original))
    }

    pub fn invoke(&self, ctx: &mut C) {
        let mut suppressed = false;
        for (id, advice) in self.stack.iter().rev() {
            match advice(ctx) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Suppress) => suppressed = true,
                Err(err) => {
                    warn!("advice {:?} on {} failed, continuing: {err}", id, self.name);
                }
            }
        }
        if !suppressed {
            (self.original)(ctx);
        }
    }
}

impl<C> fmt::Debug for PatchSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchSlot")
            .field("name", &self.name)
            .field("wraps", &self.stack.len())
            .finish()
    }
}

/// The child-compute hook: the host asks for a folder's children in display
/// order. The original applies the native sort; the engine's advice replaces
/// it with the custom order when one is active.
#[derive(Debug)]
pub struct TreeComputeCtx {
    pub folder: String,
    pub children: Vec<Node>,
    /// Path-to-position for this folder, from the position index.
    pub positions: HashMap<String, usize>,
    pub sort_order: SortOrder,
}

/// The sort-menu hook. The original lists the host's stock methods; the
/// engine's advice appends its rearrange toggle.
#[derive(Debug, Default)]
pub struct SortButtonCtx {
    pub options: Vec<String>,
    pub rearrange_toggle: bool,
}

/// Fires when the host adds an item to the status bar or ribbon. Follow-up
/// events let advice request re-sorting without re-entering the plugin.
#[derive(Debug)]
pub struct BarItemCtx {
    pub bar: BarKind,
    pub follow_ups: Vec<PluginEvent>,
}

/// Fires on workspace layout changes (leaf splits, tab group creation).
#[derive(Debug, Default)]
pub struct LayoutCtx {
    pub follow_ups: Vec<PluginEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Load,
    Unload,
}

/// Fires when a view finishes loading or starts unloading.
#[derive(Debug)]
pub struct ViewLifecycleCtx {
    pub phase: ViewPhase,
    pub view_type: String,
    pub has_action_bar: bool,
    pub sorter_attached: bool,
}

/// Fires on mousedown over a tab header. The original lets the host start
/// its native drag; advice suppresses it while a modifier-key multi-select
/// drag is in progress.
#[derive(Debug, Default)]
pub struct MouseDownCtx {
    pub tab_header: bool,
    pub alt: bool,
    pub meta: bool,
    pub default_handled: bool,
}

/// All of the engine's interception points, plus the marker set that keeps
/// re-entrant installation idempotent.
#[derive(Debug)]
pub struct PatchLayer {
    pub tree_compute: PatchSlot<TreeComputeCtx>,
    pub sort_button: PatchSlot<SortButtonCtx>,
    pub status_bar_item: PatchSlot<BarItemCtx>,
    pub ribbon_icon: PatchSlot<BarItemCtx>,
    pub layout: PatchSlot<LayoutCtx>,
    pub view_lifecycle: PatchSlot<ViewLifecycleCtx>,
    pub mousedown: PatchSlot<MouseDownCtx>,
    markers: HashSet<&'static str>,
}

impl PatchLayer {
    pub fn new() -> Self {
        Self {
            tree_compute: PatchSlot::new("tree-compute", |ctx: &mut TreeComputeCtx| {
                native_sort(&mut ctx.children);
            }),
            sort_button: PatchSlot::new("sort-button", |ctx: &mut SortButtonCtx| {
                ctx.options = NATIVE_SORT_OPTIONS.iter().map(|s| s.to_string()).collect();
            }),
            status_bar_item: PatchSlot::new("status-bar-item", |_: &mut BarItemCtx| {}),
            ribbon_icon: PatchSlot::new("ribbon-icon", |_: &mut BarItemCtx| {}),
            layout: PatchSlot::new("layout", |_: &mut LayoutCtx| {}),
            view_lifecycle: PatchSlot::new("view-lifecycle", |_: &mut ViewLifecycleCtx| {}),
            mousedown: PatchSlot::new("mousedown", |ctx: &mut MouseDownCtx| {
                ctx.default_handled = true;
            }),
            markers: HashSet::new(),
        }
    }

    /// Returns true the first time a marker is claimed. Install guards use
    /// this so repeated lifecycle events never double-wrap a slot.
    pub fn mark(&mut self, marker: &'static str) -> bool {
        self.markers.insert(marker)
    }

    pub fn is_marked(&self, marker: &'static str) -> bool {
        self.markers.contains(marker)
    }

    pub fn rollback_all(&mut self) {
        self.tree_compute.rollback_all();
        self.sort_button.rollback_all();
        self.status_bar_item.rollback_all();
        self.ribbon_icon.rollback_all();
        self.layout.rollback_all();
        self.view_lifecycle.rollback_all();
        self.mousedown.rollback_all();
        self.markers.clear();
    }

    pub fn is_pristine(&self) -> bool {
        self.tree_compute.is_pristine()
            && self.sort_button.is_pristine()
            && self.status_bar_item.is_pristine()
            && self.ribbon_icon.is_pristine()
            && self.layout.is_pristine()
            && self.view_lifecycle.is_pristine()
            && self.mousedown.is_pristine()
            && self.markers.is_empty()
    }
}

impl Default for PatchLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct Trace(Vec<&'static str>);

    fn slot() -> PatchSlot<Trace> {
        PatchSlot::new("trace", |ctx: &mut Trace| ctx.0.push("original"))
    }

    #[test]
    fn advice_runs_newest_first_then_the_original() {
        let mut slot = slot();
        slot.install(|ctx: &mut Trace| {
            ctx.0.push("first");
            Ok(Flow::Continue)
        });
        slot.install(|ctx: &mut Trace| {
            ctx.0.push("second");
            Ok(Flow::Continue)
        });
        let mut trace = Trace::default();
        slot.invoke(&mut trace);
        assert_eq!(trace.0, ["second", "first", "original"]);
    }

    #[test]
    fn suppress_skips_the_original_but_not_other_advice() {
        let mut slot = slot();
        slot.install(|ctx: &mut Trace| {
            ctx.0.push("observer");
            Ok(Flow::Continue)
        });
        slot.install(|ctx: &mut Trace| {
            ctx.0.push("replacer");
            Ok(Flow::Suppress)
        });
        let mut trace = Trace::default();
        slot.invoke(&mut trace);
        assert_eq!(trace.0, ["replacer", "observer"]);
    }

    #[test]
    fn failing_advice_is_dropped_from_the_call_not_the_stack() {
        let mut slot = slot();
        slot.install(|_: &mut Trace| Err(anyhow::anyhow!("boom")));
        let mut trace = Trace::default();
        slot.invoke(&mut trace);
        // fail-open: the original still ran
        assert_eq!(trace.0, ["original"]);
        assert_eq!(slot.wrap_count(), 1);
    }

    #[test]
    fn rollback_by_id_works_out_of_install_order() {
        let mut slot = slot();
        let a = slot.install(|ctx: &mut Trace| {
            ctx.0.push("a");
            Ok(Flow::Continue)
        });
        let b = slot.install(|ctx: &mut Trace| {
            ctx.0.push("b");
            Ok(Flow::Continue)
        });
        assert!(slot.rollback(a));
        assert!(!slot.rollback(a));
        let mut trace = Trace::default();
        slot.invoke(&mut trace);
        assert_eq!(trace.0, ["b", "original"]);
        assert!(slot.rollback(b));
        assert!(slot.is_pristine());
    }

    #[test]
    fn full_rollback_restores_the_exact_original_handler() {
        let mut slot = slot();
        let before = slot.original();
        assert!(slot.resolved().is_some());
        slot.install(|_: &mut Trace| Ok(Flow::Suppress));
        assert!(slot.resolved().is_none());
        slot.rollback_all();
        let after = slot.resolved().unwrap();
        assert!(Rc::ptr_eq(&before, &after));
    }

    #[test]
    fn markers_claim_once_and_clear_on_full_rollback() {
        let mut layer = PatchLayer::new();
        assert!(layer.mark("file-explorer"));
        assert!(!layer.mark("file-explorer"));
        assert!(layer.is_marked("file-explorer"));
        layer.rollback_all();
        assert!(!layer.is_marked("file-explorer"));
        assert!(layer.is_pristine());
    }

    #[test]
    fn advice_state_can_outlive_the_call_through_rc() {
        let seen = Rc::new(RefCell::new(0));
        let mut slot = slot();
        let seen_in = Rc::clone(&seen);
        slot.install(move |_: &mut Trace| {
            *seen_in.borrow_mut() += 1;
            Ok(Flow::Continue)
        });
        let mut trace = Trace::default();
        slot.invoke(&mut trace);
        slot.invoke(&mut trace);
        assert_eq!(*seen.borrow(), 2);
    }
}
