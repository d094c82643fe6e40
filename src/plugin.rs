//! The engine itself: owns the order records, the patch layer, and the
//! per-gesture controllers, and dispatches every host event through one
//! `update` entry point.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{info, warn};

use crate::aesthetics;
use crate::chrome::{self, BarElement, BarKind, BarState, IdOptions};
use crate::drag::{self, DragController, DropEvent};
use crate::event::{Command, Notice, PluginEvent};
use crate::filter::FilterOverlay;
use crate::host::{HostAdapter, NATIVE_SORT_OPTIONS, TreeView};
use crate::model::position::PositionIndex;
use crate::model::settings::{
    SAVE_ATTEMPTS, SAVE_RETRY_TICKS, SettingsService, SortOrder,
};
use crate::model::vpath;
use crate::patch::{
    BarItemCtx, Flow, LayoutCtx, MouseDownCtx, PatchLayer, SortButtonCtx, TreeComputeCtx,
    ViewLifecycleCtx, ViewPhase,
};
use crate::reconcile;

/// Claimed once when the file-explorer hooks go in; repeated view
/// registrations must not double-wrap.
const TREE_PATCH_MARKER: &str = "file-explorer";
const WORKSPACE_PATCH_MARKER: &str = "workspace";

/// One tick is 50ms of host event-loop time.
pub const TICK_MS: u64 = 50;
/// Delay before the second render pass that absorbs host virtualization lag.
const SECOND_PASS_TICKS: u64 = 2;

/// Work queued against the tick counter instead of a timer. A superseded
/// entry is harmless: every action re-reads current state when it fires.
#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Refresh { folder: String },
    SaveRetry { attempt: u32 },
    ConsistencyCheck,
    CollapseBars,
    EnableSorters,
}

#[derive(Debug, Default)]
struct DeferredQueue {
    items: Vec<(u64, Deferred)>,
}

impl DeferredQueue {
    fn schedule(&mut self, due: u64, action: Deferred) {
        self.items.push((due, action));
    }

    fn drain_due(&mut self, now: u64) -> Vec<Deferred> {
        let mut due = Vec::new();
        self.items.retain(|(tick, action)| {
            if *tick <= now {
                due.push(action.clone());
                false
            } else {
                true
            }
        });
        due
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug)]
pub struct ArrangePlugin {
    settings: SettingsService,
    pub view: TreeView,
    index: PositionIndex,
    pub layer: PatchLayer,
    drag: DragController,
    filter: FilterOverlay,
    deferred: DeferredQueue,
    notices: Vec<Notice>,
    now: u64,
    pub status_bar: Vec<BarElement>,
    pub ribbon_bar: Vec<BarElement>,
    pub action_bars: HashMap<String, Vec<BarElement>>,
    status_bar_state: BarState,
    ribbon_bar_state: BarState,
}

impl ArrangePlugin {
    pub fn new(host: &mut dyn HostAdapter, view: TreeView) -> Result<Self> {
        let settings = SettingsService::load(host)?;
        let mut index = PositionIndex::default();
        index.rebuild_all(settings.orders());

        let sort_order = settings.get().sort_order;
        let mut drag = DragController::new(settings.get().drag_delay_ms);
        drag.set_enabled(sort_order.allows_custom_order());

        let mut plugin = Self {
            settings,
            view,
            index,
            layer: PatchLayer::new(),
            drag,
            filter: FilterOverlay::default(),
            deferred: DeferredQueue::default(),
            notices: Vec::new(),
            now: 0,
            status_bar: Vec::new(),
            ribbon_bar: Vec::new(),
            action_bars: HashMap::new(),
            status_bar_state: BarState::default(),
            ribbon_bar_state: BarState::default(),
        };
        plugin.install_workspace_patches();
        aesthetics::apply(host, plugin.settings.get());
        info!("arrange engine up, sort order {sort_order:?}");
        Ok(plugin)
    }

    pub fn update(&mut self, host: &mut dyn HostAdapter, event: PluginEvent) -> Result<()> {
        match event {
            PluginEvent::VaultCreated { path, is_dir } => self.handle_create(host, &path, is_dir),
            PluginEvent::VaultDeleted { path } => self.handle_delete(host, &path),
            PluginEvent::VaultRenamed { from, to } => self.handle_rename(host, &from, &to),
            PluginEvent::LayoutReady => self.handle_layout_ready(host),
            PluginEvent::ViewRegistered { view_type } => {
                if view_type == "file-explorer" {
                    self.install_tree_patches();
                }
            }
            PluginEvent::LeafSplit => {
                let mut ctx = LayoutCtx::default();
                self.layer.layout.invoke(&mut ctx);
                host.request_layout_save();
                for follow_up in ctx.follow_ups {
                    self.update(host, follow_up)?;
                }
            }
            PluginEvent::StatusBarUpdated => {
                let saved = self.settings.get().status_bar_order.clone();
                chrome::assign_ids(&mut self.status_bar, IdOptions::for_bar(BarKind::Status));
                chrome::apply_order(&mut self.status_bar, &saved);
            }
            PluginEvent::RibbonBarUpdated => {
                let saved = self.settings.get().ribbon_bar_order.clone();
                chrome::assign_ids(&mut self.ribbon_bar, IdOptions::for_bar(BarKind::Ribbon));
                chrome::apply_order(&mut self.ribbon_bar, &saved);
            }
            PluginEvent::Drop(drop) => self.handle_drop(host, drop),
            PluginEvent::DraggableChange(enabled) => {
                self.drag.set_enabled(enabled);
                let shield = enabled && self.settings.get().use_only_custom_drag_drop;
                self.view.for_each_item_mut(&mut |item| item.draggable = !shield);
                self.notices.push(Notice::DragSorting(enabled));
            }
            PluginEvent::SortMethodChanged(order) => self.handle_sort_change(host, order),
            PluginEvent::FilterInput(filter) => {
                self.filter.set_filter(&filter);
                self.notices.push(Notice::FilterChanged(filter));
                host.request_render();
            }
            PluginEvent::Command(Command::RefreshExplorer) => self.refresh_all(host),
            PluginEvent::Command(Command::CheckConsistency) => self.consistency_check(host),
            PluginEvent::Command(Command::ToggleDragSorting) => {
                let enabled = !self.drag.is_enabled();
                self.update(host, PluginEvent::DraggableChange(enabled))?;
            }
            PluginEvent::Tick => self.handle_tick(host)?,
        }
        Ok(())
    }

    /// The host's render pass. Filtering wins over ordering; otherwise every
    /// folder's children go through the compute hook, which applies either
    /// the custom order or the native sort.
    pub fn render(&mut self) {
        if self.filter.compute(&mut self.view) {
            return;
        }
        let sort_order = self.settings.get().sort_order;
        for folder in self.view.folder_paths() {
            let positions = self.index.folder_map(&folder);
            let Some(node) = self.view.find_folder_mut(&folder) else {
                continue;
            };
            let Some(children) = node.children.as_mut() else {
                continue;
            };
            let mut ctx = TreeComputeCtx {
                folder: folder.clone(),
                children: std::mem::take(children.items_mut()),
                positions,
                sort_order,
            };
            self.layer.tree_compute.invoke(&mut ctx);
            // the handle may have been swapped during invoke; re-find
            if let Some(node) = self.view.find_folder_mut(&folder)
                && let Some(children) = node.children.as_mut()
            {
                children.replace(ctx.children);
            }
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn has_pending_work(&self) -> bool {
        !self.deferred.is_empty()
    }

    /// Uninstalls every hook, clears the filter, and restores the drag
    /// affordances the host expects. The patch layer is pristine afterwards.
    pub fn teardown(&mut self, host: &mut dyn HostAdapter) {
        self.layer.rollback_all();
        self.filter.clear(&mut self.view);
        self.view.for_each_item_mut(&mut |item| item.draggable = true);
        self.drag.set_enabled(false);
        if self.settings.is_dirty() {
            self.save_settings(host);
        }
        info!("arrange engine torn down");
    }

    // ── vault mutations ──

    fn handle_create(&mut self, host: &mut dyn HostAdapter, path: &str, is_dir: bool) {
        self.view.insert(path, is_dir);
        let folder = self
            .settings
            .with_orders(|orders| reconcile::on_create(orders, path));
        self.refresh(host, &folder);
        // virtualized hosts may not reflect the insertion on the first pass
        self.deferred
            .schedule(self.now + SECOND_PASS_TICKS, Deferred::Refresh { folder });
        self.save_settings(host);
    }

    fn handle_delete(&mut self, host: &mut dyn HostAdapter, path: &str) {
        self.view.remove(path);
        let folder = self
            .settings
            .with_orders(|orders| reconcile::on_delete(orders, path));
        self.refresh(host, &folder);
        self.save_settings(host);
    }

    fn handle_rename(&mut self, host: &mut dyn HostAdapter, from: &str, to: &str) {
        // an echo of a move we already applied ourselves carries no new facts
        let items = self.view.flatten();
        let already_applied = items.iter().any(|i| i.path == to) && !items.iter().any(|i| i.path == from);
        if already_applied {
            self.deferred
                .schedule(self.now + SECOND_PASS_TICKS, Deferred::ConsistencyCheck);
            return;
        }
        self.view.rename(from, to);
        let (old_folder, new_folder) = self
            .settings
            .with_orders(|orders| reconcile::on_rename(orders, from, to));
        self.refresh(host, &old_folder);
        if let Some(folder) = new_folder {
            self.refresh(host, &folder);
        }
        self.deferred
            .schedule(self.now + SECOND_PASS_TICKS, Deferred::ConsistencyCheck);
        self.save_settings(host);
    }

    // ── drag and drop ──

    fn handle_drop(&mut self, host: &mut dyn HostAdapter, drop: DropEvent) {
        if !self.drag.accepts(&drop.source_folder) {
            return;
        }
        self.drag.end();
        if drop.is_cross_folder() {
            self.handle_cross_folder_drop(host, drop);
        } else {
            self.handle_same_folder_drop(host, drop);
        }
    }

    fn handle_same_folder_drop(&mut self, host: &mut dyn HostAdapter, drop: DropEvent) {
        let folder = drop.dest_folder;
        let Some(mut live) = self.view.live_order(&folder) else {
            return;
        };
        drag::reorder_within(&mut live, &drop.dragged, drop.target_index);
        self.apply_live_order(&folder, &live);
        // the live post-drop order is authoritative, not the arithmetic
        let recaptured = self.view.live_order(&folder).unwrap_or(live);
        self.settings
            .with_orders(|orders| orders.set(&folder, recaptured));
        self.refresh(host, &folder);
        self.save_settings(host);
    }

    fn handle_cross_folder_drop(&mut self, host: &mut dyn HostAdapter, drop: DropEvent) {
        let cross = drag::begin_cross_move(self.settings.orders(), &drop);
        self.settings.with_orders(|orders| {
            for name in &drop.dragged {
                orders.remove(&drop.source_folder, name);
            }
        });

        let mut moved = Vec::new();
        for name in &drop.dragged {
            let from = vpath::join(&drop.source_folder, name);
            match host.move_path(&from, &drop.dest_folder) {
                Ok(to) => {
                    self.view.rename(&from, &to);
                    moved.push((from, to));
                }
                Err(err) => {
                    warn!("move of {from} rejected, rolling back: {err}");
                    self.settings
                        .with_orders(|orders| drag::rollback_cross_move(orders, cross));
                    self.notices.push(Notice::MoveFailed(err.to_string()));
                    self.refresh(host, &drop.source_folder);
                    self.refresh(host, &drop.dest_folder);
                    // any names moved before the failure are real drift now
                    self.deferred
                        .schedule(self.now + SECOND_PASS_TICKS, Deferred::ConsistencyCheck);
                    return;
                }
            }
        }

        // moved folders keep their own records, and their descendants',
        // under the new keys
        self.settings.with_orders(|orders| {
            for (from, to) in &moved {
                orders.rekey_subtree(from, to);
            }
        });

        // slot the arrivals into the destination's visible children, then
        // let the live tree dictate what both records become
        if let Some(mut dest_live) = self.view.live_order(&drop.dest_folder) {
            for (offset, name) in drop.dragged.iter().enumerate() {
                drag::reorder_array(&mut dest_live, name, drop.target_index + offset);
            }
            self.apply_live_order(&drop.dest_folder, &dest_live);
        }
        let recaptured_dest = self.view.live_order(&drop.dest_folder);
        let recaptured_src = self
            .settings
            .orders()
            .has(&drop.source_folder)
            .then(|| self.view.live_order(&drop.source_folder))
            .flatten();
        self.settings.with_orders(|orders| {
            if let Some(order) = recaptured_dest {
                orders.set(&drop.dest_folder, order);
            }
            if let Some(order) = recaptured_src {
                orders.set(&drop.source_folder, order);
            }
        });
        self.refresh(host, &drop.source_folder);
        self.refresh(host, &drop.dest_folder);
        self.deferred
            .schedule(self.now + SECOND_PASS_TICKS, Deferred::ConsistencyCheck);
        self.save_settings(host);
    }

    /// Reorders a folder's live children to match a name list; names the
    /// list does not know keep their relative order at the end.
    fn apply_live_order(&mut self, folder: &str, names: &[String]) {
        let Some(node) = self.view.find_folder_mut(folder) else {
            return;
        };
        let Some(children) = node.children.as_mut() else {
            return;
        };
        let mut nodes = std::mem::take(children.items_mut());
        nodes.sort_by_key(|n| {
            names
                .iter()
                .position(|name| *name == n.item.name)
                .unwrap_or(usize::MAX)
        });
        children.replace(nodes);
    }

    // ── sort method and filters ──

    fn handle_sort_change(&mut self, host: &mut dyn HostAdapter, order: SortOrder) {
        self.settings.set_sort_order(order);
        if order.allows_custom_order() {
            // give the host a beat to finish swapping its sort state
            self.deferred.schedule(self.now + 1, Deferred::EnableSorters);
        } else {
            self.drag.set_enabled(false);
            self.notices.push(Notice::SortMethodOverridesCustomOrder);
        }
        self.save_settings(host);
        host.request_render();
    }

    // ── patch installation ──

    fn install_workspace_patches(&mut self) {
        if !self.layer.mark(WORKSPACE_PATCH_MARKER) {
            return;
        }
        // the stock menu is rebuilt wholesale so "custom" sits with the
        // native methods instead of bolted on after
        self.layer.sort_button.install(|ctx: &mut SortButtonCtx| {
            ctx.options = NATIVE_SORT_OPTIONS.iter().map(|s| s.to_string()).collect();
            ctx.options.push("custom".to_string());
            ctx.rearrange_toggle = true;
            Ok(Flow::Suppress)
        });
        self.layer.status_bar_item.install(|ctx: &mut BarItemCtx| {
            ctx.follow_ups.push(PluginEvent::StatusBarUpdated);
            Ok(Flow::Continue)
        });
        self.layer.ribbon_icon.install(|ctx: &mut BarItemCtx| {
            ctx.follow_ups.push(PluginEvent::RibbonBarUpdated);
            Ok(Flow::Continue)
        });
        self.layer.layout.install(|_: &mut LayoutCtx| Ok(Flow::Continue));
        self.layer
            .view_lifecycle
            .install(|ctx: &mut ViewLifecycleCtx| {
                if ctx.phase == ViewPhase::Load && ctx.has_action_bar {
                    ctx.sorter_attached = true;
                }
                Ok(Flow::Continue)
            });
        self.layer.mousedown.install(|ctx: &mut MouseDownCtx| {
            if ctx.tab_header && (ctx.alt || ctx.meta) {
                return Ok(Flow::Suppress);
            }
            Ok(Flow::Continue)
        });
    }

    fn install_tree_patches(&mut self) {
        if !self.layer.mark(TREE_PATCH_MARKER) {
            return;
        }
        self.layer.tree_compute.install(|ctx: &mut TreeComputeCtx| {
            if !ctx.sort_order.allows_custom_order() || ctx.positions.is_empty() {
                return Ok(Flow::Continue);
            }
            ctx.children.sort_by_key(|node| {
                ctx.positions
                    .get(&node.item.path)
                    .copied()
                    .unwrap_or(usize::MAX)
            });
            Ok(Flow::Suppress)
        });
    }

    fn handle_layout_ready(&mut self, host: &mut dyn HostAdapter) {
        self.install_tree_patches();
        self.update_bars();
        if self.settings.get().auto_hide {
            self.deferred.schedule(self.now + 1, Deferred::CollapseBars);
        }
        self.refresh_all(host);
    }

    fn update_bars(&mut self) {
        chrome::assign_ids(&mut self.status_bar, IdOptions::for_bar(BarKind::Status));
        chrome::apply_order(&mut self.status_bar, &self.settings.get().status_bar_order);
        chrome::assign_ids(&mut self.ribbon_bar, IdOptions::for_bar(BarKind::Ribbon));
        chrome::apply_order(&mut self.ribbon_bar, &self.settings.get().ribbon_bar_order);
    }

    // ── host entry points (called from the wrapped host behaviors) ──

    pub fn host_add_status_bar_item(
        &mut self,
        host: &mut dyn HostAdapter,
        element: BarElement,
    ) -> Result<()> {
        self.status_bar.push(element);
        let mut ctx = BarItemCtx { bar: BarKind::Status, follow_ups: Vec::new() };
        self.layer.status_bar_item.invoke(&mut ctx);
        for follow_up in ctx.follow_ups {
            self.update(host, follow_up)?;
        }
        Ok(())
    }

    pub fn host_add_ribbon_icon(
        &mut self,
        host: &mut dyn HostAdapter,
        element: BarElement,
    ) -> Result<()> {
        self.ribbon_bar.push(element);
        let mut ctx = BarItemCtx { bar: BarKind::Ribbon, follow_ups: Vec::new() };
        self.layer.ribbon_icon.invoke(&mut ctx);
        for follow_up in ctx.follow_ups {
            self.update(host, follow_up)?;
        }
        Ok(())
    }

    pub fn host_view_loaded(&mut self, view_type: &str, has_action_bar: bool) {
        let mut ctx = ViewLifecycleCtx {
            phase: ViewPhase::Load,
            view_type: view_type.to_string(),
            has_action_bar,
            sorter_attached: false,
        };
        self.layer.view_lifecycle.invoke(&mut ctx);
        if ctx.sorter_attached {
            let mut bar = self.action_bars.remove(view_type).unwrap_or_default();
            chrome::assign_ids(&mut bar, IdOptions::for_bar(BarKind::ViewActions));
            if let Some(saved) =
                chrome::saved_order(self.settings.get(), BarKind::ViewActions, view_type)
            {
                chrome::apply_order(&mut bar, saved);
            }
            self.action_bars.insert(view_type.to_string(), bar);
        }
    }

    pub fn host_view_unloaded(&mut self, view_type: &str) {
        let mut ctx = ViewLifecycleCtx {
            phase: ViewPhase::Unload,
            view_type: view_type.to_string(),
            has_action_bar: false,
            sorter_attached: false,
        };
        self.layer.view_lifecycle.invoke(&mut ctx);
        self.action_bars.remove(view_type);
    }

    /// Returns whether the host should run its own mousedown handling.
    pub fn host_mousedown(&mut self, tab_header: bool, alt: bool, meta: bool) -> bool {
        let mut ctx = MouseDownCtx { tab_header, alt, meta, default_handled: false };
        self.layer.mousedown.invoke(&mut ctx);
        ctx.default_handled
    }

    /// A drag gesture started on a drop surface. Returns whether the engine
    /// accepted it; a refusal leaves the host's native drag behavior alone.
    pub fn host_drag_started(&mut self, folder: &str, dragged: Vec<String>) -> bool {
        self.drag.begin(folder, dragged)
    }

    /// Per-folder opt-in/out for drag sorting, independent of the global
    /// toggle.
    pub fn host_set_folder_drag(&mut self, folder: &str, enabled: bool) {
        if enabled {
            self.drag.enable_folder(folder);
        } else {
            self.drag.disable_folder(folder);
        }
    }

    /// A bar item was dropped at a new slot. The captured post-drop order
    /// becomes the persisted one for that bar.
    pub fn host_bar_drop(
        &mut self,
        host: &mut dyn HostAdapter,
        bar: BarKind,
        view_type: &str,
        old_index: usize,
        new_index: usize,
    ) {
        match bar {
            BarKind::Status => {
                chrome::reorder_index(&mut self.status_bar, old_index, new_index);
                self.settings
                    .set_status_bar_order(chrome::capture_order(&self.status_bar));
            }
            BarKind::Ribbon => {
                chrome::reorder_index(&mut self.ribbon_bar, old_index, new_index);
                self.settings
                    .set_ribbon_bar_order(chrome::capture_order(&self.ribbon_bar));
            }
            BarKind::ViewActions => {
                let Some(elements) = self.action_bars.get_mut(view_type) else {
                    return;
                };
                chrome::reorder_index(elements, old_index, new_index);
                let order = chrome::capture_order(elements);
                self.settings.set_action_bar_order(view_type, order);
            }
            // tab headers persist through the host's layout, not the blob
            BarKind::Tabs => return,
        }
        self.save_settings(host);
    }

    /// A tab was dropped at a new index within its header row.
    pub fn host_tab_drop(
        &mut self,
        host: &mut dyn HostAdapter,
        tabs: &mut Vec<String>,
        old_index: usize,
        new_index: usize,
    ) {
        chrome::reorder_index(tabs, old_index, new_index);
        host.request_layout_save();
    }

    /// The sort menu is being built; returns the options to display.
    pub fn host_sort_menu(&mut self) -> SortButtonCtx {
        let mut ctx = SortButtonCtx::default();
        self.layer.sort_button.invoke(&mut ctx);
        ctx
    }

    pub fn host_bar_mouse_enter(&mut self, bar: BarKind) {
        match bar {
            BarKind::Status => self.status_bar_state.cancel_hide(),
            BarKind::Ribbon => self.ribbon_bar_state.cancel_hide(),
            _ => {}
        }
    }

    pub fn host_bar_mouse_leave(&mut self, bar: BarKind) {
        if !self.settings.get().auto_hide {
            return;
        }
        let delay_ticks = self.settings.get().auto_hide_delay_ms / TICK_MS;
        match bar {
            BarKind::Status => self.status_bar_state.schedule_hide(self.now, delay_ticks),
            BarKind::Ribbon => self.ribbon_bar_state.schedule_hide(self.now, delay_ticks),
            _ => {}
        }
    }

    pub fn host_bar_separator_clicked(&mut self, bar: BarKind) {
        match bar {
            BarKind::Status => self.status_bar_state.toggle(&mut self.status_bar),
            BarKind::Ribbon => self.ribbon_bar_state.toggle(&mut self.ribbon_bar),
            _ => {}
        }
    }

    // ── refresh, consistency, persistence ──

    /// The single funnel both the drag path and the reconciler end in:
    /// rebuild the index for the touched folder, then ask for a render.
    fn refresh(&mut self, host: &mut dyn HostAdapter, folder: &str) {
        self.index.rebuild(folder, self.settings.orders());
        host.request_render();
    }

    fn refresh_all(&mut self, host: &mut dyn HostAdapter) {
        self.index.rebuild_all(self.settings.orders());
        host.request_render();
    }

    /// Folder-by-folder comparison of live order against the records; drift
    /// gets the record pruned/extended and a forced re-render. Records whose
    /// folder vanished entirely are dropped from the blob.
    fn consistency_check(&mut self, host: &mut dyn HostAdapter) {
        if self.filter.is_filtered() {
            return;
        }
        let dead = reconcile::dead_records(self.settings.orders(), &self.view);
        let stale = reconcile::folders_out_of_sync(self.settings.orders(), &self.view);
        if dead.is_empty() && stale.is_empty() {
            return;
        }
        if !dead.is_empty() {
            self.settings.with_orders(|orders| {
                for folder in &dead {
                    orders.set(folder, Vec::new());
                }
            });
        }
        for folder in &stale {
            let view = &self.view;
            let repaired = self
                .settings
                .with_orders(|orders| reconcile::align_folder(orders, folder, view));
            if repaired {
                self.notices.push(Notice::OrderRepaired { folder: folder.clone() });
            }
        }
        self.refresh_all(host);
        self.save_settings(host);
    }

    fn save_settings(&mut self, host: &mut dyn HostAdapter) {
        if let Err(err) = self.settings.save(host) {
            warn!("settings save failed, will retry: {err}");
            self.deferred
                .schedule(self.now + SAVE_RETRY_TICKS, Deferred::SaveRetry { attempt: 1 });
        }
    }

    fn retry_save(&mut self, host: &mut dyn HostAdapter, attempt: u32) {
        match self.settings.save(host) {
            Ok(()) => info!("settings save succeeded on retry {attempt}"),
            Err(err) if attempt < SAVE_ATTEMPTS => {
                warn!("settings save retry {attempt} failed: {err}");
                self.deferred.schedule(
                    self.now + SAVE_RETRY_TICKS,
                    Deferred::SaveRetry { attempt: attempt + 1 },
                );
            }
            Err(err) => {
                warn!("giving up on settings save after {attempt} retries: {err}");
            }
        }
    }

    fn handle_tick(&mut self, host: &mut dyn HostAdapter) -> Result<()> {
        self.now += 1;
        for action in self.deferred.drain_due(self.now) {
            match action {
                Deferred::Refresh { folder } => self.refresh(host, &folder),
                Deferred::SaveRetry { attempt } => self.retry_save(host, attempt),
                Deferred::ConsistencyCheck => self.consistency_check(host),
                Deferred::CollapseBars => {
                    self.status_bar_state.collapse(&mut self.status_bar);
                    self.ribbon_bar_state.collapse(&mut self.ribbon_bar);
                }
                Deferred::EnableSorters => self.drag.set_enabled(true),
            }
        }
        if self.status_bar_state.hide_due(self.now) {
            self.status_bar_state.collapse(&mut self.status_bar);
        }
        if self.ribbon_bar_state.hide_due(self.now) {
            self.ribbon_bar_state.collapse(&mut self.ribbon_bar);
        }
        Ok(())
    }
}
