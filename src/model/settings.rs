use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::host::{HostAdapter, HostError};
use crate::model::order::OrderStore;

/// How many times a failed settings save is retried before giving up.
pub const SAVE_ATTEMPTS: u32 = 3;
/// Ticks between save retries.
pub const SAVE_RETRY_TICKS: u64 = 4;

/// Which ordering the file tree renders with. `Custom` engages the order
/// records; `Alphabetical` leaves the host's native sort untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Alphabetical,
    Custom,
}

impl SortOrder {
    pub fn allows_custom_order(self) -> bool {
        self == SortOrder::Custom
    }
}

/// Everything persisted between sessions, orders included. Unknown fields in
/// an old blob are ignored; missing fields fall back to defaults, so the blob
/// survives upgrades in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ArrangeSettings {
    pub status_bar_order: Vec<String>,
    pub ribbon_bar_order: Vec<String>,
    pub file_explorer_order: OrderStore,
    /// Keyed by view type; per-view action-bar icon order.
    pub action_bar_order: BTreeMap<String, Vec<String>>,
    pub auto_hide: bool,
    pub auto_hide_delay_ms: u64,
    pub drag_delay_ms: u64,
    pub sort_order: SortOrder,
    /// When set, the host's native drag affordance is shut off while the
    /// engine's own drag sorting is live.
    pub use_only_custom_drag_drop: bool,
    pub drag_drop_color: String,
    pub hover_color: String,
}

impl Default for ArrangeSettings {
    fn default() -> Self {
        Self {
            status_bar_order: Vec::new(),
            ribbon_bar_order: Vec::new(),
            file_explorer_order: OrderStore::default(),
            action_bar_order: BTreeMap::new(),
            auto_hide: false,
            auto_hide_delay_ms: 2000,
            drag_delay_ms: 200,
            sort_order: SortOrder::default(),
            use_only_custom_drag_drop: false,
            drag_drop_color: "#7F50E0".to_string(),
            hover_color: "#E0E0E0".to_string(),
        }
    }
}

/// Owns the settings and the only write paths into them. Callers go through
/// the narrow mutators below; nothing outside this type hands out `&mut`
/// access to the whole settings struct.
#[derive(Debug, Default)]
pub struct SettingsService {
    settings: ArrangeSettings,
    dirty: bool,
}

impl SettingsService {
    /// Loads the persisted blob, merging it over defaults. A corrupt blob is
    /// logged and replaced by defaults rather than failing startup.
    pub fn load(host: &mut dyn HostAdapter) -> Result<Self, HostError> {
        let settings = match host.load_blob()? {
            Some(blob) => match toml::from_str(&blob) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!("unreadable settings blob, starting from defaults: {err}");
                    ArrangeSettings::default()
                }
            },
            None => ArrangeSettings::default(),
        };
        Ok(Self { settings, dirty: false })
    }

    pub fn save(&mut self, host: &mut dyn HostAdapter) -> Result<(), HostError> {
        let blob = toml::to_string_pretty(&self.settings)
            .map_err(|err| HostError::Store(err.to_string()))?;
        host.save_blob(&blob)?;
        self.dirty = false;
        Ok(())
    }

    pub fn get(&self) -> &ArrangeSettings {
        &self.settings
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Scoped mutable access to the order records; any use marks the
    /// settings dirty.
    pub fn with_orders<R>(&mut self, f: impl FnOnce(&mut OrderStore) -> R) -> R {
        self.dirty = true;
        f(&mut self.settings.file_explorer_order)
    }

    pub fn orders(&self) -> &OrderStore {
        &self.settings.file_explorer_order
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) {
        if self.settings.sort_order != sort_order {
            self.settings.sort_order = sort_order;
            self.dirty = true;
        }
    }

    pub fn set_auto_hide(&mut self, auto_hide: bool) {
        self.settings.auto_hide = auto_hide;
        self.dirty = true;
    }

    pub fn set_auto_hide_delay_ms(&mut self, delay: u64) {
        self.settings.auto_hide_delay_ms = delay;
        self.dirty = true;
    }

    pub fn set_drag_delay_ms(&mut self, delay: u64) {
        self.settings.drag_delay_ms = delay;
        self.dirty = true;
    }

    pub fn set_use_only_custom_drag_drop(&mut self, enabled: bool) {
        self.settings.use_only_custom_drag_drop = enabled;
        self.dirty = true;
    }

    pub fn set_drag_drop_color(&mut self, color: String) {
        self.settings.drag_drop_color = color;
        self.dirty = true;
    }

    pub fn set_hover_color(&mut self, color: String) {
        self.settings.hover_color = color;
        self.dirty = true;
    }

    pub fn set_status_bar_order(&mut self, order: Vec<String>) {
        self.settings.status_bar_order = order;
        self.dirty = true;
    }

    pub fn set_ribbon_bar_order(&mut self, order: Vec<String>) {
        self.settings.ribbon_bar_order = order;
        self.dirty = true;
    }

    pub fn set_action_bar_order(&mut self, view_type: &str, order: Vec<String>) {
        self.settings
            .action_bar_order
            .insert(view_type.to_string(), order);
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;

    #[test]
    fn defaults_match_the_documented_values() {
        let s = ArrangeSettings::default();
        assert_eq!(s.auto_hide_delay_ms, 2000);
        assert_eq!(s.drag_delay_ms, 200);
        assert_eq!(s.sort_order, SortOrder::Alphabetical);
        assert_eq!(s.drag_drop_color, "#7F50E0");
        assert_eq!(s.hover_color, "#E0E0E0");
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut host = MemoryHost::default();
        let mut service = SettingsService::default();
        service.set_drag_delay_ms(350);
        service.with_orders(|orders| {
            orders.set("/", vec!["b.md".into(), "a.md".into()]);
        });
        service.save(&mut host).unwrap();
        assert!(!service.is_dirty());

        let reloaded = SettingsService::load(&mut host).unwrap();
        assert_eq!(reloaded.get().drag_delay_ms, 350);
        assert_eq!(reloaded.orders().get("/"), ["b.md", "a.md"]);
    }

    #[test]
    fn corrupt_blob_falls_back_to_defaults() {
        let mut host = MemoryHost::default();
        host.save_blob("sort_order = [[[").unwrap();
        let service = SettingsService::load(&mut host).unwrap();
        assert_eq!(*service.get(), ArrangeSettings::default());
    }

    #[test]
    fn partial_blob_merges_over_defaults() {
        let mut host = MemoryHost::default();
        host.save_blob("drag_delay_ms = 99").unwrap();
        let service = SettingsService::load(&mut host).unwrap();
        assert_eq!(service.get().drag_delay_ms, 99);
        assert_eq!(service.get().auto_hide_delay_ms, 2000);
    }

    #[test]
    fn only_order_access_through_the_scope_marks_dirty() {
        let mut service = SettingsService::default();
        assert!(!service.is_dirty());
        let len = service.orders().get("/").len();
        assert_eq!(len, 0);
        assert!(!service.is_dirty());
        service.with_orders(|_| {});
        assert!(service.is_dirty());
    }

    #[test]
    fn sort_order_round_trips_as_lowercase_names() {
        let s: ArrangeSettings = toml::from_str("sort_order = \"custom\"").unwrap();
        assert_eq!(s.sort_order, SortOrder::Custom);
        assert!(s.sort_order.allows_custom_order());
        assert!(!SortOrder::Alphabetical.allows_custom_order());
    }
}
