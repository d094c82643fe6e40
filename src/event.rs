use crate::drag::DropEvent;
use crate::model::settings::SortOrder;

/// Everything that can drive the engine: vault mutations, host lifecycle
/// notifications, user gestures, and the periodic tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginEvent {
    // -- Vault mutations
    VaultCreated { path: String, is_dir: bool },
    VaultDeleted { path: String },
    VaultRenamed { from: String, to: String },

    // -- Host lifecycle
    LayoutReady,
    ViewRegistered { view_type: String },
    LeafSplit,
    StatusBarUpdated,
    RibbonBarUpdated,

    // -- User gestures
    Drop(DropEvent),
    DraggableChange(bool),
    SortMethodChanged(SortOrder),
    FilterInput(String),
    Command(Command),

    // -- System
    Tick,
}

/// Commands the host registers on the engine's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RefreshExplorer,
    CheckConsistency,
    ToggleDragSorting,
}

/// One-shot notifications for the host and other collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    DragSorting(bool),
    FilterChanged(String),
    SortMethodOverridesCustomOrder,
    MoveFailed(String),
    OrderRepaired { folder: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::DragSorting(true) => write!(f, "Drag sorting enabled"),
            Notice::DragSorting(false) => write!(f, "Drag sorting disabled"),
            Notice::FilterChanged(filter) if filter.is_empty() => write!(f, "Filter cleared"),
            Notice::FilterChanged(filter) => write!(f, "Filter: {filter}"),
            Notice::SortMethodOverridesCustomOrder => {
                write!(f, "Custom order is inactive while a time-based sort is selected")
            }
            Notice::MoveFailed(reason) => write!(f, "Move failed: {reason}"),
            Notice::OrderRepaired { folder } => {
                write!(f, "Repaired stale order for {folder}")
            }
        }
    }
}
