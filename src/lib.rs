pub mod aesthetics;
pub mod chrome;
pub mod drag;
pub mod event;
pub mod filter;
pub mod host;
pub mod model;
pub mod patch;
pub mod plugin;
pub mod reconcile;
