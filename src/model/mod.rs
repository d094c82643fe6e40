pub mod order;
pub mod position;
pub mod settings;
pub mod vpath;
