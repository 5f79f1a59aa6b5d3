// Tabio state managers
// Managers own the panel's state: the window's tab groups, undo/redo history, and settings.

pub mod group_mutator;
pub mod history_manager;
pub mod memory_host;
pub mod settings_manager;
pub mod tab_host;
