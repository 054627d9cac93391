//! Terminal UI: menus, selectors and rendering

pub mod menu;
pub mod render;
pub mod selector;
