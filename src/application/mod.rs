//! Application services layer.

pub mod discount;
pub mod dishes;
pub mod error;
pub mod jobs;
pub mod menus;
pub mod repos;
pub mod snapshot;
pub mod submenus;
pub mod sync;
