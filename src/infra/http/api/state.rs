use std::sync::Arc;

use crate::application::{dishes::DishService, menus::MenuService, submenus::SubmenuService};

#[derive(Clone)]
pub struct ApiState {
    pub menus: Arc<MenuService>,
    pub submenus: Arc<SubmenuService>,
    pub dishes: Arc<DishService>,
}
