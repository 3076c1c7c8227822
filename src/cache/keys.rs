//! Cache key definitions.
//!
//! Every cached view is addressed by a `CacheKey`; its rendered form is the
//! key stored in the remote cache. Templates are fixed so that the API path
//! and the reconciler always agree on the keys they touch.

use std::fmt;

use uuid::Uuid;

/// Fixed key holding the entire menu tree.
pub const FULL_TREE_KEY: &str = "all_data";
pub const MENU_LIST_KEY: &str = "list_of_menus";
const DISCOUNT_PREFIX: &str = "discount:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    MenuList,
    Menu {
        menu_id: Uuid,
    },
    SubmenuList {
        menu_id: Uuid,
    },
    Submenu {
        menu_id: Uuid,
        submenu_id: Uuid,
    },
    DishList {
        menu_id: Uuid,
        submenu_id: Uuid,
    },
    Dish {
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    },
    FullTree,
    Discount {
        dish_id: Uuid,
    },
}

impl CacheKey {
    pub fn menu(menu_id: Uuid) -> Self {
        Self::Menu { menu_id }
    }

    pub fn submenu_list(menu_id: Uuid) -> Self {
        Self::SubmenuList { menu_id }
    }

    pub fn submenu(menu_id: Uuid, submenu_id: Uuid) -> Self {
        Self::Submenu {
            menu_id,
            submenu_id,
        }
    }

    pub fn dish_list(menu_id: Uuid, submenu_id: Uuid) -> Self {
        Self::DishList {
            menu_id,
            submenu_id,
        }
    }

    pub fn dish(menu_id: Uuid, submenu_id: Uuid, dish_id: Uuid) -> Self {
        Self::Dish {
            menu_id,
            submenu_id,
            dish_id,
        }
    }

    pub fn discount(dish_id: Uuid) -> Self {
        Self::Discount { dish_id }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::MenuList => f.write_str(MENU_LIST_KEY),
            CacheKey::Menu { menu_id } => write!(f, "menu:{menu_id}"),
            CacheKey::SubmenuList { menu_id } => write!(f, "menu:{menu_id}:list_of_submenus"),
            CacheKey::Submenu {
                menu_id,
                submenu_id,
            } => write!(f, "menu:{menu_id}:submenu:{submenu_id}"),
            CacheKey::DishList {
                menu_id,
                submenu_id,
            } => write!(f, "menu:{menu_id}:submenu:{submenu_id}:list_of_dishes"),
            CacheKey::Dish {
                menu_id,
                submenu_id,
                dish_id,
            } => write!(f, "menu:{menu_id}:submenu:{submenu_id}:dish:{dish_id}"),
            CacheKey::FullTree => f.write_str(FULL_TREE_KEY),
            CacheKey::Discount { dish_id } => write!(f, "{DISCOUNT_PREFIX}{dish_id}"),
        }
    }
}

/// Glob matching every discount entry.
pub fn discount_pattern() -> String {
    format!("{DISCOUNT_PREFIX}*")
}

/// Glob matching every key that embeds `id`.
pub fn embedding_pattern(id: Uuid) -> String {
    format!("*{id}*")
}

/// Recover the dish id from a rendered discount key.
pub fn parse_discount_key(key: &str) -> Option<Uuid> {
    key.strip_prefix(DISCOUNT_PREFIX)
        .and_then(|rest| Uuid::parse_str(rest).ok())
}
