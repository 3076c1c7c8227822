//! Flattening of nested trees into id-keyed maps with parent ids folded in.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::entities::{DishRecord, MenuRecord, SubmenuRecord};
use crate::domain::tree::MenuTree;

/// Dish row plus the menu it sits under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatDish {
    pub menu_id: Uuid,
    pub record: DishRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatTree {
    pub menus: BTreeMap<Uuid, MenuRecord>,
    pub submenus: BTreeMap<Uuid, SubmenuRecord>,
    pub dishes: BTreeMap<Uuid, FlatDish>,
}

/// A flattened tree plus the transient discount percentages it carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flattened {
    pub tree: FlatTree,
    pub discounts: BTreeMap<Uuid, Decimal>,
}

pub fn flatten(menus: &[MenuTree]) -> Flattened {
    let mut out = Flattened::default();

    for menu in menus {
        out.tree.menus.insert(
            menu.id,
            MenuRecord {
                id: menu.id,
                title: menu.title.clone(),
                description: menu.description.clone(),
            },
        );

        for submenu in &menu.submenus {
            out.tree.submenus.insert(
                submenu.id,
                SubmenuRecord {
                    id: submenu.id,
                    menu_id: menu.id,
                    title: submenu.title.clone(),
                    description: submenu.description.clone(),
                },
            );

            for dish in &submenu.dishes {
                if let Some(percent) = dish.discount {
                    out.discounts.insert(dish.id, percent);
                }
                out.tree.dishes.insert(
                    dish.id,
                    FlatDish {
                        menu_id: menu.id,
                        record: DishRecord {
                            id: dish.id,
                            submenu_id: submenu.id,
                            title: dish.title.clone(),
                            description: dish.description.clone(),
                            price: dish.price,
                        },
                    },
                );
            }
        }
    }

    out
}
