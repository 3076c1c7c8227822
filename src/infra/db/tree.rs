//! Whole-tree loading shared by the read path and the reconciler.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::tree::{DishTree, MenuTree, SubmenuTree};

use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct MenuNode {
    id: Uuid,
    title: String,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SubmenuNode {
    id: Uuid,
    menu_id: Uuid,
    title: String,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct DishNode {
    id: Uuid,
    submenu_id: Uuid,
    title: String,
    description: Option<String>,
    price: Decimal,
}

/// Three ordered scans assembled in memory.
pub(super) async fn load_tree(conn: &mut PgConnection) -> Result<Vec<MenuTree>, RepoError> {
    let menus = sqlx::query_as::<_, MenuNode>(
        "SELECT id, title, description FROM menus ORDER BY title",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let submenus = sqlx::query_as::<_, SubmenuNode>(
        "SELECT id, menu_id, title, description FROM submenus ORDER BY title",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let dishes = sqlx::query_as::<_, DishNode>(
        "SELECT id, submenu_id, title, description, price FROM dishes ORDER BY title",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    let mut dishes_by_submenu: HashMap<Uuid, Vec<DishTree>> = HashMap::new();
    for dish in dishes {
        dishes_by_submenu
            .entry(dish.submenu_id)
            .or_default()
            .push(DishTree {
                id: dish.id,
                title: dish.title,
                description: dish.description,
                price: dish.price,
                discount: None,
            });
    }

    let mut submenus_by_menu: HashMap<Uuid, Vec<SubmenuTree>> = HashMap::new();
    for submenu in submenus {
        submenus_by_menu
            .entry(submenu.menu_id)
            .or_default()
            .push(SubmenuTree {
                id: submenu.id,
                title: submenu.title,
                description: submenu.description,
                dishes: dishes_by_submenu.remove(&submenu.id).unwrap_or_default(),
            });
    }

    Ok(menus
        .into_iter()
        .map(|menu| MenuTree {
            id: menu.id,
            title: menu.title,
            description: menu.description,
            submenus: submenus_by_menu.remove(&menu.id).unwrap_or_default(),
        })
        .collect())
}
