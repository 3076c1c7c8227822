//! Discount overlay applied to dish reads.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::entities::DishView;
use crate::domain::tree::MenuTree;

/// Replace prices of discounted dishes and move those dishes after every
/// undiscounted one. Both groups keep their incoming relative order.
pub fn overlay_list(dishes: Vec<DishView>, discounts: &HashMap<Uuid, Decimal>) -> Vec<DishView> {
    if discounts.is_empty() {
        return dishes;
    }

    let (mut plain, discounted): (Vec<_>, Vec<_>) = dishes
        .into_iter()
        .map(|mut dish| match discounts.get(&dish.id) {
            Some(price) => {
                dish.price = *price;
                (dish, true)
            }
            None => (dish, false),
        })
        .partition(|(_, is_discounted)| !is_discounted);

    plain.extend(discounted);
    plain.into_iter().map(|(dish, _)| dish).collect()
}

/// Overlay prices inside a full tree without reordering.
pub fn overlay_tree(tree: &mut [MenuTree], discounts: &HashMap<Uuid, Decimal>) {
    if discounts.is_empty() {
        return;
    }
    for dish in tree
        .iter_mut()
        .flat_map(|menu| menu.submenus.iter_mut())
        .flat_map(|submenu| submenu.dishes.iter_mut())
    {
        if let Some(price) = discounts.get(&dish.id) {
            dish.price = *price;
        }
    }
}
