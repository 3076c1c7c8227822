//! Pure diff between the stored tree and a snapshot.
//!
//! Building a plan touches neither the database nor the cache; the
//! synchronizer applies it afterwards.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use crate::cache::{CacheKey, InvalidationPlan};
use crate::domain::entities::{DishRecord, MenuRecord, SubmenuRecord};
use crate::domain::price::discounted_price;

use super::SOURCE;
use super::flatten::{FlatDish, FlatTree, Flattened};

/// Rows removed by the delete pass. Only the highest level with work is
/// acted on; storage cascades take care of descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Deletions {
    #[default]
    None,
    Menus(Vec<Uuid>),
    Submenus(Vec<Uuid>),
    Dishes(Vec<Uuid>),
}

impl Deletions {
    pub fn is_empty(&self) -> bool {
        matches!(self, Deletions::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub create_menus: Vec<MenuRecord>,
    pub create_submenus: Vec<SubmenuRecord>,
    pub create_dishes: Vec<DishRecord>,
    pub deletions: Deletions,
    pub update_menus: Vec<MenuRecord>,
    pub update_submenus: Vec<SubmenuRecord>,
    pub update_dishes: Vec<DishRecord>,
    /// Effective prices to cache, keyed by dish id.
    pub discount_writes: BTreeMap<Uuid, Decimal>,
    pub invalidation: InvalidationPlan,
}

impl SyncPlan {
    pub fn build(
        db: &FlatTree,
        snapshot: &Flattened,
        cached_discounts: &HashMap<Uuid, Decimal>,
    ) -> Self {
        let mut plan = Self::default();
        plan.stage_discounts(db, snapshot, cached_discounts);

        if *db == snapshot.tree {
            return plan;
        }

        plan.plan_creates(db, &snapshot.tree);
        let cascaded = plan.plan_deletes(db, &snapshot.tree);
        plan.plan_updates(db, &snapshot.tree, &cascaded);
        plan
    }

    /// True when the pass has nothing to write to either store.
    pub fn is_noop(&self) -> bool {
        !self.has_db_writes() && self.discount_writes.is_empty() && self.invalidation.is_empty()
    }

    pub fn has_db_writes(&self) -> bool {
        !(self.create_menus.is_empty()
            && self.create_submenus.is_empty()
            && self.create_dishes.is_empty()
            && self.deletions.is_empty()
            && self.update_menus.is_empty()
            && self.update_submenus.is_empty()
            && self.update_dishes.is_empty())
    }

    fn stage_discounts(&mut self, db: &FlatTree, snapshot: &Flattened, cached: &HashMap<Uuid, Decimal>) {
        for (dish_id, dish) in &snapshot.tree.dishes {
            let current = cached.get(dish_id);
            match snapshot.discounts.get(dish_id) {
                Some(percent) => {
                    let Some(price) = discounted_price(dish.record.price, *percent) else {
                        warn!(
                            target = SOURCE,
                            dish_id = %dish_id,
                            price = %dish.record.price,
                            percent = %percent,
                            "discounted price is out of range, skipping overlay"
                        );
                        continue;
                    };
                    if current != Some(&price) {
                        self.discount_writes.insert(*dish_id, price);
                        self.invalidation
                            .add(CacheKey::dish(dish.menu_id, dish.record.submenu_id, *dish_id))
                            .add(CacheKey::dish_list(dish.menu_id, dish.record.submenu_id))
                            .purge_embedding(dish.menu_id);
                    }
                }
                None if current.is_some() => {
                    self.invalidation
                        .add(CacheKey::discount(*dish_id))
                        .purge_embedding(dish.menu_id);
                }
                None => {}
            }
        }

        // Overlays for dishes that left the snapshot entirely. The row may
        // outlive this pass when a higher-level delete takes priority.
        for dish_id in cached.keys() {
            if snapshot.tree.dishes.contains_key(dish_id) {
                continue;
            }
            self.invalidation.add(CacheKey::discount(*dish_id));
            if let Some(dish) = db.dishes.get(dish_id) {
                self.invalidation
                    .extend(dish_structure_keys(dish))
                    .add(CacheKey::dish(dish.menu_id, dish.record.submenu_id, *dish_id));
            }
        }
    }

    fn plan_creates(&mut self, db: &FlatTree, snap: &FlatTree) {
        for (id, menu) in &snap.menus {
            if !db.menus.contains_key(id) {
                self.create_menus.push(menu.clone());
                self.invalidation.add(CacheKey::MenuList);
            }
        }

        for (id, submenu) in &snap.submenus {
            if !db.submenus.contains_key(id) {
                self.create_submenus.push(submenu.clone());
                self.invalidation.extend([
                    CacheKey::MenuList,
                    CacheKey::menu(submenu.menu_id),
                    CacheKey::submenu_list(submenu.menu_id),
                    CacheKey::submenu(submenu.menu_id, *id),
                ]);
            }
        }

        for (id, dish) in &snap.dishes {
            if !db.dishes.contains_key(id) {
                self.create_dishes.push(dish.record.clone());
                self.invalidation
                    .extend(dish_structure_keys(dish))
                    .add(CacheKey::dish(dish.menu_id, dish.record.submenu_id, *id));
            }
        }
    }

    /// Returns the ids of submenus and dishes the storage cascade removes.
    fn plan_deletes(&mut self, db: &FlatTree, snap: &FlatTree) -> Cascade {
        let menus = ids_only_in(&db.menus, &snap.menus);
        if !menus.is_empty() {
            for id in &menus {
                self.invalidation
                    .add(CacheKey::MenuList)
                    .add(CacheKey::menu(*id))
                    .purge_embedding(*id);
            }
            let doomed: BTreeSet<Uuid> = menus.iter().copied().collect();
            let submenus = db
                .submenus
                .values()
                .filter(|submenu| doomed.contains(&submenu.menu_id))
                .map(|submenu| submenu.id)
                .collect();
            self.deletions = Deletions::Menus(menus);
            return Cascade::from_submenus(db, submenus);
        }

        let submenus = ids_only_in(&db.submenus, &snap.submenus);
        if !submenus.is_empty() {
            for id in &submenus {
                let menu_id = db.submenus[id].menu_id;
                self.invalidation
                    .extend([
                        CacheKey::submenu(menu_id, *id),
                        CacheKey::submenu_list(menu_id),
                        CacheKey::MenuList,
                        CacheKey::menu(menu_id),
                    ])
                    .purge_embedding(*id);
            }
            let cascade = Cascade::from_submenus(db, submenus.iter().copied().collect());
            self.deletions = Deletions::Submenus(submenus);
            return cascade;
        }

        let dishes = ids_only_in(&db.dishes, &snap.dishes);
        if !dishes.is_empty() {
            for id in &dishes {
                let dish = &db.dishes[id];
                self.invalidation
                    .extend(dish_structure_keys(dish))
                    .add(CacheKey::dish(dish.menu_id, dish.record.submenu_id, *id));
            }
            self.deletions = Deletions::Dishes(dishes);
        }
        Cascade::default()
    }

    fn plan_updates(&mut self, db: &FlatTree, snap: &FlatTree, cascaded: &Cascade) {
        for (id, menu) in &snap.menus {
            if db.menus.get(id).is_some_and(|stored| stored != menu) {
                self.update_menus.push(menu.clone());
                self.invalidation
                    .extend([CacheKey::MenuList, CacheKey::menu(*id)]);
            }
        }

        for (id, submenu) in &snap.submenus {
            let Some(stored) = db.submenus.get(id) else {
                continue;
            };
            if stored == submenu && !cascaded.submenus.contains(id) {
                continue;
            }
            self.update_submenus.push(submenu.clone());
            self.invalidation.extend([
                CacheKey::submenu(submenu.menu_id, *id),
                CacheKey::submenu_list(submenu.menu_id),
            ]);
            if stored.menu_id != submenu.menu_id {
                self.invalidation
                    .extend([
                        CacheKey::submenu(stored.menu_id, *id),
                        CacheKey::submenu_list(stored.menu_id),
                        CacheKey::menu(stored.menu_id),
                        CacheKey::menu(submenu.menu_id),
                        CacheKey::MenuList,
                    ])
                    .purge_embedding(*id);
            }
        }

        for (id, dish) in &snap.dishes {
            match db.dishes.get(id) {
                Some(stored) => {
                    if stored == dish && !cascaded.dishes.contains(id) {
                        continue;
                    }
                    self.update_dishes.push(dish.record.clone());
                    self.invalidation.extend([
                        CacheKey::dish_list(dish.menu_id, dish.record.submenu_id),
                        CacheKey::dish(dish.menu_id, dish.record.submenu_id, *id),
                    ]);
                    if stored.record.submenu_id != dish.record.submenu_id
                        || stored.menu_id != dish.menu_id
                    {
                        self.invalidation
                            .add(CacheKey::dish(stored.menu_id, stored.record.submenu_id, *id))
                            .extend(dish_structure_keys(stored))
                            .extend(dish_structure_keys(dish));
                    }
                }
                // Created earlier in this pass under a submenu the cascade removed.
                None if cascaded.submenus.contains(&dish.record.submenu_id) => {
                    self.update_dishes.push(dish.record.clone());
                }
                None => {}
            }
        }
    }
}

#[derive(Debug, Default)]
struct Cascade {
    submenus: BTreeSet<Uuid>,
    dishes: BTreeSet<Uuid>,
}

impl Cascade {
    fn from_submenus(db: &FlatTree, submenus: BTreeSet<Uuid>) -> Self {
        let dishes = db
            .dishes
            .values()
            .filter(|dish| submenus.contains(&dish.record.submenu_id))
            .map(|dish| dish.record.id)
            .collect();
        Self { submenus, dishes }
    }
}

fn ids_only_in<V, W>(left: &BTreeMap<Uuid, V>, right: &BTreeMap<Uuid, W>) -> Vec<Uuid> {
    left.keys()
        .filter(|id| !right.contains_key(id))
        .copied()
        .collect()
}

/// Keys whose payload embeds the dish count under the dish's parents.
fn dish_structure_keys(dish: &FlatDish) -> [CacheKey; 5] {
    let (menu_id, submenu_id) = (dish.menu_id, dish.record.submenu_id);
    [
        CacheKey::dish_list(menu_id, submenu_id),
        CacheKey::submenu(menu_id, submenu_id),
        CacheKey::submenu_list(menu_id),
        CacheKey::menu(menu_id),
        CacheKey::MenuList,
    ]
}
