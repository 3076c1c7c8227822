//! In-memory adapters shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use menusync::application::dishes::DishService;
use menusync::application::menus::MenuService;
use menusync::application::repos::{
    DishesRepo, MenusRepo, RepoError, SubmenusRepo, SyncRepo, SyncUnit,
};
use menusync::application::snapshot::{SnapshotError, SnapshotSource};
use menusync::application::submenus::SubmenuService;
use menusync::application::sync::Synchronizer;
use menusync::cache::{CacheConfig, CacheService, CacheStore, CacheStoreError, MemoryCacheStore};
use menusync::domain::entities::{
    DishRecord, MenuRecord, MenuSummary, SubmenuRecord, SubmenuSummary,
};
use menusync::domain::input::{DishPatch, MenuPatch, NewDish, NewMenu, NewSubmenu, SubmenuPatch};
use menusync::domain::tree::{DishTree, MenuTree, SubmenuTree};
use menusync::infra::http::ApiState;

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub menus: Vec<MenuRecord>,
    pub submenus: Vec<SubmenuRecord>,
    pub dishes: Vec<DishRecord>,
}

impl Tables {
    fn delete_menus(&mut self, ids: &[Uuid]) {
        self.menus.retain(|menu| !ids.contains(&menu.id));
        let orphaned: Vec<Uuid> = self
            .submenus
            .iter()
            .filter(|submenu| ids.contains(&submenu.menu_id))
            .map(|submenu| submenu.id)
            .collect();
        self.delete_submenus(&orphaned);
    }

    fn delete_submenus(&mut self, ids: &[Uuid]) {
        self.submenus.retain(|submenu| !ids.contains(&submenu.id));
        self.dishes.retain(|dish| !ids.contains(&dish.submenu_id));
    }

    fn delete_dishes(&mut self, ids: &[Uuid]) {
        self.dishes.retain(|dish| !ids.contains(&dish.id));
    }

    fn submenu_in(&self, menu_id: Uuid, submenu_id: Uuid) -> Option<&SubmenuRecord> {
        self.submenus
            .iter()
            .find(|submenu| submenu.id == submenu_id && submenu.menu_id == menu_id)
    }

    fn menu_summary(&self, menu: &MenuRecord) -> MenuSummary {
        let submenu_ids: Vec<Uuid> = self
            .submenus
            .iter()
            .filter(|submenu| submenu.menu_id == menu.id)
            .map(|submenu| submenu.id)
            .collect();
        let dishes = self
            .dishes
            .iter()
            .filter(|dish| submenu_ids.contains(&dish.submenu_id))
            .count();
        MenuSummary {
            id: menu.id,
            title: menu.title.clone(),
            description: menu.description.clone(),
            submenus_count: submenu_ids.len() as i64,
            dishes_count: dishes as i64,
        }
    }

    fn submenu_summary(&self, submenu: &SubmenuRecord) -> SubmenuSummary {
        SubmenuSummary {
            id: submenu.id,
            menu_id: submenu.menu_id,
            title: submenu.title.clone(),
            description: submenu.description.clone(),
            dishes_count: self
                .dishes
                .iter()
                .filter(|dish| dish.submenu_id == submenu.id)
                .count() as i64,
        }
    }

    fn check_titles(&self) -> Result<(), RepoError> {
        fn unique<'a>(
            titles: impl Iterator<Item = &'a str>,
            constraint: &str,
        ) -> Result<(), RepoError> {
            let mut seen = std::collections::HashSet::new();
            for title in titles {
                if !seen.insert(title) {
                    return Err(RepoError::Duplicate {
                        constraint: constraint.to_string(),
                    });
                }
            }
            Ok(())
        }
        unique(self.menus.iter().map(|m| m.title.as_str()), "menus_title_key")?;
        unique(
            self.submenus.iter().map(|s| s.title.as_str()),
            "submenus_title_key",
        )?;
        unique(self.dishes.iter().map(|d| d.title.as_str()), "dishes_title_key")
    }

    pub fn tree(&self) -> Vec<MenuTree> {
        let mut menus = self.menus.clone();
        menus.sort_by(|a, b| a.title.cmp(&b.title));
        menus
            .into_iter()
            .map(|menu| {
                let mut submenus: Vec<&SubmenuRecord> = self
                    .submenus
                    .iter()
                    .filter(|submenu| submenu.menu_id == menu.id)
                    .collect();
                submenus.sort_by(|a, b| a.title.cmp(&b.title));
                MenuTree {
                    id: menu.id,
                    title: menu.title,
                    description: menu.description,
                    submenus: submenus
                        .into_iter()
                        .map(|submenu| {
                            let mut dishes: Vec<&DishRecord> = self
                                .dishes
                                .iter()
                                .filter(|dish| dish.submenu_id == submenu.id)
                                .collect();
                            dishes.sort_by(|a, b| a.title.cmp(&b.title));
                            SubmenuTree {
                                id: submenu.id,
                                title: submenu.title.clone(),
                                description: submenu.description.clone(),
                                dishes: dishes
                                    .into_iter()
                                    .map(|dish| DishTree {
                                        id: dish.id,
                                        title: dish.title.clone(),
                                        description: dish.description.clone(),
                                        price: dish.price,
                                        discount: None,
                                    })
                                    .collect(),
                            }
                        })
                        .collect(),
                }
            })
            .collect()
    }
}

/// Every repository trait over one shared set of tables.
#[derive(Default)]
pub struct MemoryRepos {
    tables: Arc<Mutex<Tables>>,
    /// Sync stage at which the next unit fails: `insert`, `delete`, `update` or `commit`.
    fail_stage: Mutex<Option<&'static str>>,
    pub reads: AtomicUsize,
    pub commits: Arc<AtomicUsize>,
}

impl MemoryRepos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn tables(&self) -> Tables {
        self.tables.lock().expect("tables lock").clone()
    }

    pub fn seed(&self, tables: Tables) {
        *self.tables.lock().expect("tables lock") = tables;
    }

    pub fn fail_at(&self, stage: &'static str) {
        *self.fail_stage.lock().expect("fail lock") = Some(stage);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn read(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.tables.lock().expect("tables lock")
    }

    fn write(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().expect("tables lock")
    }
}

#[async_trait]
impl MenusRepo for MemoryRepos {
    async fn get_detail(&self, menu_id: Uuid) -> Result<Option<MenuSummary>, RepoError> {
        let tables = self.read();
        Ok(tables
            .menus
            .iter()
            .find(|menu| menu.id == menu_id)
            .map(|menu| tables.menu_summary(menu)))
    }

    async fn get_list(&self) -> Result<Vec<MenuSummary>, RepoError> {
        let tables = self.read();
        let mut menus: Vec<MenuSummary> =
            tables.menus.iter().map(|m| tables.menu_summary(m)).collect();
        menus.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(menus)
    }

    async fn create(&self, menu: NewMenu) -> Result<MenuRecord, RepoError> {
        let mut tables = self.write();
        let record = MenuRecord {
            id: Uuid::new_v4(),
            title: menu.title,
            description: menu.description,
        };
        tables.menus.push(record.clone());
        if let Err(err) = tables.check_titles() {
            tables.menus.pop();
            return Err(err);
        }
        Ok(record)
    }

    async fn update(
        &self,
        menu_id: Uuid,
        patch: &MenuPatch,
    ) -> Result<Option<MenuRecord>, RepoError> {
        let mut tables = self.write();
        let Some(menu) = tables.menus.iter_mut().find(|menu| menu.id == menu_id) else {
            return Ok(None);
        };
        patch.apply(menu);
        Ok(Some(menu.clone()))
    }

    async fn delete(&self, menu_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.write();
        let before = tables.menus.len();
        tables.delete_menus(&[menu_id]);
        Ok(tables.menus.len() != before)
    }

    async fn load_tree(&self) -> Result<Vec<MenuTree>, RepoError> {
        Ok(self.read().tree())
    }
}

#[async_trait]
impl SubmenusRepo for MemoryRepos {
    async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Option<SubmenuSummary>, RepoError> {
        let tables = self.read();
        Ok(tables
            .submenu_in(menu_id, submenu_id)
            .map(|submenu| tables.submenu_summary(submenu)))
    }

    async fn get_list(&self, menu_id: Uuid) -> Result<Vec<SubmenuSummary>, RepoError> {
        let tables = self.read();
        let mut submenus: Vec<SubmenuSummary> = tables
            .submenus
            .iter()
            .filter(|submenu| submenu.menu_id == menu_id)
            .map(|submenu| tables.submenu_summary(submenu))
            .collect();
        submenus.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(submenus)
    }

    async fn create(
        &self,
        menu_id: Uuid,
        submenu: NewSubmenu,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let mut tables = self.write();
        if !tables.menus.iter().any(|menu| menu.id == menu_id) {
            return Ok(None);
        }
        let record = SubmenuRecord {
            id: Uuid::new_v4(),
            menu_id,
            title: submenu.title,
            description: submenu.description,
        };
        tables.submenus.push(record.clone());
        if let Err(err) = tables.check_titles() {
            tables.submenus.pop();
            return Err(err);
        }
        Ok(Some(record))
    }

    async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        patch: &SubmenuPatch,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let mut tables = self.write();
        let Some(submenu) = tables
            .submenus
            .iter_mut()
            .find(|submenu| submenu.id == submenu_id && submenu.menu_id == menu_id)
        else {
            return Ok(None);
        };
        patch.apply(submenu);
        Ok(Some(submenu.clone()))
    }

    async fn delete(&self, menu_id: Uuid, submenu_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.write();
        if tables.submenu_in(menu_id, submenu_id).is_none() {
            return Ok(false);
        }
        tables.delete_submenus(&[submenu_id]);
        Ok(true)
    }
}

#[async_trait]
impl DishesRepo for MemoryRepos {
    async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<Option<DishRecord>, RepoError> {
        let tables = self.read();
        if tables.submenu_in(menu_id, submenu_id).is_none() {
            return Ok(None);
        }
        Ok(tables
            .dishes
            .iter()
            .find(|dish| dish.id == dish_id && dish.submenu_id == submenu_id)
            .cloned())
    }

    async fn get_list(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Vec<DishRecord>, RepoError> {
        let tables = self.read();
        if tables.submenu_in(menu_id, submenu_id).is_none() {
            return Ok(Vec::new());
        }
        let mut dishes: Vec<DishRecord> = tables
            .dishes
            .iter()
            .filter(|dish| dish.submenu_id == submenu_id)
            .cloned()
            .collect();
        dishes.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(dishes)
    }

    async fn create(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish: NewDish,
    ) -> Result<Option<DishRecord>, RepoError> {
        let mut tables = self.write();
        if tables.submenu_in(menu_id, submenu_id).is_none() {
            return Ok(None);
        }
        let record = DishRecord {
            id: Uuid::new_v4(),
            submenu_id,
            title: dish.title,
            description: dish.description,
            price: dish.price,
        };
        tables.dishes.push(record.clone());
        if let Err(err) = tables.check_titles() {
            tables.dishes.pop();
            return Err(err);
        }
        Ok(Some(record))
    }

    async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
        patch: &DishPatch,
    ) -> Result<Option<DishRecord>, RepoError> {
        let mut tables = self.write();
        if tables.submenu_in(menu_id, submenu_id).is_none() {
            return Ok(None);
        }
        let Some(dish) = tables
            .dishes
            .iter_mut()
            .find(|dish| dish.id == dish_id && dish.submenu_id == submenu_id)
        else {
            return Ok(None);
        };
        patch.apply(dish);
        Ok(Some(dish.clone()))
    }

    async fn delete(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<bool, RepoError> {
        let mut tables = self.write();
        if tables.submenu_in(menu_id, submenu_id).is_none() {
            return Ok(false);
        }
        let before = tables.dishes.len();
        tables
            .dishes
            .retain(|dish| !(dish.id == dish_id && dish.submenu_id == submenu_id));
        Ok(tables.dishes.len() != before)
    }
}

#[async_trait]
impl SyncRepo for MemoryRepos {
    async fn begin(&self) -> Result<Box<dyn SyncUnit>, RepoError> {
        let fail_stage = self.fail_stage.lock().expect("fail lock").take();
        Ok(Box::new(MemoryUnit {
            tables: self.tables.clone(),
            commits: self.commits.clone(),
            working: self.tables(),
            fail_stage,
        }))
    }
}

/// Works on a private copy of the tables and publishes it on commit.
struct MemoryUnit {
    tables: Arc<Mutex<Tables>>,
    commits: Arc<AtomicUsize>,
    working: Tables,
    fail_stage: Option<&'static str>,
}

impl MemoryUnit {
    fn check(&self, stage: &'static str) -> Result<(), RepoError> {
        if self.fail_stage == Some(stage) {
            return Err(RepoError::Persistence(format!("injected {stage} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl SyncUnit for MemoryUnit {
    async fn load_tree(&mut self) -> Result<Vec<MenuTree>, RepoError> {
        Ok(self.working.tree())
    }

    async fn insert_menu(&mut self, menu: &MenuRecord) -> Result<(), RepoError> {
        self.check("insert")?;
        self.working.menus.push(menu.clone());
        Ok(())
    }

    async fn insert_submenu(&mut self, submenu: &SubmenuRecord) -> Result<(), RepoError> {
        self.check("insert")?;
        self.working.submenus.push(submenu.clone());
        Ok(())
    }

    async fn insert_dish(&mut self, dish: &DishRecord) -> Result<(), RepoError> {
        self.check("insert")?;
        self.working.dishes.push(dish.clone());
        Ok(())
    }

    async fn update_menu(&mut self, menu: &MenuRecord) -> Result<(), RepoError> {
        self.check("update")?;
        self.working.menus.retain(|row| row.id != menu.id);
        self.working.menus.push(menu.clone());
        Ok(())
    }

    async fn update_submenu(&mut self, submenu: &SubmenuRecord) -> Result<(), RepoError> {
        self.check("update")?;
        self.working.submenus.retain(|row| row.id != submenu.id);
        self.working.submenus.push(submenu.clone());
        Ok(())
    }

    async fn update_dish(&mut self, dish: &DishRecord) -> Result<(), RepoError> {
        self.check("update")?;
        self.working.dishes.retain(|row| row.id != dish.id);
        self.working.dishes.push(dish.clone());
        Ok(())
    }

    async fn delete_menus(&mut self, ids: &[Uuid]) -> Result<(), RepoError> {
        self.check("delete")?;
        self.working.delete_menus(ids);
        Ok(())
    }

    async fn delete_submenus(&mut self, ids: &[Uuid]) -> Result<(), RepoError> {
        self.check("delete")?;
        self.working.delete_submenus(ids);
        Ok(())
    }

    async fn delete_dishes(&mut self, ids: &[Uuid]) -> Result<(), RepoError> {
        self.check("delete")?;
        self.working.delete_dishes(ids);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.check("commit")?;
        // Deferred constraints are checked at commit.
        self.working.check_titles()?;
        *self.tables.lock().expect("tables lock") = self.working.clone();
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Cache store that fails every call, standing in for an unreachable server.
#[derive(Default)]
pub struct DownCacheStore {
    pub calls: AtomicUsize,
}

impl DownCacheStore {
    fn fail(&self, command: &'static str) -> CacheStoreError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CacheStoreError::command(command, "connection refused")
    }
}

#[async_trait]
impl CacheStore for DownCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheStoreError> {
        Err(self.fail("GET"))
    }

    async fn get_many(&self, _keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, CacheStoreError> {
        Err(self.fail("MGET"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheStoreError> {
        Err(self.fail("SET"))
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<(), CacheStoreError> {
        Err(self.fail("UNLINK"))
    }

    async fn keys_by_pattern(&self, _pattern: &str) -> Result<Vec<String>, CacheStoreError> {
        Err(self.fail("SCAN"))
    }

    async fn flush_all(&self) -> Result<(), CacheStoreError> {
        Err(self.fail("FLUSHALL"))
    }
}

/// Snapshot source returning a fixed tree, or an error when `broken` is set.
#[derive(Default)]
pub struct StaticSnapshot {
    tree: Mutex<Vec<MenuTree>>,
    pub broken: AtomicBool,
}

impl StaticSnapshot {
    pub fn new(tree: Vec<MenuTree>) -> Self {
        Self {
            tree: Mutex::new(tree),
            broken: AtomicBool::new(false),
        }
    }

    pub fn replace(&self, tree: Vec<MenuTree>) {
        *self.tree.lock().expect("snapshot lock") = tree;
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshot {
    fn describe(&self) -> String {
        "static snapshot".to_string()
    }

    async fn load(&self) -> Result<Vec<MenuTree>, SnapshotError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(SnapshotError::Fetch("sheet unavailable".to_string()));
        }
        Ok(self.tree.lock().expect("snapshot lock").clone())
    }
}

pub struct Harness {
    pub repos: Arc<MemoryRepos>,
    pub store: Arc<MemoryCacheStore>,
    pub cache: CacheService,
    pub menus: MenuService,
    pub submenus: SubmenuService,
    pub dishes: DishService,
    pub synchronizer: Synchronizer,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryCacheStore::new());
        Self::with_store(store.clone(), store)
    }

    pub fn with_store(store: Arc<MemoryCacheStore>, backend: Arc<dyn CacheStore>) -> Self {
        let repos = MemoryRepos::new();
        let cache = CacheService::new(backend, CacheConfig::default());
        Self {
            menus: MenuService::new(repos.clone(), cache.clone()),
            submenus: SubmenuService::new(repos.clone(), cache.clone()),
            dishes: DishService::new(repos.clone(), cache.clone()),
            synchronizer: Synchronizer::new(repos.clone(), cache.clone()),
            repos,
            store,
            cache,
        }
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            menus: Arc::new(self.menus.clone()),
            submenus: Arc::new(self.submenus.clone()),
            dishes: Arc::new(self.dishes.clone()),
        }
    }
}

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn decimal(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

pub fn dish(n: u128, title: &str, price: &str, discount: Option<&str>) -> DishTree {
    DishTree {
        id: id(n),
        title: title.to_string(),
        description: None,
        price: decimal(price),
        discount: discount.map(decimal),
    }
}

pub fn submenu(n: u128, title: &str, dishes: Vec<DishTree>) -> SubmenuTree {
    SubmenuTree {
        id: id(n),
        title: title.to_string(),
        description: None,
        dishes,
    }
}

pub fn menu(n: u128, title: &str, submenus: Vec<SubmenuTree>) -> MenuTree {
    MenuTree {
        id: id(n),
        title: title.to_string(),
        description: None,
        submenus,
    }
}

/// Group lookups used by several suites.
pub fn dish_prices(tables: &Tables) -> HashMap<Uuid, Decimal> {
    tables.dishes.iter().map(|dish| (dish.id, dish.price)).collect()
}
