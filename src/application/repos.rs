//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    DishRecord, MenuRecord, MenuSummary, SubmenuRecord, SubmenuSummary,
};
use crate::domain::input::{DishPatch, MenuPatch, NewDish, NewMenu, NewSubmenu, SubmenuPatch};
use crate::domain::tree::MenuTree;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait MenusRepo: Send + Sync {
    async fn get_detail(&self, menu_id: Uuid) -> Result<Option<MenuSummary>, RepoError>;

    async fn get_list(&self) -> Result<Vec<MenuSummary>, RepoError>;

    async fn create(&self, menu: NewMenu) -> Result<MenuRecord, RepoError>;

    /// Merge `patch` into the stored row; `None` when the menu does not exist.
    async fn update(&self, menu_id: Uuid, patch: &MenuPatch)
    -> Result<Option<MenuRecord>, RepoError>;

    /// Delete the menu and, through the storage cascade, its descendants.
    async fn delete(&self, menu_id: Uuid) -> Result<bool, RepoError>;

    /// Every menu with its submenus and dishes.
    async fn load_tree(&self) -> Result<Vec<MenuTree>, RepoError>;
}

#[async_trait]
pub trait SubmenusRepo: Send + Sync {
    async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Option<SubmenuSummary>, RepoError>;

    async fn get_list(&self, menu_id: Uuid) -> Result<Vec<SubmenuSummary>, RepoError>;

    /// `None` when the owning menu does not exist.
    async fn create(
        &self,
        menu_id: Uuid,
        submenu: NewSubmenu,
    ) -> Result<Option<SubmenuRecord>, RepoError>;

    async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        patch: &SubmenuPatch,
    ) -> Result<Option<SubmenuRecord>, RepoError>;

    async fn delete(&self, menu_id: Uuid, submenu_id: Uuid) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait DishesRepo: Send + Sync {
    async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<Option<DishRecord>, RepoError>;

    async fn get_list(&self, menu_id: Uuid, submenu_id: Uuid)
    -> Result<Vec<DishRecord>, RepoError>;

    /// `None` when the submenu does not exist under `menu_id`.
    async fn create(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish: NewDish,
    ) -> Result<Option<DishRecord>, RepoError>;

    async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
        patch: &DishPatch,
    ) -> Result<Option<DishRecord>, RepoError>;

    async fn delete(&self, menu_id: Uuid, submenu_id: Uuid, dish_id: Uuid)
    -> Result<bool, RepoError>;
}

/// Opens exclusively owned units of work for the reconciler.
#[async_trait]
pub trait SyncRepo: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn SyncUnit>, RepoError>;
}

/// One transaction. Dropping it without `commit` rolls every write back.
#[async_trait]
pub trait SyncUnit: Send {
    async fn load_tree(&mut self) -> Result<Vec<MenuTree>, RepoError>;

    async fn insert_menu(&mut self, menu: &MenuRecord) -> Result<(), RepoError>;
    async fn insert_submenu(&mut self, submenu: &SubmenuRecord) -> Result<(), RepoError>;
    async fn insert_dish(&mut self, dish: &DishRecord) -> Result<(), RepoError>;

    async fn update_menu(&mut self, menu: &MenuRecord) -> Result<(), RepoError>;
    async fn update_submenu(&mut self, submenu: &SubmenuRecord) -> Result<(), RepoError>;
    async fn update_dish(&mut self, dish: &DishRecord) -> Result<(), RepoError>;

    async fn delete_menus(&mut self, ids: &[Uuid]) -> Result<(), RepoError>;
    async fn delete_submenus(&mut self, ids: &[Uuid]) -> Result<(), RepoError>;
    async fn delete_dishes(&mut self, ids: &[Uuid]) -> Result<(), RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}
