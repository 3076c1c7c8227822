use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::discount::overlay_tree;
use crate::application::error::ServiceError;
use crate::application::repos::MenusRepo;
use crate::cache::{CacheKey, CacheService, InvalidationPlan};
use crate::domain::entities::MenuSummary;
use crate::domain::input::{MenuInput, MenuPatch, NewMenu};
use crate::domain::tree::MenuTree;

const ENTITY: &str = "menu";

#[derive(Clone)]
pub struct MenuService {
    repo: Arc<dyn MenusRepo>,
    cache: CacheService,
}

impl MenuService {
    pub fn new(repo: Arc<dyn MenusRepo>, cache: CacheService) -> Self {
        Self { repo, cache }
    }

    pub async fn get_detail(&self, menu_id: Uuid) -> Result<MenuSummary, ServiceError> {
        let key = CacheKey::menu(menu_id);
        if let Some(menu) = self.cache.get::<MenuSummary>(&key).await {
            return Ok(menu);
        }

        let menu = self
            .repo
            .get_detail(menu_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))?;
        self.cache.set(&key, &menu).await;
        Ok(menu)
    }

    pub async fn get_list(&self) -> Result<Vec<MenuSummary>, ServiceError> {
        let key = CacheKey::MenuList;
        if let Some(menus) = self.cache.get::<Vec<MenuSummary>>(&key).await {
            return Ok(menus);
        }

        let menus = self.repo.get_list().await?;
        if !menus.is_empty() {
            self.cache.set(&key, &menus).await;
        }
        Ok(menus)
    }

    /// Whole menu tree with discount overlays applied to dish prices.
    pub async fn get_tree(&self) -> Result<Vec<MenuTree>, ServiceError> {
        let key = CacheKey::FullTree;
        if let Some(tree) = self.cache.get::<Vec<MenuTree>>(&key).await {
            return Ok(tree);
        }

        let mut tree = self.repo.load_tree().await?;
        if !tree.is_empty() {
            let discounts = self.cache.get_all_discounts().await;
            overlay_tree(&mut tree, &discounts);
            self.cache.set(&key, &tree).await;
        }
        Ok(tree)
    }

    pub async fn create(&self, input: MenuInput) -> Result<MenuSummary, ServiceError> {
        let menu = NewMenu::try_from(input)?;
        let record = self.repo.create(menu).await?;

        self.cache
            .invalidate(&InvalidationPlan::of([CacheKey::MenuList]))
            .await;

        info!(
            target = "application::menus::create",
            menu_id = %record.id,
            "menu created"
        );
        Ok(MenuSummary::empty(record))
    }

    pub async fn update(&self, menu_id: Uuid, patch: MenuPatch) -> Result<MenuSummary, ServiceError> {
        let patch = patch.validate()?;
        self.repo
            .update(menu_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))?;

        self.cache
            .invalidate(&InvalidationPlan::of([
                CacheKey::MenuList,
                CacheKey::menu(menu_id),
            ]))
            .await;

        self.repo
            .get_detail(menu_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))
    }

    pub async fn delete(&self, menu_id: Uuid) -> Result<(), ServiceError> {
        if !self.repo.delete(menu_id).await? {
            return Err(ServiceError::not_found(ENTITY));
        }

        self.cache
            .invalidate(
                &InvalidationPlan::of([CacheKey::MenuList, CacheKey::menu(menu_id)])
                    .with_purge(menu_id),
            )
            .await;

        info!(
            target = "application::menus::delete",
            menu_id = %menu_id,
            "menu deleted"
        );
        Ok(())
    }
}
