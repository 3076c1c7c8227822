use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::repos::SubmenusRepo;
use crate::cache::{CacheKey, CacheService, InvalidationPlan};
use crate::domain::entities::SubmenuSummary;
use crate::domain::input::{NewSubmenu, SubmenuInput, SubmenuPatch};

const ENTITY: &str = "submenu";

#[derive(Clone)]
pub struct SubmenuService {
    repo: Arc<dyn SubmenusRepo>,
    cache: CacheService,
}

impl SubmenuService {
    pub fn new(repo: Arc<dyn SubmenusRepo>, cache: CacheService) -> Self {
        Self { repo, cache }
    }

    pub async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<SubmenuSummary, ServiceError> {
        let key = CacheKey::submenu(menu_id, submenu_id);
        if let Some(submenu) = self.cache.get::<SubmenuSummary>(&key).await {
            return Ok(submenu);
        }

        let submenu = self
            .repo
            .get_detail(menu_id, submenu_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))?;
        self.cache.set(&key, &submenu).await;
        Ok(submenu)
    }

    pub async fn get_list(&self, menu_id: Uuid) -> Result<Vec<SubmenuSummary>, ServiceError> {
        let key = CacheKey::submenu_list(menu_id);
        if let Some(submenus) = self.cache.get::<Vec<SubmenuSummary>>(&key).await {
            return Ok(submenus);
        }

        let submenus = self.repo.get_list(menu_id).await?;
        if !submenus.is_empty() {
            self.cache.set(&key, &submenus).await;
        }
        Ok(submenus)
    }

    pub async fn create(
        &self,
        menu_id: Uuid,
        input: SubmenuInput,
    ) -> Result<SubmenuSummary, ServiceError> {
        let submenu = NewSubmenu::try_from(input)?;
        let record = self
            .repo
            .create(menu_id, submenu)
            .await?
            .ok_or_else(|| ServiceError::not_found("menu"))?;

        self.cache
            .invalidate(&InvalidationPlan::of([
                CacheKey::MenuList,
                CacheKey::menu(menu_id),
                CacheKey::submenu_list(menu_id),
            ]))
            .await;

        info!(
            target = "application::submenus::create",
            menu_id = %menu_id,
            submenu_id = %record.id,
            "submenu created"
        );
        Ok(SubmenuSummary::empty(record))
    }

    pub async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        patch: SubmenuPatch,
    ) -> Result<SubmenuSummary, ServiceError> {
        let patch = patch.validate()?;
        self.repo
            .update(menu_id, submenu_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))?;

        self.cache
            .invalidate(&InvalidationPlan::of([
                CacheKey::submenu(menu_id, submenu_id),
                CacheKey::submenu_list(menu_id),
            ]))
            .await;

        self.repo
            .get_detail(menu_id, submenu_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))
    }

    pub async fn delete(&self, menu_id: Uuid, submenu_id: Uuid) -> Result<(), ServiceError> {
        if !self.repo.delete(menu_id, submenu_id).await? {
            return Err(ServiceError::not_found(ENTITY));
        }

        self.cache
            .invalidate(
                &InvalidationPlan::of([
                    CacheKey::submenu(menu_id, submenu_id),
                    CacheKey::submenu_list(menu_id),
                    CacheKey::MenuList,
                    CacheKey::menu(menu_id),
                ])
                .with_purge(submenu_id),
            )
            .await;

        info!(
            target = "application::submenus::delete",
            menu_id = %menu_id,
            submenu_id = %submenu_id,
            "submenu deleted"
        );
        Ok(())
    }
}
