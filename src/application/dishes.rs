use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::discount::overlay_list;
use crate::application::error::ServiceError;
use crate::application::repos::DishesRepo;
use crate::cache::{CacheKey, CacheService, InvalidationPlan};
use crate::domain::entities::DishView;
use crate::domain::input::{DishInput, DishPatch, NewDish};

const ENTITY: &str = "dish";

#[derive(Clone)]
pub struct DishService {
    repo: Arc<dyn DishesRepo>,
    cache: CacheService,
}

impl DishService {
    pub fn new(repo: Arc<dyn DishesRepo>, cache: CacheService) -> Self {
        Self { repo, cache }
    }

    pub async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<DishView, ServiceError> {
        let key = CacheKey::dish(menu_id, submenu_id, dish_id);
        if let Some(dish) = self.cache.get::<DishView>(&key).await {
            return Ok(dish);
        }

        let mut dish = DishView::from(
            self.repo
                .get_detail(menu_id, submenu_id, dish_id)
                .await?
                .ok_or_else(|| ServiceError::not_found(ENTITY))?,
        );
        if let Some(price) = self.cache.get_discount(dish_id).await {
            dish.price = price;
        }

        self.cache.set(&key, &dish).await;
        Ok(dish)
    }

    pub async fn get_list(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Vec<DishView>, ServiceError> {
        let key = CacheKey::dish_list(menu_id, submenu_id);
        if let Some(dishes) = self.cache.get::<Vec<DishView>>(&key).await {
            return Ok(dishes);
        }

        let records = self.repo.get_list(menu_id, submenu_id).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let discounts = self.cache.get_all_discounts().await;
        let dishes = overlay_list(records.into_iter().map(DishView::from).collect(), &discounts);
        self.cache.set(&key, &dishes).await;
        Ok(dishes)
    }

    pub async fn create(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        input: DishInput,
    ) -> Result<DishView, ServiceError> {
        let dish = NewDish::try_from(input)?;
        let record = self
            .repo
            .create(menu_id, submenu_id, dish)
            .await?
            .ok_or_else(|| ServiceError::not_found("submenu"))?;

        self.cache
            .invalidate(&InvalidationPlan::of([
                CacheKey::dish_list(menu_id, submenu_id),
                CacheKey::submenu(menu_id, submenu_id),
                CacheKey::submenu_list(menu_id),
                CacheKey::menu(menu_id),
                CacheKey::MenuList,
            ]))
            .await;

        info!(
            target = "application::dishes::create",
            menu_id = %menu_id,
            submenu_id = %submenu_id,
            dish_id = %record.id,
            "dish created"
        );
        Ok(DishView::from(record))
    }

    pub async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
        patch: DishPatch,
    ) -> Result<DishView, ServiceError> {
        let patch = patch.validate()?;
        let record = self
            .repo
            .update(menu_id, submenu_id, dish_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::not_found(ENTITY))?;

        self.cache
            .invalidate(&InvalidationPlan::of([
                CacheKey::dish_list(menu_id, submenu_id),
                CacheKey::dish(menu_id, submenu_id, dish_id),
            ]))
            .await;

        Ok(DishView::from(record))
    }

    pub async fn delete(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<(), ServiceError> {
        if !self.repo.delete(menu_id, submenu_id, dish_id).await? {
            return Err(ServiceError::not_found(ENTITY));
        }

        self.cache
            .invalidate(&InvalidationPlan::of([
                CacheKey::dish_list(menu_id, submenu_id),
                CacheKey::dish(menu_id, submenu_id, dish_id),
                CacheKey::submenu(menu_id, submenu_id),
                CacheKey::submenu_list(menu_id),
                CacheKey::menu(menu_id),
                CacheKey::MenuList,
            ]))
            .await;

        info!(
            target = "application::dishes::delete",
            menu_id = %menu_id,
            submenu_id = %submenu_id,
            dish_id = %dish_id,
            "dish deleted"
        );
        Ok(())
    }
}
