//! Transactional unit of work for the reconciler.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, SyncRepo, SyncUnit},
    domain::{
        entities::{DishRecord, MenuRecord, SubmenuRecord},
        tree::MenuTree,
    },
};

use super::{PostgresRepositories, map_sqlx_error, tree::load_tree};

#[async_trait]
impl SyncRepo for PostgresRepositories {
    async fn begin(&self) -> Result<Box<dyn SyncUnit>, RepoError> {
        let tx = PostgresRepositories::begin(self)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Box::new(PgSyncUnit { tx }))
    }
}

/// Writes issued through this unit become visible only on `commit`.
/// The `update_*` methods upsert so that rows removed by an earlier
/// cascade in the same transaction are restored.
pub struct PgSyncUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SyncUnit for PgSyncUnit {
    async fn load_tree(&mut self) -> Result<Vec<MenuTree>, RepoError> {
        load_tree(&mut self.tx).await
    }

    async fn insert_menu(&mut self, menu: &MenuRecord) -> Result<(), RepoError> {
        sqlx::query("INSERT INTO menus (id, title, description) VALUES ($1, $2, $3)")
            .bind(menu.id)
            .bind(&menu.title)
            .bind(&menu.description)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_submenu(&mut self, submenu: &SubmenuRecord) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO submenus (id, menu_id, title, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(submenu.id)
        .bind(submenu.menu_id)
        .bind(&submenu.title)
        .bind(&submenu.description)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_dish(&mut self, dish: &DishRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO dishes (id, submenu_id, title, description, price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(dish.id)
        .bind(dish.submenu_id)
        .bind(&dish.title)
        .bind(&dish.description)
        .bind(dish.price)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_menu(&mut self, menu: &MenuRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO menus (id, title, description) VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET title = EXCLUDED.title, description = EXCLUDED.description
            "#,
        )
        .bind(menu.id)
        .bind(&menu.title)
        .bind(&menu.description)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_submenu(&mut self, submenu: &SubmenuRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO submenus (id, menu_id, title, description) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET menu_id = EXCLUDED.menu_id,
                title = EXCLUDED.title,
                description = EXCLUDED.description
            "#,
        )
        .bind(submenu.id)
        .bind(submenu.menu_id)
        .bind(&submenu.title)
        .bind(&submenu.description)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_dish(&mut self, dish: &DishRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO dishes (id, submenu_id, title, description, price)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET submenu_id = EXCLUDED.submenu_id,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                price = EXCLUDED.price
            "#,
        )
        .bind(dish.id)
        .bind(dish.submenu_id)
        .bind(&dish.title)
        .bind(&dish.description)
        .bind(dish.price)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_menus(&mut self, ids: &[Uuid]) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM menus WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_submenus(&mut self, ids: &[Uuid]) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM submenus WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_dishes(&mut self, ids: &[Uuid]) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM dishes WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
