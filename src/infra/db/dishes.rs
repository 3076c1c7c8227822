use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    application::repos::{DishesRepo, RepoError},
    domain::{
        entities::DishRecord,
        input::{DishPatch, NewDish},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct DishRow {
    id: Uuid,
    submenu_id: Uuid,
    title: String,
    description: Option<String>,
    price: Decimal,
}

impl From<DishRow> for DishRecord {
    fn from(row: DishRow) -> Self {
        Self {
            id: row.id,
            submenu_id: row.submenu_id,
            title: row.title,
            description: row.description,
            price: row.price,
        }
    }
}

#[async_trait]
impl DishesRepo for PostgresRepositories {
    async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<Option<DishRecord>, RepoError> {
        let row = sqlx::query_as::<_, DishRow>(
            r#"
            SELECT d.id, d.submenu_id, d.title, d.description, d.price
            FROM dishes d
            JOIN submenus s ON s.id = d.submenu_id
            WHERE s.menu_id = $1 AND d.submenu_id = $2 AND d.id = $3
            "#,
        )
        .bind(menu_id)
        .bind(submenu_id)
        .bind(dish_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(DishRecord::from))
    }

    async fn get_list(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Vec<DishRecord>, RepoError> {
        let rows = sqlx::query_as::<_, DishRow>(
            r#"
            SELECT d.id, d.submenu_id, d.title, d.description, d.price
            FROM dishes d
            JOIN submenus s ON s.id = d.submenu_id
            WHERE s.menu_id = $1 AND d.submenu_id = $2
            ORDER BY d.title
            "#,
        )
        .bind(menu_id)
        .bind(submenu_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(DishRecord::from).collect())
    }

    async fn create(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish: NewDish,
    ) -> Result<Option<DishRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let row = sqlx::query_as::<_, DishRow>(
            r#"
            INSERT INTO dishes (id, submenu_id, title, description, price)
            SELECT $1, s.id, $4, $5, $6 FROM submenus s WHERE s.menu_id = $2 AND s.id = $3
            RETURNING id, submenu_id, title, description, price
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(menu_id)
        .bind(submenu_id)
        .bind(&dish.title)
        .bind(&dish.description)
        .bind(dish.price)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.map(DishRecord::from))
    }

    async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
        patch: &DishPatch,
    ) -> Result<Option<DishRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let Some(row) = sqlx::query_as::<_, DishRow>(
            r#"
            SELECT d.id, d.submenu_id, d.title, d.description, d.price
            FROM dishes d
            JOIN submenus s ON s.id = d.submenu_id
            WHERE s.menu_id = $1 AND d.submenu_id = $2 AND d.id = $3
            FOR UPDATE OF d
            "#,
        )
        .bind(menu_id)
        .bind(submenu_id)
        .bind(dish_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let mut record = DishRecord::from(row);
        patch.apply(&mut record);

        sqlx::query(
            "UPDATE dishes SET title = $2, description = $3, price = $4 WHERE id = $1",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.price)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(record))
    }

    async fn delete(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        dish_id: Uuid,
    ) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let result = sqlx::query(
            r#"
            DELETE FROM dishes d
            USING submenus s
            WHERE s.id = d.submenu_id AND s.menu_id = $1 AND d.submenu_id = $2 AND d.id = $3
            "#,
        )
        .bind(menu_id)
        .bind(submenu_id)
        .bind(dish_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
