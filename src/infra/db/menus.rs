use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{MenusRepo, RepoError},
    domain::{
        entities::{MenuRecord, MenuSummary},
        input::{MenuPatch, NewMenu},
        tree::MenuTree,
    },
};

use super::{PostgresRepositories, map_sqlx_error, tree::load_tree};

const SUMMARY_SELECT: &str = r#"
    SELECT m.id, m.title, m.description,
           COUNT(DISTINCT s.id) AS submenus_count,
           COUNT(d.id) AS dishes_count
    FROM menus m
    LEFT JOIN submenus s ON s.menu_id = m.id
    LEFT JOIN dishes d ON d.submenu_id = s.id
"#;

#[derive(sqlx::FromRow)]
struct MenuRow {
    id: Uuid,
    title: String,
    description: Option<String>,
}

impl From<MenuRow> for MenuRecord {
    fn from(row: MenuRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MenuSummaryRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    submenus_count: i64,
    dishes_count: i64,
}

impl From<MenuSummaryRow> for MenuSummary {
    fn from(row: MenuSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            submenus_count: row.submenus_count,
            dishes_count: row.dishes_count,
        }
    }
}

#[async_trait]
impl MenusRepo for PostgresRepositories {
    async fn get_detail(&self, menu_id: Uuid) -> Result<Option<MenuSummary>, RepoError> {
        let sql = format!("{SUMMARY_SELECT} WHERE m.id = $1 GROUP BY m.id");
        let row = sqlx::query_as::<_, MenuSummaryRow>(&sql)
            .bind(menu_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(MenuSummary::from))
    }

    async fn get_list(&self) -> Result<Vec<MenuSummary>, RepoError> {
        let sql = format!("{SUMMARY_SELECT} GROUP BY m.id ORDER BY m.title");
        let rows = sqlx::query_as::<_, MenuSummaryRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MenuSummary::from).collect())
    }

    async fn create(&self, menu: NewMenu) -> Result<MenuRecord, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let row = sqlx::query_as::<_, MenuRow>(
            r#"
            INSERT INTO menus (id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, description
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&menu.title)
        .bind(&menu.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update(
        &self,
        menu_id: Uuid,
        patch: &MenuPatch,
    ) -> Result<Option<MenuRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let Some(row) = sqlx::query_as::<_, MenuRow>(
            "SELECT id, title, description FROM menus WHERE id = $1 FOR UPDATE",
        )
        .bind(menu_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let mut record = MenuRecord::from(row);
        patch.apply(&mut record);

        sqlx::query("UPDATE menus SET title = $2, description = $3 WHERE id = $1")
            .bind(record.id)
            .bind(&record.title)
            .bind(&record.description)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(record))
    }

    async fn delete(&self, menu_id: Uuid) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(menu_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn load_tree(&self) -> Result<Vec<MenuTree>, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;
        load_tree(&mut conn).await
    }
}
