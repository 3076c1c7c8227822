use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{RepoError, SubmenusRepo},
    domain::{
        entities::{SubmenuRecord, SubmenuSummary},
        input::{NewSubmenu, SubmenuPatch},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

const SUMMARY_SELECT: &str = r#"
    SELECT s.id, s.menu_id, s.title, s.description,
           COUNT(d.id) AS dishes_count
    FROM submenus s
    LEFT JOIN dishes d ON d.submenu_id = s.id
"#;

#[derive(sqlx::FromRow)]
struct SubmenuRow {
    id: Uuid,
    menu_id: Uuid,
    title: String,
    description: Option<String>,
}

impl From<SubmenuRow> for SubmenuRecord {
    fn from(row: SubmenuRow) -> Self {
        Self {
            id: row.id,
            menu_id: row.menu_id,
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubmenuSummaryRow {
    id: Uuid,
    menu_id: Uuid,
    title: String,
    description: Option<String>,
    dishes_count: i64,
}

impl From<SubmenuSummaryRow> for SubmenuSummary {
    fn from(row: SubmenuSummaryRow) -> Self {
        Self {
            id: row.id,
            menu_id: row.menu_id,
            title: row.title,
            description: row.description,
            dishes_count: row.dishes_count,
        }
    }
}

#[async_trait]
impl SubmenusRepo for PostgresRepositories {
    async fn get_detail(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
    ) -> Result<Option<SubmenuSummary>, RepoError> {
        let sql = format!("{SUMMARY_SELECT} WHERE s.menu_id = $1 AND s.id = $2 GROUP BY s.id");
        let row = sqlx::query_as::<_, SubmenuSummaryRow>(&sql)
            .bind(menu_id)
            .bind(submenu_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(SubmenuSummary::from))
    }

    async fn get_list(&self, menu_id: Uuid) -> Result<Vec<SubmenuSummary>, RepoError> {
        let sql = format!("{SUMMARY_SELECT} WHERE s.menu_id = $1 GROUP BY s.id ORDER BY s.title");
        let rows = sqlx::query_as::<_, SubmenuSummaryRow>(&sql)
            .bind(menu_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SubmenuSummary::from).collect())
    }

    async fn create(
        &self,
        menu_id: Uuid,
        submenu: NewSubmenu,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let row = sqlx::query_as::<_, SubmenuRow>(
            r#"
            INSERT INTO submenus (id, menu_id, title, description)
            SELECT $1, m.id, $3, $4 FROM menus m WHERE m.id = $2
            RETURNING id, menu_id, title, description
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(menu_id)
        .bind(&submenu.title)
        .bind(&submenu.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(row.map(SubmenuRecord::from))
    }

    async fn update(
        &self,
        menu_id: Uuid,
        submenu_id: Uuid,
        patch: &SubmenuPatch,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let Some(row) = sqlx::query_as::<_, SubmenuRow>(
            r#"
            SELECT id, menu_id, title, description
            FROM submenus
            WHERE menu_id = $1 AND id = $2
            FOR UPDATE
            "#,
        )
        .bind(menu_id)
        .bind(submenu_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let mut record = SubmenuRecord::from(row);
        patch.apply(&mut record);

        sqlx::query("UPDATE submenus SET title = $2, description = $3 WHERE id = $1")
            .bind(record.id)
            .bind(&record.title)
            .bind(&record.description)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(record))
    }

    async fn delete(&self, menu_id: Uuid, submenu_id: Uuid) -> Result<bool, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;
        let result = sqlx::query("DELETE FROM submenus WHERE menu_id = $1 AND id = $2")
            .bind(menu_id)
            .bind(submenu_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
