use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::snapshot::{Cell, SnapshotError, SnapshotSource, parse_rows};
use crate::domain::tree::MenuTree;
use crate::infra::error::InfraError;

/// Reads a range through the Sheets v4 `values` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleSheetSource {
    client: Client,
    url: Url,
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetSource {
    pub fn new(
        endpoint: &str,
        spreadsheet_id: &str,
        range: &str,
        api_key: String,
    ) -> Result<Self, InfraError> {
        let mut url = Url::parse(endpoint)
            .map_err(|err| InfraError::configuration(format!("invalid sheets endpoint: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| InfraError::configuration("sheets endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("key", &api_key);

        let client = Client::builder()
            .user_agent(concat!("menusync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| InfraError::configuration(format!("http client: {err}")))?;

        Ok(Self {
            client,
            url,
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    async fn fetch(&self) -> Result<ValueRange, SnapshotError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| SnapshotError::Fetch(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Fetch(format!(
                "spreadsheet `{}` answered {status}",
                self.spreadsheet_id
            )));
        }

        response
            .json::<ValueRange>()
            .await
            .map_err(|err| SnapshotError::Fetch(err.without_url().to_string()))
    }
}

#[async_trait]
impl SnapshotSource for GoogleSheetSource {
    fn describe(&self) -> String {
        format!("google:{}", self.spreadsheet_id)
    }

    async fn load(&self) -> Result<Vec<MenuTree>, SnapshotError> {
        let range = self.fetch().await?;
        debug!(
            target = "infra::spreadsheet::google",
            spreadsheet = %self.spreadsheet_id,
            rows = range.values.len(),
            "sheet values fetched"
        );

        let rows: Vec<Vec<Cell>> = range
            .values
            .iter()
            .map(|row| row.iter().map(cell_from_json).collect())
            .collect();
        parse_rows(&rows)
    }
}

fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(text) if text.is_empty() => Cell::Empty,
        Value::String(text) => Cell::Text(text.clone()),
        Value::Number(number) => number.as_f64().map_or(Cell::Empty, Cell::Number),
        Value::Bool(flag) => Cell::Text(flag.to_string()),
        Value::Array(_) | Value::Object(_) => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, extract::RawQuery, routing::get};
    use serde_json::json;

    use super::*;

    const MENU: &str = "a2eb416c-2245-4526-bb4b-6343d5c5016f";
    const SUBMENU: &str = "c2a4b2a9-8b5a-4f1a-9a43-0d6a0c7e44a1";
    const DISH: &str = "0a6b2d4e-1c1d-4c61-9f3e-2a8a5b7d9c01";

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}")
    }

    #[test]
    fn request_url_targets_the_values_endpoint() {
        let source =
            GoogleSheetSource::new("https://sheets.example.com/", "abc", "Sheet1!A:G", "k".into())
                .expect("source");
        let url = source.url.as_str();
        assert!(url.starts_with("https://sheets.example.com/v4/spreadsheets/abc/values/Sheet1"));
        assert!(url.contains("valueRenderOption=UNFORMATTED_VALUE"));
        assert!(url.contains("key=k"));
    }

    #[tokio::test]
    async fn values_are_parsed_into_a_tree() {
        let router = Router::new().route(
            "/v4/spreadsheets/{id}/values/{range}",
            get(|RawQuery(query): RawQuery| async move {
                assert!(query.unwrap_or_default().contains("key=secret"));
                Json(json!({
                    "range": "Sheet1!A1:G3",
                    "values": [
                        [MENU, "Lunch", "midday"],
                        ["", SUBMENU, "Soups"],
                        ["", "", DISH, "Borscht", "", 10.5, 20]
                    ]
                }))
            }),
        );
        let endpoint = serve(router).await;
        let source = GoogleSheetSource::new(&endpoint, "sheet", "Sheet1!A:G", "secret".into())
            .expect("source");

        let tree = source.load().await.expect("load");
        let dish = &tree[0].submenus[0].dishes[0];
        assert_eq!(dish.price.to_string(), "10.50");
        assert_eq!(dish.discount.map(|d| d.to_string()), Some("20".to_string()));
    }

    #[tokio::test]
    async fn error_status_is_a_fetch_error() {
        let endpoint = serve(Router::new()).await;
        let source =
            GoogleSheetSource::new(&endpoint, "sheet", "A:G", "k".into()).expect("source");
        assert!(matches!(
            source.load().await,
            Err(SnapshotError::Fetch(_))
        ));
    }
}
