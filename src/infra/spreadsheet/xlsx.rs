use std::path::PathBuf;

use async_trait::async_trait;
use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::debug;

use crate::application::snapshot::{Cell, SnapshotError, SnapshotSource, parse_rows};
use crate::domain::tree::MenuTree;

/// Reads the first worksheet of a local workbook (xlsx, xls, ods).
#[derive(Debug, Clone)]
pub struct XlsxFileSource {
    path: PathBuf,
}

impl XlsxFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_rows(path: &PathBuf) -> Result<Vec<Vec<Cell>>, SnapshotError> {
        let read_error = |message: String| SnapshotError::Read {
            source_name: path.display().to_string(),
            message,
        };

        let mut workbook = open_workbook_auto(path).map_err(|err| read_error(err.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| read_error("workbook has no worksheets".to_string()))?
            .map_err(|err| read_error(err.to_string()))?;

        Ok(rows_from_range(&range))
    }
}

#[async_trait]
impl SnapshotSource for XlsxFileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn load(&self) -> Result<Vec<MenuTree>, SnapshotError> {
        let path = self.path.clone();
        let rows = tokio::task::spawn_blocking(move || Self::read_rows(&path))
            .await
            .map_err(|err| SnapshotError::Read {
                source_name: self.path.display().to_string(),
                message: format!("reader task failed: {err}"),
            })??;

        debug!(
            target = "infra::spreadsheet::xlsx",
            path = %self.path.display(),
            rows = rows.len(),
            "workbook read"
        );
        parse_rows(&rows)
    }
}

/// Rows anchored at column A; the used range may start further right.
fn rows_from_range(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((_, first_column)) = range.start() else {
        return Vec::new();
    };
    let offset = first_column as usize;

    range
        .rows()
        .map(|row| {
            std::iter::repeat_n(Cell::Empty, offset)
                .chain(row.iter().map(cell_from_data))
                .collect()
        })
        .collect()
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(value) | Data::DateTimeIso(value) | Data::DurationIso(value) => {
            Cell::Text(value.clone())
        }
        Data::Float(value) => Cell::Number(*value),
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Bool(value) => Cell::Text(value.to_string()),
        Data::DateTime(value) => Cell::Number(value.as_f64()),
        Data::Error(_) => Cell::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_ranges_are_padded_to_column_a() {
        let mut range = Range::new((0, 2), (0, 5));
        range.set_value((0, 2), Data::String("c2a4".into()));
        range.set_value((0, 5), Data::Float(10.5));

        let rows = rows_from_range(&range);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], Cell::Empty);
        assert_eq!(rows[0][1], Cell::Empty);
        assert_eq!(rows[0][2], Cell::Text("c2a4".into()));
        assert_eq!(rows[0][5], Cell::Number(10.5));
    }

    #[test]
    fn integers_become_numbers() {
        assert_eq!(cell_from_data(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(cell_from_data(&Data::Empty), Cell::Empty);
    }

    #[tokio::test]
    async fn missing_workbook_is_a_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = XlsxFileSource::new(dir.path().join("absent.xlsx"));
        let err = source.load().await.expect_err("missing file");
        assert!(matches!(err, SnapshotError::Read { .. }));
    }
}
