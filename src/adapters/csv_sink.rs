use crate::core::{Storage, TableSink};
use crate::domain::model::{Table, TableName};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// 將資料表輸出成 `<schema>.<table>.csv`，每次執行覆蓋舊檔
pub struct CsvSink<S: Storage> {
    storage: S,
}

impl<S: Storage> CsvSink<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn file_name(target: &TableName) -> String {
        format!("{}.{}.csv", target.schema, target.table)
    }
}

pub fn render_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if !table.columns.is_empty() {
        writer.write_record(table.columns.iter().map(|c| c.name.as_str()))?;
    }
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

#[async_trait]
impl<S: Storage> TableSink for CsvSink<S> {
    /// A schema is only a file name prefix here.
    async fn ensure_schema(&self, _schema: &str) -> Result<()> {
        Ok(())
    }

    async fn replace_table(&self, target: &TableName, table: &Table) -> Result<usize> {
        let data = render_csv(table).map_err(|e| EtlError::sink_write(target.to_string(), e))?;
        self.storage
            .write_file(&Self::file_name(target), &data)
            .await
            .map_err(|e| EtlError::sink_write(target.to_string(), e))?;

        tracing::debug!("📁 Wrote {} rows to {}", table.len(), Self::file_name(target));
        Ok(table.len())
    }
}
