use crate::core::coerce::build_table;
use crate::core::loader::load_records;
use crate::core::{Pipeline, Record, Storage, TableSink, TransformResult};
use crate::domain::model::{EntityKind, LoadReport, TableName};
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;

/// 單一實體的 Pipeline：讀檔 → 攤平 → 轉型 → 取代目標資料表
pub struct EntityPipeline<S: Storage, K: TableSink> {
    kind: EntityKind,
    source_path: String,
    target: TableName,
    storage: Arc<S>,
    sink: Arc<K>,
}

impl<S: Storage, K: TableSink> EntityPipeline<S, K> {
    pub fn new(
        kind: EntityKind,
        source_path: impl Into<String>,
        schema: &str,
        storage: Arc<S>,
        sink: Arc<K>,
    ) -> Self {
        Self {
            kind,
            source_path: source_path.into(),
            target: TableName::new(schema, kind.table_name()),
            storage,
            sink,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn target(&self) -> &TableName {
        &self.target
    }
}

#[async_trait::async_trait]
impl<S: Storage, K: TableSink> Pipeline for EntityPipeline<S, K> {
    async fn extract(&self) -> Result<Vec<Record>> {
        tracing::debug!("Reading {} from {}", self.kind, self.source_path);
        Ok(load_records(self.storage.as_ref(), &self.source_path).await)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let source_records = data.len();
        let flattened = self.kind.flatten(data);
        tracing::debug!(
            "{}: flattened {} source records into {} rows",
            self.kind,
            source_records,
            flattened.len()
        );

        let coerced = build_table(&flattened, self.kind.casts());

        Ok(TransformResult {
            table: coerced.table,
            source_records,
            coercion_failures: coerced.coercion_failures,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<LoadReport> {
        let rows_written = self
            .sink
            .replace_table(&self.target, &result.table)
            .await
            .map_err(|e| match e {
                err @ EtlError::SinkWriteError { .. } => err,
                other => EtlError::sink_write(self.target.to_string(), other),
            })?;

        Ok(LoadReport {
            target: self.target.clone(),
            rows_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Cell, ColumnType, Table};
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        async fn with_file(path: &str, contents: &str) -> Self {
            let storage = Self::default();
            storage
                .files
                .lock()
                .await
                .insert(path.to_string(), contents.as_bytes().to_vec());
            storage
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockSink {
        tables: Mutex<HashMap<String, Table>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl TableSink for MockSink {
        async fn ensure_schema(&self, _schema: &str) -> Result<()> {
            Ok(())
        }

        async fn replace_table(&self, target: &TableName, table: &Table) -> Result<usize> {
            if self.fail {
                return Err(EtlError::ConfigError {
                    message: "sink offline".to_string(),
                });
            }
            self.tables
                .lock()
                .await
                .insert(target.to_string(), table.clone());
            Ok(table.len())
        }
    }

    const RECEIPTS: &str = r#"[
        {
            "_id": {"$oid": "5ff1e1eb0a720f0523000575"},
            "createDate": {"$date": 1609687531000},
            "pointsEarned": "500.0",
            "rewardsReceiptItemList": [
                {"barcode": "4011", "finalPrice": "26.00", "itemPrice": "$26.00"},
                {"barcode": "028400642255", "finalPrice": "N/A", "pointsEarned": "$5"}
            ]
        }
    ]"#;

    #[tokio::test]
    async fn test_receipt_items_pipeline_end_to_end() {
        let storage = Arc::new(MockStorage::with_file("receipts.json", RECEIPTS).await);
        let sink = Arc::new(MockSink::default());
        let pipeline = EntityPipeline::new(
            EntityKind::ReceiptItems,
            "receipts.json",
            "fetch",
            storage,
            sink.clone(),
        );

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();
        assert_eq!(result.coercion_failures, 1);

        let report = pipeline.load(result).await.unwrap();
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.target.to_string(), "fetch.rewards_receipt_items");

        let tables = sink.tables.lock().await;
        let items = tables.get("fetch.rewards_receipt_items").unwrap();
        assert_eq!(items.column("itemPrice").unwrap().kind, ColumnType::Float);
        assert_eq!(items.cell(0, "itemPrice"), Some(&Cell::Float(26.0)));
        assert_eq!(items.cell(1, "finalPrice"), Some(&Cell::Null));
        assert_eq!(items.cell(1, "pointsEarned"), Some(&Cell::Float(5.0)));
        assert_eq!(
            items.cell(1, "receipt_id"),
            Some(&Cell::Text("5ff1e1eb0a720f0523000575".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_source_produces_empty_table() {
        let storage = Arc::new(MockStorage::default());
        let sink = Arc::new(MockSink::default());
        let pipeline = EntityPipeline::new(EntityKind::Users, "users.json", "fetch", storage, sink);

        let records = pipeline.extract().await.unwrap();
        assert!(records.is_empty());

        let result = pipeline.transform(records).await.unwrap();
        assert!(result.table.is_empty());

        let report = pipeline.load(result).await.unwrap();
        assert_eq!(report.rows_written, 0);
    }

    #[tokio::test]
    async fn test_sink_failure_becomes_sink_write_error() {
        let storage = Arc::new(MockStorage::with_file("receipts.json", RECEIPTS).await);
        let sink = Arc::new(MockSink {
            fail: true,
            ..Default::default()
        });
        let pipeline =
            EntityPipeline::new(EntityKind::Receipts, "receipts.json", "fetch", storage, sink);

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();
        let err = pipeline.load(result).await.unwrap_err();

        match err {
            EtlError::SinkWriteError { table, message } => {
                assert_eq!(table, "fetch.receipts");
                assert!(message.contains("sink offline"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
