use crate::domain::model::{EntityKind, LoadReport, Record, Table, TableName, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn database_url(&self) -> Option<&str>;
    fn schema(&self) -> &str;
    fn data_dir(&self) -> &str;
    /// Source file for an entity, relative to `data_dir`.
    fn source_file(&self, entity: EntityKind) -> String {
        entity.default_source().to_string()
    }
    fn monitoring_enabled(&self) -> bool {
        false
    }
}

/// Relational destination. Every load replaces the previous table.
#[async_trait]
pub trait TableSink: Send + Sync {
    async fn ensure_schema(&self, schema: &str) -> Result<()>;
    async fn replace_table(&self, target: &TableName, table: &Table) -> Result<usize>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;
    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadReport>;
}
