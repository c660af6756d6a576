//! PostgreSQL sink.
//!
//! One connection, statements issued in order. A replace-load is
//! `DROP TABLE IF EXISTS` + `CREATE TABLE` + batched `INSERT`s with no
//! surrounding transaction.

use crate::core::TableSink;
use crate::domain::model::{Cell, ColumnType, Table, TableName};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::mask_password;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

/// PostgreSQL 的參數上限為 65535
const MAX_PARAMS: usize = 65_535;
const MAX_ROWS_PER_INSERT: usize = 1_000;

type SqlParam = Box<dyn ToSql + Sync + Send>;

pub struct PostgresSink {
    client: Client,
}

impl PostgresSink {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| EtlError::ConfigError {
                message: format!(
                    "Failed to connect to PostgreSQL at {}: {}",
                    mask_password(connection_string),
                    e
                ),
            })?;

        // Spawn connection handler
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl TableSink for PostgresSink {
    async fn ensure_schema(&self, schema: &str) -> Result<()> {
        self.client.batch_execute(&create_schema_sql(schema)).await?;
        Ok(())
    }

    async fn replace_table(&self, target: &TableName, table: &Table) -> Result<usize> {
        self.write_table(target, table)
            .await
            .map_err(|e| EtlError::sink_write(target.to_string(), e))
    }
}

impl PostgresSink {
    async fn write_table(&self, target: &TableName, table: &Table) -> Result<usize> {
        self.client.batch_execute(&drop_table_sql(target)).await?;
        self.client
            .batch_execute(&create_table_sql(target, table))
            .await?;

        if table.columns.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", qualified_name(target));
            for _ in &table.rows {
                self.client.execute(sql.as_str(), &[]).await?;
            }
            return Ok(table.len());
        }

        let mut written = 0;
        for chunk in table.rows.chunks(rows_per_insert(table.columns.len())) {
            let sql = insert_sql(target, table, chunk.len());
            let params = chunk_params(table, chunk);
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| &**p as &(dyn ToSql + Sync))
                .collect();
            written += self.client.execute(sql.as_str(), &refs).await? as usize;
        }
        tracing::debug!("Inserted {} rows into {}", written, target);
        Ok(written)
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified_name(target: &TableName) -> String {
    format!("{}.{}", quote_ident(&target.schema), quote_ident(&target.table))
}

pub fn sql_type(kind: ColumnType) -> &'static str {
    match kind {
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Timestamp => "TIMESTAMP(3)",
        ColumnType::Json => "JSONB",
    }
}

pub fn create_schema_sql(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema))
}

pub fn drop_table_sql(target: &TableName) -> String {
    format!("DROP TABLE IF EXISTS {}", qualified_name(target))
}

pub fn create_table_sql(target: &TableName, table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(c.kind)))
        .collect();
    format!("CREATE TABLE {} ({})", qualified_name(target), columns.join(", "))
}

fn rows_per_insert(column_count: usize) -> usize {
    (MAX_PARAMS / column_count.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}

/// `INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)`
pub fn insert_sql(target: &TableName, table: &Table, row_count: usize) -> String {
    let width = table.columns.len();
    let columns: Vec<String> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let values: Vec<String> = (0..row_count)
        .map(|row| {
            let placeholders: Vec<String> = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualified_name(target),
        columns.join(", "),
        values.join(", ")
    )
}

fn chunk_params(table: &Table, rows: &[Vec<Cell>]) -> Vec<SqlParam> {
    rows.iter()
        .flat_map(|row| {
            table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| to_param(column.kind, cell))
        })
        .collect()
}

// Nulls must still carry the column's SQL type.
fn to_param(kind: ColumnType, cell: &Cell) -> SqlParam {
    match (kind, cell) {
        (ColumnType::Integer, Cell::Integer(v)) => Box::new(Some(*v)),
        (ColumnType::Integer, _) => Box::new(None::<i64>),
        (ColumnType::Float, Cell::Float(v)) => Box::new(Some(*v)),
        (ColumnType::Float, Cell::Integer(v)) => Box::new(Some(*v as f64)),
        (ColumnType::Float, _) => Box::new(None::<f64>),
        (ColumnType::Boolean, Cell::Boolean(v)) => Box::new(Some(*v)),
        (ColumnType::Boolean, _) => Box::new(None::<bool>),
        (ColumnType::Timestamp, Cell::Timestamp(v)) => Box::new(Some(*v)),
        (ColumnType::Timestamp, _) => Box::new(None::<NaiveDateTime>),
        (ColumnType::Json, Cell::Null) => Box::new(None::<serde_json::Value>),
        (ColumnType::Json, Cell::Json(v)) => Box::new(Some(v.clone())),
        (ColumnType::Json, other) => {
            Box::new(Some(serde_json::Value::String(other.to_string())))
        }
        (ColumnType::Text, Cell::Null) => Box::new(None::<String>),
        (ColumnType::Text, other) => Box::new(Some(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Column;

    fn sample_table() -> Table {
        Table {
            columns: vec![
                Column {
                    name: "_id".to_string(),
                    kind: ColumnType::Text,
                },
                Column {
                    name: "cpg.ref".to_string(),
                    kind: ColumnType::Text,
                },
                Column {
                    name: "barcode".to_string(),
                    kind: ColumnType::Integer,
                },
            ],
            rows: vec![
                vec![
                    Cell::Text("a".to_string()),
                    Cell::Null,
                    Cell::Integer(511111019862),
                ],
                vec![Cell::Text("b".to_string()), Cell::Text("Cogs".to_string()), Cell::Null],
            ],
        }
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("brands"), "\"brands\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_schema_and_drop_sql() {
        let target = TableName::new("fetch", "brands");
        assert_eq!(create_schema_sql("fetch"), "CREATE SCHEMA IF NOT EXISTS \"fetch\"");
        assert_eq!(drop_table_sql(&target), "DROP TABLE IF EXISTS \"fetch\".\"brands\"");
    }

    #[test]
    fn test_create_table_sql() {
        let target = TableName::new("fetch", "brands");
        assert_eq!(
            create_table_sql(&target, &sample_table()),
            "CREATE TABLE \"fetch\".\"brands\" (\"_id\" TEXT, \"cpg.ref\" TEXT, \"barcode\" BIGINT)"
        );
        assert_eq!(
            create_table_sql(&target, &Table::default()),
            "CREATE TABLE \"fetch\".\"brands\" ()"
        );
    }

    #[test]
    fn test_insert_sql_numbers_placeholders() {
        let target = TableName::new("fetch", "brands");
        assert_eq!(
            insert_sql(&target, &sample_table(), 2),
            "INSERT INTO \"fetch\".\"brands\" (\"_id\", \"cpg.ref\", \"barcode\") \
             VALUES ($1, $2, $3), ($4, $5, $6)"
        );
    }

    #[test]
    fn test_chunk_params_one_per_cell() {
        let table = sample_table();
        assert_eq!(chunk_params(&table, &table.rows).len(), 6);
    }

    #[test]
    fn test_rows_per_insert_respects_param_limit() {
        assert_eq!(rows_per_insert(3), MAX_ROWS_PER_INSERT);
        assert_eq!(rows_per_insert(100), 655);
        assert_eq!(rows_per_insert(0), MAX_ROWS_PER_INSERT);
        assert!(rows_per_insert(100) * 100 <= MAX_PARAMS);
    }
}
