//! Schema inference and best-effort type coercion.
//!
//! Building a [`Table`] is two passes over the flattened records: the first
//! collects the union of keys (first-seen order) and a per-column type, the
//! second materialises typed cells. Cast columns override the inferred type
//! and never fail; a value that cannot be cast becomes [`Cell::Null`].

use crate::core::Record;
use crate::domain::model::{Cell, Column, ColumnType, Table};
use crate::utils::error::EtlError;
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// `"$12.50"` → 12.5
    Currency,
    /// `"511111019862"` → 511111019862
    Integer,
    /// Epoch milliseconds → timestamp.
    EpochMillis,
}

impl CastKind {
    pub fn column_type(&self) -> ColumnType {
        match self {
            CastKind::Currency => ColumnType::Float,
            CastKind::Integer => ColumnType::Integer,
            CastKind::EpochMillis => ColumnType::Timestamp,
        }
    }

    pub fn apply(&self, value: &Value) -> Option<Cell> {
        match self {
            CastKind::Currency => parse_currency(value).map(Cell::Float),
            CastKind::Integer => parse_i64(value).map(Cell::Integer),
            CastKind::EpochMillis => parse_epoch_millis(value).map(Cell::Timestamp),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnCast {
    pub column: &'static str,
    pub kind: CastKind,
}

impl ColumnCast {
    pub const fn new(column: &'static str, kind: CastKind) -> Self {
        Self { column, kind }
    }
}

pub fn parse_currency(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace('$', "").trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

pub fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn parse_epoch_millis(value: &Value) -> Option<NaiveDateTime> {
    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// 第一階段：推斷欄位與型別
#[derive(Debug, Default)]
struct SchemaBuilder {
    positions: HashMap<String, usize>,
    order: Vec<(String, Option<ColumnType>)>,
}

impl SchemaBuilder {
    fn observe(&mut self, record: &Record) {
        for (key, value) in &record.data {
            let observed = infer_type(value);
            match self.positions.get(key) {
                Some(&idx) => {
                    let slot = &mut self.order[idx].1;
                    *slot = unify(*slot, observed);
                }
                None => {
                    self.positions.insert(key.clone(), self.order.len());
                    self.order.push((key.clone(), observed));
                }
            }
        }
    }

    fn finish(self, casts: &[ColumnCast]) -> Vec<Column> {
        self.order
            .into_iter()
            .map(|(name, inferred)| {
                let kind = match casts.iter().find(|c| c.column == name) {
                    Some(cast) => cast.kind.column_type(),
                    None => inferred.unwrap_or(ColumnType::Text),
                };
                Column { name, kind }
            })
            .collect()
    }
}

fn infer_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(ColumnType::Boolean),
        Value::Number(n) if n.is_i64() => Some(ColumnType::Integer),
        // u64 above i64::MAX and fractional values
        Value::Number(_) => Some(ColumnType::Float),
        Value::String(_) => Some(ColumnType::Text),
        Value::Array(_) | Value::Object(_) => Some(ColumnType::Json),
    }
}

fn unify(current: Option<ColumnType>, observed: Option<ColumnType>) -> Option<ColumnType> {
    use ColumnType::*;
    match (current, observed) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) if a == b => Some(a),
        (Some(Integer), Some(Float)) | (Some(Float), Some(Integer)) => Some(Float),
        (Some(Json), _) | (_, Some(Json)) => Some(Json),
        _ => Some(Text),
    }
}

fn materialize(value: &Value, kind: ColumnType) -> Cell {
    match (kind, value) {
        (_, Value::Null) => Cell::Null,
        (ColumnType::Boolean, Value::Bool(b)) => Cell::Boolean(*b),
        (ColumnType::Integer, Value::Number(n)) => {
            n.as_i64().map(Cell::Integer).unwrap_or(Cell::Null)
        }
        (ColumnType::Float, Value::Number(n)) => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
        (ColumnType::Json, v) => Cell::Json(v.clone()),
        (_, Value::String(s)) => Cell::Text(s.clone()),
        (_, v) => Cell::Text(v.to_string()),
    }
}

/// Output of [`build_table`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedTable {
    pub table: Table,
    pub coercion_failures: usize,
}

/// 第二階段：依推斷結果與轉型清單產生具型別的資料表
///
/// Casts naming a column that never appears in `records` are ignored.
pub fn build_table(records: &[Record], casts: &[ColumnCast]) -> CoercedTable {
    let mut schema = SchemaBuilder::default();
    for record in records {
        schema.observe(record);
    }
    let columns = schema.finish(casts);

    let column_casts: Vec<Option<CastKind>> = columns
        .iter()
        .map(|c| casts.iter().find(|cast| cast.column == c.name).map(|cast| cast.kind))
        .collect();

    let mut coercion_failures = 0;
    let mut rows = Vec::with_capacity(records.len());

    for record in records {
        let mut row = Vec::with_capacity(columns.len());
        for (column, cast) in columns.iter().zip(&column_casts) {
            let value = record.data.get(&column.name).unwrap_or(&Value::Null);
            let cell = match cast {
                Some(_) if value.is_null() => Cell::Null,
                Some(kind) => kind.apply(value).unwrap_or_else(|| {
                    coercion_failures += 1;
                    let err = EtlError::CoercionError {
                        column: column.name.clone(),
                        value: value.to_string(),
                        target: format!("{:?}", column.kind),
                    };
                    tracing::trace!("{}", err);
                    Cell::Null
                }),
                None => materialize(value, column.kind),
            };
            row.push(cell);
        }
        rows.push(row);
    }

    CoercedTable {
        table: Table { columns, rows },
        coercion_failures,
    }
}
