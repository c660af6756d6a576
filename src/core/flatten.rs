//! Reference-object unwrapping and per-entity flattening.
//!
//! The export wraps identifiers as `{"$oid": "..."}` and dates as
//! `{"$date": <epoch-ms>}`. Flattening replaces those wrappers with their
//! payload and, for receipts, splits the nested item list into its own
//! table keyed by `receipt_id`.

use crate::core::Record;
use serde_json::{Map, Value};

pub const ID_FIELD: &str = "_id";
pub const ITEM_LIST_FIELD: &str = "rewardsReceiptItemList";
pub const RECEIPT_ID_FIELD: &str = "receipt_id";

pub const USER_DATE_FIELDS: [&str; 2] = ["createdDate", "lastLogin"];
pub const RECEIPT_DATE_FIELDS: [&str; 6] = [
    "createDate",
    "dateScanned",
    "finishedDate",
    "modifyDate",
    "pointsAwardedDate",
    "purchaseDate",
];

/// 取出 `{"<key>": payload}` 的 payload，缺少或為 null 時回傳 Null
///
/// A bare scalar is accepted as its own payload.
pub fn unwrap_reference(value: Option<&Value>, key: &str) -> Value {
    match value {
        Some(Value::Object(map)) => map.get(key).cloned().unwrap_or(Value::Null),
        Some(Value::Null) | None => Value::Null,
        Some(Value::Array(_)) => Value::Null,
        Some(scalar) => scalar.clone(),
    }
}

pub fn unwrap_oid(value: Option<&Value>) -> Value {
    unwrap_reference(value, "$oid")
}

/// `{"$date": 1609687531000}` or `{"$date": {"$numberLong": "1609687531000"}}`.
pub fn unwrap_date(value: Option<&Value>) -> Value {
    match unwrap_reference(value, "$date") {
        Value::Object(inner) => inner.get("$numberLong").cloned().unwrap_or(Value::Null),
        other => other,
    }
}

// Existing keys keep their position; new keys are appended.
fn set_field(data: &mut Map<String, Value>, key: &str, value: Value) {
    data.insert(key.to_string(), value);
}

fn flatten_identifier(record: &mut Record) {
    let id = unwrap_oid(record.data.get(ID_FIELD));
    set_field(&mut record.data, ID_FIELD, id);
}

fn flatten_dates(record: &mut Record, fields: &[&str]) {
    for field in fields {
        let date = unwrap_date(record.data.get(*field));
        set_field(&mut record.data, field, date);
    }
}

/// `cpg: {"$ref": "Cogs", "$id": {"$oid": "..."}}` → `cpg.ref`, `cpg.id`
pub fn flatten_brand(mut record: Record) -> Record {
    flatten_identifier(&mut record);

    let cpg = record.data.get("cpg");
    let cpg_ref = unwrap_reference(cpg, "$ref");
    let cpg_id = match cpg {
        Some(Value::Object(map)) => unwrap_oid(map.get("$id")),
        _ => Value::Null,
    };
    set_field(&mut record.data, "cpg.ref", cpg_ref);
    set_field(&mut record.data, "cpg.id", cpg_id);
    record.data.shift_remove("cpg");

    record
}

pub fn flatten_user(mut record: Record) -> Record {
    flatten_identifier(&mut record);
    flatten_dates(&mut record, &USER_DATE_FIELDS);
    record
}

/// The nested item list is dropped; see [`explode_receipt_items`].
pub fn flatten_receipt(mut record: Record) -> Record {
    flatten_identifier(&mut record);
    flatten_dates(&mut record, &RECEIPT_DATE_FIELDS);
    record.data.shift_remove(ITEM_LIST_FIELD);
    record
}

/// 將收據內的品項拆成獨立記錄，並加上 `receipt_id`
///
/// Receipts without an identifier, or whose item list is absent or null,
/// contribute nothing.
pub fn explode_receipt_items(receipt: &Record) -> Vec<Record> {
    let items = match receipt.data.get(ITEM_LIST_FIELD) {
        Some(Value::Array(items)) => items,
        _ => return Vec::new(),
    };

    let receipt_id = match unwrap_oid(receipt.data.get(ID_FIELD)) {
        Value::Null => return Vec::new(),
        Value::String(s) if s.is_empty() => return Vec::new(),
        id => id,
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(map) => {
                let mut data = map.clone();
                set_field(&mut data, RECEIPT_ID_FIELD, receipt_id.clone());
                Some(Record::new(data))
            }
            _ => None,
        })
        .collect()
}
