use crate::core::{Record, Storage};
use crate::utils::error::EtlError;
use serde_json::Value;

/// 讀取 JSON 陣列檔案；檔案不存在或格式錯誤時回傳空集合並記錄錯誤
pub async fn load_records<S: Storage>(storage: &S, path: &str) -> Vec<Record> {
    let bytes = match storage.read_file(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = EtlError::SourceReadError {
                path: path.to_string(),
                message: e.to_string(),
            };
            tracing::error!("💀 Error loading JSON data: {}", err);
            return Vec::new();
        }
    };

    match parse_records(&bytes) {
        Ok(records) => {
            tracing::debug!("📂 Read {} records from {}", records.len(), path);
            records
        }
        Err(message) => {
            let err = EtlError::SourceReadError {
                path: path.to_string(),
                message,
            };
            tracing::error!("💀 Error loading JSON data: {}", err);
            Vec::new()
        }
    }
}

/// Parses a JSON array of objects. Any other document, or any syntax
/// error, discards the whole file.
pub fn parse_records(bytes: &[u8]) -> std::result::Result<Vec<Record>, String> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(items)) => Ok(collect_objects(items)),
        Ok(other) => Err(format!("expected a JSON array, found {}", value_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn collect_objects(items: Vec<Value>) -> Vec<Record> {
    let total = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(Record::new(map)),
            _ => None,
        })
        .collect();

    if records.len() < total {
        tracing::warn!(
            "⚠️ Skipped {} array elements that are not JSON objects",
            total - records.len()
        );
    }
    records
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::LocalStorage;
    use tempfile::TempDir;

    fn storage_with(name: &str, contents: &str) -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(name), contents).unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());
        (dir, storage)
    }

    #[tokio::test]
    async fn test_load_json_array() {
        let (_dir, storage) = storage_with(
            "users.json",
            r#"[{"_id": {"$oid": "a"}, "state": "WI"}, {"_id": {"$oid": "b"}}]"#,
        );

        let records = load_records(&storage, "users.json").await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("state").unwrap(), "WI");
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_str().unwrap().to_string());

        let records = load_records(&storage, "nope.json").await;

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_discards_whole_file() {
        let (_dir, storage) = storage_with("brands.json", r#"[{"name": "ok"}, {"name": ]"#);

        let records = load_records(&storage, "brands.json").await;

        assert!(records.is_empty());
    }

    #[test]
    fn test_newline_delimited_objects_are_rejected() {
        let err = parse_records(b"{\"a\": 1}\n{\"a\": 2}\n").unwrap_err();
        assert!(!err.is_empty());
        assert!(parse_records(b"{\"a\": 1}\n").is_err());
    }

    #[tokio::test]
    async fn test_concatenated_objects_load_nothing() {
        let (_dir, storage) = storage_with("receipts.json", "{\"_id\": 1}\n{\"_id\": 2}\n");

        let records = load_records(&storage, "receipts.json").await;

        assert!(records.is_empty());
    }

    #[test]
    fn test_non_array_document_is_rejected() {
        let err = parse_records(br#"{"a": 1}"#).unwrap_err();
        assert!(err.contains("expected a JSON array"));
    }

    #[test]
    fn test_non_object_elements_are_skipped() {
        let records = parse_records(br#"[{"a": 1}, 2, "x", null, {"a": 2}]"#).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_key_order_is_preserved() {
        let records = parse_records(br#"[{"z": 1, "a": 2, "m": 3}]"#).unwrap();
        let keys: Vec<&str> = records[0].data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
