use crate::core::coerce::{CastKind, ColumnCast};
use crate::core::flatten::{
    explode_receipt_items, flatten_brand, flatten_receipt, flatten_user,
};
use crate::core::Record;
use crate::domain::model::EntityKind;

const BRAND_CASTS: &[ColumnCast] = &[ColumnCast::new("barcode", CastKind::Integer)];

const USER_CASTS: &[ColumnCast] = &[
    ColumnCast::new("createdDate", CastKind::EpochMillis),
    ColumnCast::new("lastLogin", CastKind::EpochMillis),
];

const RECEIPT_CASTS: &[ColumnCast] = &[
    ColumnCast::new("createDate", CastKind::EpochMillis),
    ColumnCast::new("dateScanned", CastKind::EpochMillis),
    ColumnCast::new("finishedDate", CastKind::EpochMillis),
    ColumnCast::new("modifyDate", CastKind::EpochMillis),
    ColumnCast::new("pointsAwardedDate", CastKind::EpochMillis),
    ColumnCast::new("purchaseDate", CastKind::EpochMillis),
];

const RECEIPT_ITEM_CASTS: &[ColumnCast] = &[
    ColumnCast::new("finalPrice", CastKind::Currency),
    ColumnCast::new("itemPrice", CastKind::Currency),
    ColumnCast::new("discountedItemPrice", CastKind::Currency),
    ColumnCast::new("targetPrice", CastKind::Currency),
    ColumnCast::new("priceAfterCoupon", CastKind::Currency),
    ColumnCast::new("pointsEarned", CastKind::Currency),
];

impl EntityKind {
    /// 各資料表固定的轉型欄位
    pub fn casts(&self) -> &'static [ColumnCast] {
        match self {
            EntityKind::Brands => BRAND_CASTS,
            EntityKind::Users => USER_CASTS,
            EntityKind::Receipts => RECEIPT_CASTS,
            EntityKind::ReceiptItems => RECEIPT_ITEM_CASTS,
        }
    }

    /// Turns raw export records into flat rows for this entity's table.
    pub fn flatten(&self, records: Vec<Record>) -> Vec<Record> {
        match self {
            EntityKind::Brands => records.into_iter().map(flatten_brand).collect(),
            EntityKind::Users => records.into_iter().map(flatten_user).collect(),
            EntityKind::Receipts => records.into_iter().map(flatten_receipt).collect(),
            EntityKind::ReceiptItems => records.iter().flat_map(explode_receipt_items).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flatten::RECEIPT_DATE_FIELDS;
    use serde_json::json;

    fn receipt(id: &str, items: serde_json::Value) -> Record {
        let value = json!({"_id": {"$oid": id}, "rewardsReceiptItemList": items});
        Record::new(value.as_object().unwrap().clone())
    }

    #[test]
    fn test_receipt_items_flatten_across_receipts() {
        let records = vec![
            receipt("r1", json!([{"barcode": "1"}, {"barcode": "2"}])),
            receipt("r2", serde_json::Value::Null),
            receipt("r3", json!([{"barcode": "3"}])),
        ];

        let items = EntityKind::ReceiptItems.flatten(records.clone());
        let receipts = EntityKind::Receipts.flatten(records);

        assert_eq!(items.len(), 3);
        assert_eq!(items[2].get("receipt_id").unwrap(), "r3");
        assert_eq!(receipts.len(), 3);
    }

    #[test]
    fn test_cast_lists_name_known_columns() {
        assert_eq!(EntityKind::Brands.casts().len(), 1);
        assert!(EntityKind::ReceiptItems
            .casts()
            .iter()
            .all(|c| c.kind == CastKind::Currency));
        assert!(EntityKind::Users
            .casts()
            .iter()
            .all(|c| c.kind == CastKind::EpochMillis));
    }

    #[test]
    fn test_receipts_cast_only_date_fields() {
        let casts: Vec<&str> = EntityKind::Receipts.casts().iter().map(|c| c.column).collect();
        assert_eq!(casts, RECEIPT_DATE_FIELDS.to_vec());
        assert!(EntityKind::Receipts
            .casts()
            .iter()
            .all(|c| c.kind == CastKind::EpochMillis));
    }
}
