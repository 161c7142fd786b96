//! Row field access shared by filtering and formatting.
//!
//! Parameter keys (`supplier`, `material`, ...) map to one or more column
//! names; the first column present on a row wins.

use qms_core::Row;
use serde_json::Value;

/// Column names tried for each parameter key.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("factory", &["factory"]),
    ("warehouse", &["warehouse"]),
    ("supplier", &["supplier_name", "supplier"]),
    ("material", &["material_name", "material"]),
    ("status", &["status"]),
    ("batch_code", &["batch_code", "batch_no"]),
    ("test_result", &["test_result", "result"]),
    ("project", &["project"]),
];

/// Column names for a parameter key; unknown keys map to themselves.
pub fn columns_for(key: &str) -> Vec<&str> {
    FIELD_ALIASES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, columns)| columns.to_vec())
        .unwrap_or_else(|| vec![key])
}

/// First non-null value for a parameter key.
pub fn field<'a>(row: &'a Row, key: &str) -> Option<&'a Value> {
    columns_for(key)
        .into_iter()
        .filter_map(|column| row.get(column))
        .find(|v| !v.is_null())
}

/// Text form of a scalar value.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric value of a field holding a number or a numeric string.
pub fn field_number(row: &Row, key: &str) -> Option<f64> {
    match field(row, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `supplierName` -> `supplier_name`. Keys already in snake case are unchanged.
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch);
        }
    }
    out
}

/// Rewrite every key of a row to snake case.
pub fn normalize_row(row: Row) -> Row {
    row.into_iter().map(|(k, v)| (camel_to_snake(&k), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("supplierName"), "supplier_name");
        assert_eq!(camel_to_snake("batchCode"), "batch_code");
        assert_eq!(camel_to_snake("inboundTime"), "inbound_time");
        assert_eq!(camel_to_snake("defectRate2"), "defect_rate2");
        assert_eq!(camel_to_snake("factory"), "factory");
        assert_eq!(camel_to_snake("material_name"), "material_name");
        assert_eq!(camel_to_snake("ID"), "id");
    }

    #[test]
    fn test_field_aliases() {
        let row = json!({"supplier": "BOE", "batch_no": "SK1234567", "status": null})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(field(&row, "supplier"), Some(&json!("BOE")));
        assert_eq!(field(&row, "batch_code"), Some(&json!("SK1234567")));
        assert_eq!(field(&row, "status"), None);
        assert_eq!(columns_for("custom"), vec!["custom"]);
    }

    #[test]
    fn test_field_number() {
        let row = json!({"quantity": "1200", "other": 3.5}).as_object().cloned().unwrap();
        assert_eq!(field_number(&row, "quantity"), Some(1200.0));
        assert_eq!(field_number(&row, "other"), Some(3.5));
        assert_eq!(field_number(&row, "missing"), None);
    }
}
