//! Conversion of MySQL rows into JSON rows.

use qms_core::Row;
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::trace;

/// Convert a result row to a column-name keyed JSON object.
///
/// Values that cannot be decoded become `null` rather than failing the row.
pub fn row_to_json(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        out.insert(column.name().to_string(), value);
    }
    out
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    let upper = type_name.to_ascii_uppercase();
    let decoded = match upper.as_str() {
        "BOOLEAN" => row.try_get::<bool, _>(index).ok().map(Value::Bool),
        t if t.ends_with("UNSIGNED") && is_integer(t) => {
            row.try_get::<u64, _>(index).ok().map(Value::from)
        }
        t if is_integer(t) => row.try_get::<i64, _>(index).ok().map(Value::from),
        "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(index)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        "DECIMAL" => row
            .try_get_unchecked::<String, _>(index)
            .ok()
            .map(|s| decimal_to_json(&s)),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .ok()
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .ok()
            .map(|v| Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string())),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .ok()
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(index)
            .ok()
            .map(|v| Value::String(v.to_string())),
        "JSON" => row.try_get::<Value, _>(index).ok(),
        _ => row
            .try_get::<String, _>(index)
            .or_else(|_| row.try_get_unchecked::<String, _>(index))
            .ok()
            .map(Value::String),
    };

    decoded.unwrap_or_else(|| {
        trace!(column = index, type_name, "Undecodable column value");
        Value::Null
    })
}

fn is_integer(type_name: &str) -> bool {
    let base = type_name.split_whitespace().next().unwrap_or_default();
    matches!(
        base,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR"
    )
}

/// Decimals keep their exact text unless they fit an integer or an f64
/// without surprise.
fn decimal_to_json(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}
