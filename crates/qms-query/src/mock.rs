//! Synthetic data tier.
//!
//! Rows are generated from the row index alone, so the same request always
//! yields the same answer.

use async_trait::async_trait;
use qms_core::{DataSource, Row};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{QueryError, Result};
use crate::fields::columns_for;
use crate::filter::RowFilter;
use crate::snapshot::Collection;
use crate::tier::{QueryAttempt, QueryRequest};

const ROWS_PER_COLLECTION: usize = 24;
const STAMPED_ROWS: usize = 3;

const FACTORIES: &[&str] = &["深圳工厂", "重庆工厂", "南昌工厂", "宜宾工厂"];
const WAREHOUSES: &[&str] = &["中央库存", "深圳库存", "重庆库存"];
const SUPPLIERS: &[&str] = &["BOE", "天马", "华星", "聚龙", "欣冠", "瑞声"];
const MATERIALS: &[(&str, &str)] = &[
    ("CS-S-B001", "电池盖"),
    ("CS-S-Z002", "中框"),
    ("CS-D-L003", "LCD显示屏"),
    ("CS-D-O004", "OLED显示屏"),
    ("CS-C-M005", "摄像头模组"),
    ("CS-E-B006", "电池"),
    ("CS-A-S007", "扬声器"),
];
const STATUSES: &[&str] = &["正常", "风险", "正常", "冻结", "正常"];
const PROJECTS: &[&str] = &["X6827", "S665", "KI4K", "X6831"];
const BATCH_PREFIXES: &[&str] = &["SK", "BX", "JK", "TM"];

fn pick<T: Copy>(items: &[T], i: usize) -> T {
    items[i % items.len()]
}

fn batch_code(i: usize) -> String {
    format!("{}{:07}", pick(BATCH_PREFIXES, i), 2_400_001 + i * 37)
}

fn date(i: usize) -> String {
    format!("2024-{:02}-{:02}", 1 + i % 12, 1 + (i * 7) % 28)
}

fn inventory_row(i: usize) -> Value {
    let (code, name) = pick(MATERIALS, i);
    json!({
        "id": i + 1,
        "material_code": code,
        "material_name": name,
        "batch_code": batch_code(i),
        "supplier_name": pick(SUPPLIERS, i),
        "factory": pick(FACTORIES, i),
        "warehouse": pick(WAREHOUSES, i),
        "quantity": 100 + (i * 137) % 900,
        "status": pick(STATUSES, i),
        "inbound_time": format!("{} 09:00:00", date(i)),
    })
}

fn lab_test_row(i: usize) -> Value {
    let (code, name) = pick(MATERIALS, i);
    let failed = i % 5 == 2;
    json!({
        "id": i + 1,
        "test_id": format!("LT{:05}", i + 1),
        "batch_code": batch_code(i),
        "material_code": code,
        "material_name": name,
        "supplier_name": pick(SUPPLIERS, i),
        "test_date": date(i),
        "test_result": if failed { "NG" } else { "OK" },
        "defect_desc": if failed { "外观划伤" } else { "" },
    })
}

fn online_row(i: usize) -> Value {
    let (code, name) = pick(MATERIALS, i);
    json!({
        "id": i + 1,
        "batch_code": batch_code(i),
        "material_code": code,
        "material_name": name,
        "supplier_name": pick(SUPPLIERS, i),
        "factory": pick(FACTORIES, i),
        "project": pick(PROJECTS, i),
        "online_date": date(i),
        "defect_rate": ((i * 13) % 50) as f64 / 10.0,
        "exception_count": i % 3,
    })
}

/// Deterministic rows for a collection.
pub fn generate(collection: Collection) -> Vec<Row> {
    let make: fn(usize) -> Value = match collection {
        Collection::Inventory => inventory_row,
        Collection::LabTests => lab_test_row,
        Collection::OnlineTracking => online_row,
    };
    (0..ROWS_PER_COLLECTION)
        .filter_map(|i| match make(i) {
            Value::Object(row) => Some(row),
            _ => None,
        })
        .collect()
}

/// Copy the filter values onto a few base rows so the answer stays on topic
/// when no generated row matches.
fn stamp(rows: &[Row], filter: &RowFilter) -> Vec<Row> {
    rows.iter()
        .take(STAMPED_ROWS)
        .map(|row| {
            let mut row = row.clone();
            for (key, value) in filter.conditions() {
                if let Some(column) = columns_for(key).into_iter().find(|c| row.contains_key(*c)) {
                    row.insert(column.to_string(), Value::String(value.to_string()));
                }
            }
            row
        })
        .collect()
}

/// Last tier: synthetic rows.
#[derive(Debug, Clone, Default)]
pub struct MockTier;

impl MockTier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryAttempt for MockTier {
    fn source(&self) -> DataSource {
        DataSource::Mock
    }

    async fn attempt(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        let collection = request.collection.ok_or_else(|| {
            QueryError::unknown_collection(request.sql.clone().unwrap_or_default())
        })?;

        let base = generate(collection);
        let filter = RowFilter::from_params(&request.params);
        let mut rows = filter.apply(&base);
        if rows.is_empty() && !filter.is_empty() {
            rows = stamp(&base, &filter);
        }
        debug!(collection = %collection, rows = rows.len(), "Answered with mock data");
        Ok(rows)
    }
}
