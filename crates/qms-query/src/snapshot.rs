//! In-process dataset snapshot.
//!
//! The snapshot is swapped wholesale on every sync: readers clone the
//! current `Arc` and never see a half-applied update.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use qms_core::Row;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::error::QueryError;
use crate::fields::normalize_row;

/// A named dataset collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Inventory,
    LabTests,
    OnlineTracking,
}

static FROM_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bFROM\s+`?([A-Za-z_][A-Za-z0-9_]*)`?").expect("from-table regex")
});

impl Collection {
    pub const ALL: [Collection; 3] = [Self::Inventory, Self::LabTests, Self::OnlineTracking];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::LabTests => "lab_tests",
            Self::OnlineTracking => "online_tracking",
        }
    }

    /// Collection queried by a SQL statement: the first `FROM` table when it
    /// is a known collection, otherwise the first collection whose name key
    /// appears anywhere in the text.
    pub fn from_sql(sql: &str) -> Option<Self> {
        if let Some(found) = FROM_TABLE
            .captures_iter(sql)
            .find_map(|caps| caps[1].parse::<Collection>().ok())
        {
            return Some(found);
        }
        let lower = sql.to_lowercase();
        if lower.contains("inventory") {
            Some(Self::Inventory)
        } else if lower.contains("lab") {
            Some(Self::LabTests)
        } else if lower.contains("online") {
            Some(Self::OnlineTracking)
        } else {
            None
        }
    }
}

impl FromStr for Collection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inventory" => Ok(Self::Inventory),
            "lab_tests" | "labtests" | "lab_test" => Ok(Self::LabTests),
            "online_tracking" | "onlinetracking" | "online" => Ok(Self::OnlineTracking),
            _ => Err(QueryError::unknown_collection(s)),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synced data, keyed by collection, with snake_case field names.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetSnapshot {
    pub inventory: Vec<Row>,
    pub lab_tests: Vec<Row>,
    pub online_tracking: Vec<Row>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl DatasetSnapshot {
    pub fn collection(&self, collection: Collection) -> &[Row] {
        match collection {
            Collection::Inventory => &self.inventory,
            Collection::LabTests => &self.lab_tests,
            Collection::OnlineTracking => &self.online_tracking,
        }
    }

    pub fn is_empty(&self) -> bool {
        Collection::ALL.iter().all(|c| self.collection(*c).is_empty())
    }

    pub fn counts(&self) -> SnapshotCounts {
        SnapshotCounts {
            inventory: self.inventory.len(),
            lab_tests: self.lab_tests.len(),
            online_tracking: self.online_tracking.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SnapshotCounts {
    pub inventory: usize,
    pub lab_tests: usize,
    pub online_tracking: usize,
}

/// Data pushed by a sync. Absent collections keep their current rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncPayload {
    #[serde(default, alias = "inventoryData")]
    pub inventory: Option<Vec<Value>>,
    #[serde(default, alias = "labTests", alias = "inspectionData")]
    pub lab_tests: Option<Vec<Value>>,
    #[serde(default, alias = "onlineTracking", alias = "productionData")]
    pub online_tracking: Option<Vec<Value>>,
}

fn normalize_rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(row) => Some(normalize_row(row)),
            _ => None,
        })
        .collect()
}

/// Shared, atomically replaced snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<DatasetSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: DatasetSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn current(&self) -> Arc<DatasetSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn replace(&self, snapshot: DatasetSnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Apply a sync payload and return the new counts.
    ///
    /// Non-object entries are dropped and field names are converted from
    /// camelCase to snake_case. Rows are normalized before any lock is
    /// taken; readers are only blocked for the final swap.
    pub fn sync(&self, payload: SyncPayload) -> SnapshotCounts {
        let inventory = payload.inventory.map(normalize_rows);
        let lab_tests = payload.lab_tests.map(normalize_rows);
        let online_tracking = payload.online_tracking.map(normalize_rows);

        // upgradable: concurrent syncs are serialized, readers are not
        let guard = self.current.upgradable_read();
        let next = DatasetSnapshot {
            inventory: inventory.unwrap_or_else(|| guard.inventory.clone()),
            lab_tests: lab_tests.unwrap_or_else(|| guard.lab_tests.clone()),
            online_tracking: online_tracking.unwrap_or_else(|| guard.online_tracking.clone()),
            synced_at: Some(Utc::now()),
        };
        let counts = next.counts();
        let next = Arc::new(next);
        *RwLockUpgradableReadGuard::upgrade(guard) = next;
        info!(
            inventory = counts.inventory,
            lab_tests = counts.lab_tests,
            online_tracking = counts.online_tracking,
            "Snapshot replaced"
        );
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_from_sql() {
        assert_eq!(
            Collection::from_sql("SELECT * FROM inventory WHERE 1 = 1"),
            Some(Collection::Inventory)
        );
        assert_eq!(
            Collection::from_sql("select * from `lab_tests` where supplier_name = 'BOE'"),
            Some(Collection::LabTests)
        );
        assert_eq!(
            Collection::from_sql("SELECT * FROM v_online_tracking_daily"),
            Some(Collection::OnlineTracking)
        );
        assert_eq!(Collection::from_sql("SELECT 1"), None);
    }

    #[test]
    fn test_collection_names() {
        assert_eq!("labTests".parse::<Collection>().unwrap(), Collection::LabTests);
        assert!("suppliers".parse::<Collection>().is_err());
        assert_eq!(Collection::OnlineTracking.to_string(), "online_tracking");
    }

    #[test]
    fn test_sync_normalizes_and_keeps_absent_collections() {
        let store = SnapshotStore::new();
        assert!(store.current().is_empty());

        let payload: SyncPayload = serde_json::from_value(json!({
            "inventory": [{"materialName": "电池盖", "supplierName": "BOE"}, 42],
            "labTests": [{"testResult": "NG"}]
        }))
        .unwrap();
        let counts = store.sync(payload);
        assert_eq!(counts.inventory, 1);
        assert_eq!(counts.lab_tests, 1);

        let snapshot = store.current();
        assert_eq!(snapshot.inventory[0]["material_name"], "电池盖");
        assert_eq!(snapshot.lab_tests[0]["test_result"], "NG");
        assert!(snapshot.synced_at.is_some());

        let counts = store.sync(SyncPayload {
            online_tracking: Some(vec![json!({"batchCode": "SK1234567"})]),
            ..Default::default()
        });
        assert_eq!(counts.inventory, 1);
        assert_eq!(counts.online_tracking, 1);
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = SnapshotStore::new();
        let before = store.current();
        store.sync(SyncPayload {
            inventory: Some(vec![json!({"factory": "深圳工厂"})]),
            ..Default::default()
        });
        assert!(before.inventory.is_empty());
        assert_eq!(store.current().inventory.len(), 1);
    }

    #[test]
    fn test_concurrent_syncs_and_reads() {
        let store = SnapshotStore::new();
        let rows = |n: usize| -> Vec<Value> {
            (0..n)
                .map(|i| json!({"batchCode": format!("SK{:07}", i)}))
                .collect()
        };

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..50 {
                    store.sync(SyncPayload {
                        inventory: Some(rows(20)),
                        ..Default::default()
                    });
                }
            });
            scope.spawn(|| {
                for _ in 0..50 {
                    store.sync(SyncPayload {
                        lab_tests: Some(rows(10)),
                        ..Default::default()
                    });
                }
            });
            scope.spawn(|| {
                for _ in 0..200 {
                    let snapshot = store.current();
                    assert!(snapshot.inventory.is_empty() || snapshot.inventory.len() == 20);
                    assert!(snapshot.lab_tests.is_empty() || snapshot.lab_tests.len() == 10);
                }
            });
        });

        // neither writer's collection is lost to the other
        let counts = store.current().counts();
        assert_eq!(counts.inventory, 20);
        assert_eq!(counts.lab_tests, 10);
        assert_eq!(store.current().inventory[0]["batch_code"], "SK0000000");
    }
}
