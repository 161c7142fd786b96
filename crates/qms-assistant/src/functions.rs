//! Named functions that `FUNCTION_CALL` rules can invoke.
//!
//! Each function reads collections through the executor, so it inherits the
//! same snapshot and mock fallback as plain queries, and derives aggregated
//! rows from them.

use async_trait::async_trait;
use qms_core::{DataSource, ExtractedParameters, QueryContext, Row};
use qms_query::fields::{field, field_number, value_text};
use qms_query::{Collection, QueryExecutor, QueryResult};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AssistantError, Result};

/// Inputs handed to a function.
#[derive(Clone, Copy)]
pub struct FunctionContext<'a> {
    pub executor: &'a QueryExecutor,
    pub params: &'a ExtractedParameters,
    pub query: &'a QueryContext,
}

#[async_trait]
pub trait AssistantFunction: Send + Sync {
    fn name(&self) -> &'static str;

    async fn call(&self, ctx: FunctionContext<'_>) -> Result<QueryResult>;
}

/// Registered functions by name.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn AssistantFunction>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// `inventory_summary`, `supplier_quality` and `batch_trace`.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_function(Arc::new(InventorySummary))
            .with_function(Arc::new(SupplierQuality))
            .with_function(Arc::new(BatchTrace))
    }

    pub fn with_function(mut self, function: Arc<dyn AssistantFunction>) -> Self {
        self.functions.insert(function.name().to_string(), function);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn call(&self, name: &str, ctx: FunctionContext<'_>) -> Result<QueryResult> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| AssistantError::unknown_function(name))?;
        debug!(
            function = name,
            session_id = ctx.query.session_id.as_deref().unwrap_or("-"),
            "Calling function"
        );
        function.call(ctx).await
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn to_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn text(row: &Row, key: &str) -> String {
    field(row, key)
        .and_then(value_text)
        .unwrap_or_else(|| "unknown".to_string())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// The less live of two sources.
fn weaker(a: DataSource, b: DataSource) -> DataSource {
    let rank = |s: DataSource| match s {
        DataSource::Database => 0,
        DataSource::Memory => 1,
        _ => 2,
    };
    if rank(b) > rank(a) {
        b
    } else {
        a
    }
}

/// Stock per factory: record count, quantity, risk and frozen counts.
#[derive(Debug, Clone, Copy)]
pub struct InventorySummary;

#[async_trait]
impl AssistantFunction for InventorySummary {
    fn name(&self) -> &'static str {
        "inventory_summary"
    }

    async fn call(&self, ctx: FunctionContext<'_>) -> Result<QueryResult> {
        let result = ctx
            .executor
            .query_collection(Collection::Inventory, ctx.params)
            .await?;

        let mut by_factory: BTreeMap<String, (usize, f64, usize, usize)> = BTreeMap::new();
        for row in &result.rows {
            let status = text(row, "status");
            let entry = by_factory.entry(text(row, "factory")).or_default();
            entry.0 += 1;
            entry.1 += field_number(row, "quantity").unwrap_or(0.0);
            if status.contains("风险") {
                entry.2 += 1;
            }
            if status.contains("冻结") {
                entry.3 += 1;
            }
        }

        let rows = by_factory
            .into_iter()
            .map(|(factory, (records, quantity, risk, frozen))| {
                to_row(json!({
                    "factory": factory,
                    "record_count": records,
                    "quantity": quantity,
                    "risk_count": risk,
                    "frozen_count": frozen,
                }))
            })
            .collect();
        Ok(QueryResult::new(rows, result.source))
    }
}

/// Per-supplier test totals and pass rate, best first.
#[derive(Debug, Clone, Copy)]
pub struct SupplierQuality;

#[async_trait]
impl AssistantFunction for SupplierQuality {
    fn name(&self) -> &'static str {
        "supplier_quality"
    }

    async fn call(&self, ctx: FunctionContext<'_>) -> Result<QueryResult> {
        let result = ctx
            .executor
            .query_collection(Collection::LabTests, ctx.params)
            .await?;

        let mut by_supplier: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for row in &result.rows {
            let outcome = text(row, "test_result");
            let entry = by_supplier.entry(text(row, "supplier")).or_default();
            entry.0 += 1;
            if outcome.eq_ignore_ascii_case("NG") || outcome.contains("不合格") {
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize, f64)> = by_supplier
            .into_iter()
            .map(|(supplier, (total, failed))| {
                let rate = if total == 0 {
                    0.0
                } else {
                    round2((total - failed) as f64 * 100.0 / total as f64)
                };
                (supplier, total, failed, rate)
            })
            .collect();
        ranked.sort_by(|a, b| b.3.total_cmp(&a.3).then_with(|| a.0.cmp(&b.0)));

        let rows = ranked
            .into_iter()
            .enumerate()
            .map(|(i, (supplier, total, failed, rate))| {
                to_row(json!({
                    "rank": i + 1,
                    "supplier_name": supplier,
                    "total_tests": total,
                    "ng_count": failed,
                    "pass_rate": rate,
                }))
            })
            .collect();
        Ok(QueryResult::new(rows, result.source))
    }
}

/// Everything known about one batch, tagged by stage.
#[derive(Debug, Clone, Copy)]
pub struct BatchTrace;

#[async_trait]
impl AssistantFunction for BatchTrace {
    fn name(&self) -> &'static str {
        "batch_trace"
    }

    async fn call(&self, ctx: FunctionContext<'_>) -> Result<QueryResult> {
        let batch = ctx
            .params
            .get("batch_code")
            .ok_or_else(|| AssistantError::missing_parameter("batch_code"))?;
        let params: ExtractedParameters = std::iter::once(("batch_code", batch)).collect();

        let mut rows = Vec::new();
        let mut source: Option<DataSource> = None;
        for collection in Collection::ALL {
            let result = ctx.executor.query_collection(collection, &params).await?;
            source = Some(source.map_or(result.source, |s| weaker(s, result.source)));
            rows.extend(result.rows.into_iter().map(|mut row| {
                row.insert("stage".to_string(), json!(collection.as_str()));
                row
            }));
        }

        Ok(QueryResult::new(rows, source.unwrap_or(DataSource::Mock)))
    }
}
