//! Turns result rows into a readable summary plus structured data.

use qms_core::{DataSource, Row};
use serde::Serialize;
use std::collections::HashMap;

use crate::fields::{field, field_number, value_text};

pub const DEFAULT_PREVIEW_ROWS: usize = 5;

const UNKNOWN: &str = "unknown";

/// Breakdown dimensions with their display labels.
const DIMENSIONS: &[(&str, &str)] = &[
    ("factory", "工厂"),
    ("supplier", "供应商"),
    ("material", "物料"),
    ("status", "状态"),
];

/// What the formatter needs to know about the query.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub intent: &'a str,
    pub source: DataSource,
}

impl<'a> FormatContext<'a> {
    pub fn new(intent: &'a str, source: DataSource) -> Self {
        Self { intent, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub level: InsightLevel,
    pub message: String,
}

impl Insight {
    fn new(level: InsightLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub value: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub dimension: String,
    pub label: String,
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredResult {
    pub intent: String,
    pub source: DataSource,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<f64>,
    pub breakdowns: Vec<Breakdown>,
    pub preview: Vec<Row>,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedResponse {
    pub summary: String,
    pub structured: StructuredResult,
}

/// Response formatter. Pure: the same rows always format the same way.
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    preview_rows: usize,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_ROWS)
    }
}

impl ResponseFormatter {
    pub fn new(preview_rows: usize) -> Self {
        Self { preview_rows }
    }

    pub fn preview_rows(&self) -> usize {
        self.preview_rows
    }

    pub fn format(&self, rows: &[Row], ctx: FormatContext<'_>) -> FormattedResponse {
        let has_quantity = rows.iter().any(|r| field_number(r, "quantity").is_some());
        let total_quantity: Option<f64> =
            has_quantity.then(|| rows.iter().filter_map(|r| field_number(r, "quantity")).sum());

        let breakdowns: Vec<Breakdown> = DIMENSIONS
            .iter()
            .filter(|(key, _)| rows.iter().any(|r| field(r, key).is_some()))
            .map(|&(key, label)| breakdown(rows, key, label, has_quantity))
            .collect();

        let structured = StructuredResult {
            intent: ctx.intent.to_string(),
            source: ctx.source,
            total: rows.len(),
            total_quantity,
            breakdowns,
            preview: rows.iter().take(self.preview_rows).cloned().collect(),
            insights: insights(rows, ctx.source),
        };

        FormattedResponse {
            summary: summarize(&structured),
            structured,
        }
    }
}

fn text_of(row: &Row, key: &str) -> String {
    field(row, key)
        .and_then(value_text)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn breakdown(rows: &[Row], key: &str, label: &str, with_quantity: bool) -> Breakdown {
    let mut order: Vec<String> = Vec::new();
    let mut tally: HashMap<String, (usize, f64)> = HashMap::new();

    for row in rows {
        let value = text_of(row, key);
        let entry = tally.entry(value.clone()).or_insert_with(|| {
            order.push(value);
            (0, 0.0)
        });
        entry.0 += 1;
        entry.1 += field_number(row, "quantity").unwrap_or(0.0);
    }

    let mut groups: Vec<GroupEntry> = order
        .into_iter()
        .map(|value| {
            let (count, quantity) = tally.get(&value).copied().unwrap_or_default();
            GroupEntry {
                value,
                count,
                quantity: with_quantity.then_some(quantity),
            }
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));

    Breakdown {
        dimension: key.to_string(),
        label: label.to_string(),
        groups,
    }
}

fn count_where(rows: &[Row], key: &str, pred: impl Fn(&str) -> bool) -> usize {
    rows.iter()
        .filter(|row| field(row, key).and_then(value_text).map_or(false, |v| pred(&v)))
        .count()
}

fn insights(rows: &[Row], source: DataSource) -> Vec<Insight> {
    let mut out = Vec::new();

    if rows.is_empty() {
        out.push(Insight::new(InsightLevel::Info, "未找到符合条件的记录"));
        return out;
    }

    let risky = count_where(rows, "status", |s| s.contains("风险"));
    if risky > 0 {
        out.push(Insight::new(
            InsightLevel::Warning,
            format!("有 {} 条风险状态记录，建议优先处理", risky),
        ));
    }

    let frozen = count_where(rows, "status", |s| s.contains("冻结"));
    if frozen > 0 {
        out.push(Insight::new(
            InsightLevel::Warning,
            format!("有 {} 条冻结记录，暂不可用", frozen),
        ));
    }

    let failed = count_where(rows, "test_result", |s| {
        s.eq_ignore_ascii_case("NG") || s.contains("不合格")
    });
    if failed > 0 {
        out.push(Insight::new(
            InsightLevel::Critical,
            format!("有 {} 条检验不合格记录", failed),
        ));
    }

    if source == DataSource::Mock {
        out.push(Insight::new(InsightLevel::Info, "当前结果为模拟数据，仅供参考"));
    }

    out
}

fn source_label(source: DataSource) -> &'static str {
    match source {
        DataSource::Database => "数据库",
        DataSource::Memory => "同步数据",
        DataSource::Mock => "模拟数据",
        _ => "无",
    }
}

fn format_quantity(q: f64) -> String {
    if q.fract() == 0.0 {
        format!("{}", q as i64)
    } else {
        format!("{:.2}", q)
    }
}

fn summarize(result: &StructuredResult) -> String {
    let mut lines = vec![format!(
        "{}：共找到 {} 条记录（数据来源：{}）",
        result.intent,
        result.total,
        source_label(result.source)
    )];

    if let Some(total) = result.total_quantity {
        lines.push(format!("总数量：{}", format_quantity(total)));
    }

    for breakdown in &result.breakdowns {
        let parts: Vec<String> = breakdown
            .groups
            .iter()
            .map(|g| format!("{} {} 条", g.value, g.count))
            .collect();
        lines.push(format!("按{}：{}", breakdown.label, parts.join("，")));
    }

    for insight in &result.insights {
        lines.push(format!("- {}", insight.message));
    }

    lines.join("\n")
}
