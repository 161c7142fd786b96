//! Output formatting utilities

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Serialize for the machine-readable formats. `None` for text, which each
/// command renders itself.
pub fn format_structured<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<Option<String>> {
    match format {
        OutputFormat::Text => Ok(None),
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
    }
}

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print a dimmed message
pub fn dimmed(message: &str) {
    println!("{}", message.dimmed());
}

/// Print a list item
pub fn list_item(index: usize, message: &str) {
    println!("  {}. {}", index, message);
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.bold().underline());
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render JSON objects as a table; columns follow the first row's keys.
pub fn rows_table(rows: &[Value]) -> Option<String> {
    let first = rows.first()?.as_object()?;
    let columns: Vec<String> = first.keys().cloned().collect();

    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map(cell).unwrap_or_default())
            .collect();
        builder.push_record(record);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    Some(table.to_string())
}

/// Truncate a string to a maximum number of characters
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_rows_table() {
        let table = rows_table(&[
            json!({"factory": "深圳工厂", "quantity": 10}),
            json!({"factory": "重庆工厂"}),
        ])
        .unwrap();
        assert!(table.contains("factory"));
        assert!(table.contains("深圳工厂"));
        assert!(rows_table(&[]).is_none());
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("深圳工厂风险库存", 20), "深圳工厂风险库存");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
