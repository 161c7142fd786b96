//! Single question command

use anyhow::Result;
use colored::Colorize;
use qms_core::{AppConfig, AssistantResponse, DataSource, QueryContext};
use serde_json::Value;

use crate::output::{self, OutputFormat};

pub async fn run(
    config: &AppConfig,
    question: &str,
    session: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let boot = qms_assistant::bootstrap(config).await;

    let mut context = QueryContext::new();
    if let Some(id) = session {
        context = context.with_session(id);
    }
    let response = boot.assistant.process_query(question, &context).await;

    if let Some(text) = output::format_structured(&response, format)? {
        println!("{}", text);
        return Ok(());
    }

    print_text(&response);
    Ok(())
}

fn print_text(response: &AssistantResponse) {
    let message = response.message().unwrap_or_default();

    match response.source {
        DataSource::Fallback => {
            output::warning(message);
            if let Some(suggestions) = response.data["suggestions"].as_array() {
                for (i, s) in suggestions.iter().filter_map(Value::as_str).enumerate() {
                    output::list_item(i + 1, s);
                }
            }
        }
        DataSource::Validation => output::warning(message),
        DataSource::Unavailable => output::error(message),
        _ => {
            println!("{}", message);
            if let Some(preview) = response.data["structured"]["preview"].as_array() {
                if let Some(table) = output::rows_table(preview) {
                    println!();
                    println!("{}", table);
                }
            }
        }
    }

    eprintln!();
    eprintln!(
        "{}",
        format!(
            "[source: {}, intent: {}]",
            response.source,
            response.intent.as_deref().unwrap_or("-")
        )
        .dimmed()
    );
}
