//! Rule catalog commands

use anyhow::{bail, Context, Result};
use colored::Colorize;
use qms_assistant::{load_catalog, QueryAssistant};
use qms_core::AppConfig;
use qms_nlp::{
    FileRuleStore, IntentMatcher, MatchResult, RejectedRule, RuleCatalog, RuleStore, RuleSummary,
};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::output::{self, OutputFormat};

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Priority")]
    priority: u32,
    #[tabled(rename = "Parameters")]
    parameters: String,
    #[tabled(rename = "Example")]
    example: String,
}

impl From<&RuleSummary> for RuleRow {
    fn from(rule: &RuleSummary) -> Self {
        let action = match &rule.action_target {
            Some(target) => format!("{} {}", rule.action_type, target),
            None => rule.action_type.clone(),
        };
        Self {
            name: rule.name.clone(),
            action,
            priority: rule.priority,
            parameters: rule.parameters.join(", "),
            example: output::truncate(rule.example_query.as_deref().unwrap_or(""), 24),
        }
    }
}

#[derive(Tabled, Serialize)]
struct CandidateRow {
    #[tabled(rename = "Rule")]
    name: String,
    #[tabled(rename = "Score")]
    score: f64,
    #[tabled(rename = "Matched")]
    matched_terms: String,
}

impl From<&MatchResult> for CandidateRow {
    fn from(candidate: &MatchResult) -> Self {
        Self {
            name: candidate.rule.name.clone(),
            score: (candidate.score * 100.0).round() / 100.0,
            matched_terms: candidate.matched_terms.join(", "),
        }
    }
}

#[derive(Serialize)]
struct CheckReport<'a> {
    file: String,
    accepted: Vec<RuleSummary>,
    rejected: &'a [RejectedRule],
}

/// Rules that would be served, after the same exclusions the assistant applies.
fn served(catalog: RuleCatalog) -> QueryAssistant {
    QueryAssistant::builder(catalog).build()
}

fn print_rules(rules: &[RuleSummary]) {
    let rows: Vec<RuleRow> = rules.iter().map(RuleRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

/// Validate every record in a rule file. Fails when any record is rejected.
pub async fn check(file: &Path, format: OutputFormat) -> Result<()> {
    let store = FileRuleStore::new(file);
    let records = store
        .load_records()
        .await
        .with_context(|| format!("Failed to read rules from {}", file.display()))?;
    let total = records.len();
    let assistant = served(RuleCatalog::from_values(records));
    let catalog = assistant.catalog();

    let report = CheckReport {
        file: file.display().to_string(),
        accepted: assistant.rules(),
        rejected: catalog.rejected(),
    };

    if let Some(text) = output::format_structured(&report, format)? {
        println!("{}", text);
    } else {
        output::section(&format!("{} ({} records)", report.file, total));
        if !report.accepted.is_empty() {
            print_rules(&report.accepted);
        }
        for rejected in report.rejected {
            output::error(&format!("{}: {}", rejected.name.bold(), rejected.reason));
        }
        if report.rejected.is_empty() {
            output::success(&format!("All {} rules are valid", report.accepted.len()));
        }
    }

    if !report.rejected.is_empty() {
        bail!("{} of {} rules rejected", report.rejected.len(), total);
    }
    Ok(())
}

/// List the rules the assistant would serve with this configuration.
pub async fn list(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog(config, None).await;
    let origin = catalog.origin().to_string();
    let assistant = served(catalog);
    let rules = assistant.rules();

    if let Some(text) = output::format_structured(&rules, format)? {
        println!("{}", text);
        return Ok(());
    }

    output::section(&format!("Rules ({}, {})", rules.len(), origin));
    print_rules(&rules);
    for rejected in assistant.catalog().rejected() {
        output::warning(&format!("skipped {}: {}", rejected.name, rejected.reason));
    }
    output::dimmed("Rules are matched in the order shown; ties go to the earlier rule.");
    Ok(())
}

/// Show how every rule scores against a question, best first.
pub async fn explain(config: &AppConfig, question: &str, format: OutputFormat) -> Result<()> {
    let assistant = served(load_catalog(config, None).await);
    let matcher = IntentMatcher::new(config.assistant.min_match_score);
    let rows: Vec<CandidateRow> = matcher
        .candidates(question, assistant.catalog())
        .iter()
        .map(CandidateRow::from)
        .collect();

    if let Some(text) = output::format_structured(&rows, format)? {
        println!("{}", text);
        return Ok(());
    }

    if rows.is_empty() {
        output::warning("No rule has any trigger or synonym hit");
        return Ok(());
    }
    let winner = rows
        .first()
        .filter(|best| best.score >= matcher.min_score())
        .map(|best| best.name.clone());

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    match winner {
        Some(name) => output::success(&format!("Selected: {}", name.bold())),
        None => output::warning(&format!(
            "Best score is below the threshold {}",
            matcher.min_score()
        )),
    }
    Ok(())
}
