//! Database tier.
//!
//! Sends rendered SQL to MySQL. Named `:name` placeholders and positional
//! `?` placeholders are bound as parameters; only single read-only
//! statements are accepted.

use async_trait::async_trait;
use qms_core::{DataSource, ExtractedParameters, Row};
use qms_infra::{row_to_json, MySqlPool, TimeoutOrError, TimeoutPolicy};
use tracing::{debug, instrument, trace};

use crate::error::{QueryError, Result};
use crate::tier::{QueryAttempt, QueryRequest};

/// SQL with placeholders rewritten to `?` and the values to bind, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundStatement {
    pub sql: String,
    pub binds: Vec<Option<String>>,
}

/// Rewrite `:name` placeholders to `?` and collect bind values.
///
/// A positional `?` takes the next name from `bind_order`. Placeholders
/// inside quoted literals or after a second colon (`::`) are left alone.
/// A placeholder whose parameter is absent binds `NULL`.
pub fn bind_placeholders(
    sql: &str,
    params: &ExtractedParameters,
    bind_order: &[String],
) -> BoundStatement {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut binds = Vec::new();
    let mut positional = bind_order.iter();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                if chars.get(i + 1) == Some(&q) {
                    out.push(q);
                    i += 2;
                    continue;
                }
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
                i += 1;
            }
            '?' => {
                let value = positional.next().and_then(|name| params.get(name)).map(String::from);
                binds.push(value);
                out.push('?');
                i += 1;
            }
            ':' if is_named_start(&chars, i) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                binds.push(params.get(&name).map(String::from));
                out.push('?');
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    BoundStatement { sql: out, binds }
}

fn is_named_start(chars: &[char], i: usize) -> bool {
    let prev_is_colon = i > 0 && chars[i - 1] == ':';
    let next_is_ident = chars
        .get(i + 1)
        .map(|c| c.is_ascii_alphabetic() || *c == '_')
        .unwrap_or(false);
    !prev_is_colon && next_is_ident
}

/// Reject anything but a single `SELECT` / `WITH` statement.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let trimmed = sql.trim_start();
    let keyword: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    if keyword != "SELECT" && keyword != "WITH" {
        return Err(QueryError::rejected(format!(
            "only SELECT statements are allowed, got '{}'",
            if keyword.is_empty() { "<empty>" } else { keyword.as_str() }
        )));
    }

    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in trimmed.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            ';' if !trimmed[idx + 1..].trim().is_empty() => {
                return Err(QueryError::rejected("multiple statements are not allowed"));
            }
            _ => {}
        }
    }
    Ok(())
}

/// First tier: the relational database.
#[derive(Debug, Clone)]
pub struct DatabaseTier {
    pool: Option<MySqlPool>,
    timeouts: TimeoutPolicy,
}

impl DatabaseTier {
    pub fn new(pool: Option<MySqlPool>) -> Self {
        Self {
            pool,
            timeouts: TimeoutPolicy::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }
}

#[async_trait]
impl QueryAttempt for DatabaseTier {
    fn source(&self) -> DataSource {
        DataSource::Database
    }

    #[instrument(skip(self, request), fields(tier = "database"))]
    async fn attempt(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        let pool = self
            .pool
            .as_ref()
            .ok_or(QueryError::NotConfigured(DataSource::Database))?;
        let sql = request
            .sql
            .as_deref()
            .ok_or_else(|| QueryError::rejected("no SQL statement to run"))?;

        ensure_read_only(sql)?;
        let statement = bind_placeholders(sql, &request.params, &request.bind_order);
        trace!(sql = %statement.sql, binds = statement.binds.len(), "Running statement");

        let mut query = sqlx::query(&statement.sql);
        for value in &statement.binds {
            query = query.bind(value.clone());
        }

        let rows = self
            .timeouts
            .run_query("rule_query", query.fetch_all(pool))
            .await
            .map_err(|e| match e {
                TimeoutOrError::Timeout(t) => QueryError::Timeout(t.to_string()),
                TimeoutOrError::Error(err) => QueryError::database(err.to_string()),
            })?;

        debug!(rows = rows.len(), "Database returned rows");
        Ok(rows.iter().map(row_to_json).collect())
    }
}
