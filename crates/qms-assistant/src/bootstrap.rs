//! Assembles an assistant from configuration.

use qms_core::AppConfig;
use qms_infra::{connect_optional, MySqlPool, SqlRuleStore, TimeoutPolicy};
use qms_nlp::{FileRuleStore, RuleCatalog};
use qms_query::{QueryExecutor, SnapshotStore};
use std::sync::Arc;
use tracing::info;

use crate::assistant::QueryAssistant;

/// A ready assistant plus the pool it was built with.
pub struct Bootstrapped {
    pub assistant: QueryAssistant,
    pub pool: Option<MySqlPool>,
}

/// Pick the rule source: a rule file when `assistant.rules_path` is set,
/// the `nlp_intent_rules` table when `assistant.rules_from_database` is set
/// and a pool exists, otherwise the built-in rules.
pub async fn load_catalog(config: &AppConfig, pool: Option<&MySqlPool>) -> RuleCatalog {
    if let Some(path) = config.assistant.rules_path.as_deref() {
        return RuleCatalog::load(&FileRuleStore::new(path)).await;
    }

    match pool {
        Some(pool) if config.assistant.rules_from_database => {
            let store = SqlRuleStore::new(pool.clone())
                .with_timeouts(TimeoutPolicy::from_config(&config.database));
            RuleCatalog::load(&store).await
        }
        _ => RuleCatalog::builtin(),
    }
}

/// Connect the database (if configured), load rules and build the assistant.
pub async fn bootstrap(config: &AppConfig) -> Bootstrapped {
    let pool = connect_optional(&config.database).await;
    let catalog = load_catalog(config, pool.as_ref()).await;
    info!(
        origin = catalog.origin(),
        rules = catalog.len(),
        database = pool.is_some(),
        "Rules loaded"
    );

    let executor = QueryExecutor::new(
        pool.clone(),
        TimeoutPolicy::from_config(&config.database),
        Arc::new(SnapshotStore::new()),
    );
    let assistant = QueryAssistant::builder(catalog)
        .with_executor(executor)
        .with_config(config.assistant.clone())
        .build();

    Bootstrapped { assistant, pool }
}
