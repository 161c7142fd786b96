//! # QMS Assistant
//!
//! Answers natural-language quality-management questions (inventory, lab
//! tests, production-line tracking) with data.
//!
//! A question is matched against the rule catalog, parameters are
//! extracted, the rule's action runs through the tiered executor and the
//! rows are formatted into a summary. Every outcome is an
//! [`AssistantResponse`](qms_core::AssistantResponse); nothing is raised to
//! the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use qms_assistant::QueryAssistant;
//! use qms_core::QueryContext;
//! use qms_nlp::RuleCatalog;
//!
//! #[tokio::main]
//! async fn main() {
//!     let assistant = QueryAssistant::builder(RuleCatalog::builtin()).build();
//!     let response = assistant
//!         .process_query("深圳工厂风险库存", &QueryContext::new())
//!         .await;
//!     println!("{} ({})", response.message().unwrap_or("-"), response.source);
//! }
//! ```

pub mod assistant;
pub mod bootstrap;
pub mod error;
pub mod functions;

pub use assistant::{AssistantBuilder, QueryAssistant};
pub use bootstrap::{bootstrap, load_catalog, Bootstrapped};
pub use error::{AssistantError, Result};
pub use functions::{
    AssistantFunction, BatchTrace, FunctionContext, FunctionRegistry, InventorySummary,
    SupplierQuality,
};
