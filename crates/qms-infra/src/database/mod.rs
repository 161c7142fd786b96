pub mod pool;
pub mod row;
pub mod rule_store;

pub use pool::{connect_optional, create_pool};
pub use row::row_to_json;
pub use rule_store::SqlRuleStore;
