//! # QMS Template
//!
//! A deliberately small template language for SQL rule targets:
//!
//! - `{{ name }}` interpolates an escaped parameter value
//! - `{% if name %} ... {% endif %}` keeps its body only when `name` is set
//!
//! Templates are validated when a rule is loaded ([`Template::parse`]) and
//! rendered per request ([`Template::render`]).
//!
//! ```rust
//! use qms_template::Template;
//! use serde_json::json;
//!
//! let template = Template::parse(
//!     "SELECT * FROM inventory WHERE 1=1 {% if factory %}AND factory = '{{ factory }}'{% endif %}",
//! ).unwrap();
//! let params = json!({"factory": "深圳工厂"});
//! let sql = template.render(params.as_object().unwrap());
//! assert_eq!(sql, "SELECT * FROM inventory WHERE 1 = 1 AND factory = '深圳工厂'");
//! ```

pub mod error;
pub mod normalize;
pub mod render;
pub mod validate;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

pub use error::{Result, TemplateError};
pub use normalize::normalize_sql;
pub use render::{escape_value, is_truthy, render, TemplateContext};
pub use validate::{referenced_variables, validate};

/// A validated template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    variables: BTreeSet<String>,
}

impl Template {
    /// Validate and wrap a template source.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let variables = referenced_variables(&source)?;
        Ok(Self { source, variables })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names used in `{{ }}` expressions and `if` conditions.
    pub fn variables(&self) -> &BTreeSet<String> {
        &self.variables
    }

    pub fn render(&self, params: &TemplateContext) -> String {
        render(&self.source, params)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Template::parse(source).map_err(serde::de::Error::custom)
    }
}
