//! Template rendering.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::trace;

use crate::normalize::normalize_sql;

/// Parameter values available to a template.
pub type TemplateContext = Map<String, Value>;

static IF_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{%\s*if\s+([A-Za-z_][A-Za-z0-9_]*)\s*%\}(.*?)\{%\s*endif\s*%\}")
        .expect("if-block regex")
});

static VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("variable regex")
});

/// Render a template against a parameter map.
///
/// Conditional blocks are resolved first, then variables are interpolated
/// with SQL escaping, then whitespace is normalized. A variable with no
/// usable value is left in the output verbatim.
pub fn render(template: &str, params: &TemplateContext) -> String {
    let conditioned = IF_BLOCK.replace_all(template, |caps: &Captures| {
        if is_truthy(params.get(&caps[1])) {
            caps[2].to_string()
        } else {
            String::new()
        }
    });

    let interpolated = VARIABLE.replace_all(&conditioned, |caps: &Captures| {
        match params.get(&caps[1]).and_then(escape_value) {
            Some(value) => value,
            None => {
                trace!(variable = &caps[1], "Leaving unresolved template variable");
                caps[0].to_string()
            }
        }
    });

    normalize_sql(&interpolated)
}

/// Whether a parameter enables an `{% if %}` block.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Number(_)) => true,
    }
}

/// SQL text for a parameter value, or `None` when it cannot be interpolated.
///
/// Strings double single quotes (and backslashes, which MySQL treats as an
/// escape character); numbers are written as-is; booleans become `1`/`0`.
pub fn escape_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(escape_str(s)),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(escape_value).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => Some(escape_str(&value.to_string())),
    }
}

pub fn escape_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> TemplateContext {
        match value {
            Value::Object(map) => map,
            _ => panic!("context must be an object"),
        }
    }

    #[test]
    fn test_conditional_round_trip() {
        let template = "{% if a %}X{{a}}{% endif %}";
        assert_eq!(render(template, &ctx(json!({"a": "v"}))), "Xv");
        assert_eq!(render(template, &ctx(json!({}))), "");
    }

    #[test]
    fn test_falsy_values_remove_block() {
        let template = "SELECT 1{% if a %} AND a = '{{ a }}'{% endif %}";
        for value in [json!(null), json!(""), json!(false), json!([])] {
            assert_eq!(render(template, &ctx(json!({ "a": value }))), "SELECT 1");
        }
        assert_eq!(
            render(template, &ctx(json!({"a": 0}))),
            "SELECT 1 AND a = '0'"
        );
    }

    #[test]
    fn test_quote_escaping() {
        let rendered = render("{{a}}", &ctx(json!({"a": "O'Brien"})));
        assert!(rendered.contains("O''Brien"));
        assert_eq!(rendered.matches('\'').count() % 2, 0);

        let rendered = render(
            "WHERE supplier_name = '{{ s }}'",
            &ctx(json!({"s": "x' OR '1'='1"})),
        );
        assert_eq!(rendered, "WHERE supplier_name = 'x'' OR ''1''=''1'");
        assert_eq!(rendered.matches('\'').count() % 2, 0);
    }

    #[test]
    fn test_backslash_cannot_break_out() {
        let rendered = render("a = '{{ v }}'", &ctx(json!({"v": "\\' OR 1=1 -- "})));
        assert_eq!(rendered, "a = '\\\\'' OR 1=1 -- '");
    }

    #[test]
    fn test_numbers_and_booleans() {
        let template = "LIMIT {{ n }} AND flag = {{ f }}";
        assert_eq!(
            render(template, &ctx(json!({"n": 10, "f": true}))),
            "LIMIT 10 AND flag = 1"
        );
        assert_eq!(
            render(template, &ctx(json!({"n": 2.5, "f": false}))),
            "LIMIT 2.5 AND flag = 0"
        );
    }

    #[test]
    fn test_unresolved_variable_left_verbatim() {
        let rendered = render(
            "SELECT * FROM inventory WHERE factory = '{{ factory }}'",
            &ctx(json!({"supplier": "BOE"})),
        );
        assert_eq!(
            rendered,
            "SELECT * FROM inventory WHERE factory = '{{ factory }}'"
        );

        let rendered = render("x = {{ y }}", &ctx(json!({"y": null})));
        assert_eq!(rendered, "x = {{ y }}");
    }

    #[test]
    fn test_factory_and_status_where_clause() {
        let template = "SELECT * FROM inventory WHERE 1=1 \
            {% if factory %}AND factory = '{{ factory }}'{% endif %} \
            {% if status %}AND status = '{{ status }}'{% endif %} \
            {% if supplier %}AND supplier_name = '{{ supplier }}'{% endif %}";
        let rendered = render(
            template,
            &ctx(json!({"factory": "深圳工厂", "status": "风险"})),
        );
        assert_eq!(
            rendered,
            "SELECT * FROM inventory WHERE 1 = 1 AND factory = '深圳工厂' AND status = '风险'"
        );
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let rendered = render("a = '{{ a }}'", &ctx(json!({"a": "{{ b }}", "b": "x"})));
        assert_eq!(rendered, "a = '{{ b }}'");
    }
}
