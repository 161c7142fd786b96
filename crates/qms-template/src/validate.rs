//! Load-time template validation.
//!
//! Rules are checked once when the catalog is built so that a malformed
//! template never reaches query time.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::error::{Result, TemplateError};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

/// A tag or expression found while scanning a template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Variable(String),
    If(String),
    EndIf,
}

/// Check that a template is well-formed.
///
/// Every `{% if x %}` needs a matching `{% endif %}`, blocks may not nest and
/// every `{{ }}` must hold a single bare identifier.
pub fn validate(template: &str) -> Result<()> {
    scan(template).map(|_| ())
}

/// Identifiers referenced by `{{ }}` expressions and `if` conditions.
pub fn referenced_variables(template: &str) -> Result<BTreeSet<String>> {
    let names = scan(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Variable(name) | Segment::If(name) => Some(name),
            Segment::EndIf => None,
        })
        .collect();
    Ok(names)
}

fn scan(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut open_block: Option<(String, usize)> = None;
    let mut cursor = 0;

    while let Some(offset) = next_delimiter(&template[cursor..]) {
        let start = cursor + offset;
        let is_tag = template[start..].starts_with("{%");
        let (closing, delimiter) = if is_tag { ("%}", "{%") } else { ("}}", "{{") };

        let body_start = start + 2;
        let body_len = template[body_start..]
            .find(closing)
            .ok_or(TemplateError::Unterminated {
                delimiter,
                position: start,
            })?;
        let body = template[body_start..body_start + body_len].trim();
        cursor = body_start + body_len + 2;

        if !is_tag {
            if !IDENTIFIER.is_match(body) {
                return Err(TemplateError::InvalidExpression {
                    expression: body.to_string(),
                    position: start,
                });
            }
            segments.push(Segment::Variable(body.to_string()));
            continue;
        }

        let words: Vec<&str> = body.split_whitespace().collect();
        match words.as_slice() {
            ["if", name] if IDENTIFIER.is_match(name) => {
                if open_block.is_some() {
                    return Err(TemplateError::NestedBlock {
                        name: name.to_string(),
                        position: start,
                    });
                }
                open_block = Some((name.to_string(), start));
                segments.push(Segment::If(name.to_string()));
            }
            ["endif"] => {
                if open_block.take().is_none() {
                    return Err(TemplateError::UnmatchedEndif { position: start });
                }
                segments.push(Segment::EndIf);
            }
            _ => {
                return Err(TemplateError::UnknownTag {
                    tag: body.to_string(),
                    position: start,
                })
            }
        }
    }

    if let Some((name, position)) = open_block {
        return Err(TemplateError::UnclosedBlock { name, position });
    }

    Ok(segments)
}

fn next_delimiter(text: &str) -> Option<usize> {
    match (text.find("{{"), text.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_templates() {
        assert!(validate("SELECT * FROM inventory").is_ok());
        assert!(validate("SELECT * FROM inventory WHERE 1=1 {% if factory %}AND factory = '{{ factory }}'{% endif %}").is_ok());
        assert!(validate("{% if a %}X{{a}}{% endif %}{% if b %}Y{% endif %}").is_ok());
    }

    #[test]
    fn test_unclosed_if() {
        let err = validate("SELECT 1 {% if factory %} AND x").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnclosedBlock {
                name: "factory".to_string(),
                position: 9
            }
        );
    }

    #[test]
    fn test_unmatched_endif() {
        let err = validate("SELECT 1 {% endif %}").unwrap_err();
        assert!(matches!(err, TemplateError::UnmatchedEndif { .. }));
    }

    #[test]
    fn test_nested_blocks_rejected() {
        let err = validate("{% if a %}{% if b %}x{% endif %}{% endif %}").unwrap_err();
        assert!(matches!(err, TemplateError::NestedBlock { ref name, .. } if name == "b"));
    }

    #[test]
    fn test_expression_must_be_identifier() {
        let err = validate("WHERE a = '{{ a.b }}'").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidExpression { ref expression, .. } if expression == "a.b"));

        assert!(validate("WHERE a = '{{ a b }}'").is_err());
        assert!(validate("WHERE a = '{{ }}'").is_err());
    }

    #[test]
    fn test_unterminated_delimiters() {
        assert!(matches!(
            validate("WHERE a = '{{ a'").unwrap_err(),
            TemplateError::Unterminated { delimiter: "{{", .. }
        ));
        assert!(matches!(
            validate("{% if a ").unwrap_err(),
            TemplateError::Unterminated { delimiter: "{%", .. }
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let err = validate("{% for x in y %}{% endfor %}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownTag { .. }));
    }

    #[test]
    fn test_referenced_variables() {
        let vars = referenced_variables(
            "{% if status %}AND status = '{{ status }}'{% endif %} AND factory = '{{factory}}'",
        )
        .unwrap();
        let vars: Vec<_> = vars.into_iter().collect();
        assert_eq!(vars, vec!["factory".to_string(), "status".to_string()]);
    }
}
