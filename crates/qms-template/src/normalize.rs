//! Whitespace normalization for rendered SQL.
//!
//! The statement is tokenized once and re-serialized: runs of whitespace
//! collapse to one space, commas get exactly one trailing space, parentheses
//! hug their contents and comparison operators are surrounded by single
//! spaces. Multi-character operators (`!=`, `<=`, `>=`, `<>`) are lexed as
//! one token, and quoted literals are copied through untouched.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Literal,
    Comparison,
    Comma,
    OpenParen,
    CloseParen,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    /// Whitespace preceded this token in the source
    spaced: bool,
}

/// Normalize spacing in a SQL fragment.
pub fn normalize_sql(sql: &str) -> String {
    let tokens = tokenize(sql);
    let mut out = String::with_capacity(sql.len());
    let mut prev: Option<TokenKind> = None;

    for token in &tokens {
        let separator = match (prev, token.kind) {
            (None, _) => "",
            (_, TokenKind::Comma) => "",
            (Some(TokenKind::Comma), _) => " ",
            (Some(TokenKind::OpenParen), _) => "",
            (_, TokenKind::CloseParen) => "",
            (_, TokenKind::Comparison) | (Some(TokenKind::Comparison), _) => " ",
            _ if token.spaced => " ",
            _ => "",
        };
        out.push_str(separator);
        out.push_str(token.text);
        prev = Some(token.kind);
    }

    out
}

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut spaced = false;

    while i < sql.len() {
        let c = match sql[i..].chars().next() {
            Some(c) => c,
            None => break,
        };

        if c.is_whitespace() {
            spaced = true;
            i += c.len_utf8();
            continue;
        }

        let start = i;
        let kind = match c {
            '\'' | '"' | '`' => {
                i = literal_end(bytes, i);
                TokenKind::Literal
            }
            ',' => {
                i += 1;
                TokenKind::Comma
            }
            '(' => {
                i += 1;
                TokenKind::OpenParen
            }
            ')' => {
                i += 1;
                TokenKind::CloseParen
            }
            '!' | '<' | '>' if is_two_char_operator(bytes, i) => {
                i += 2;
                TokenKind::Comparison
            }
            '=' | '<' | '>' => {
                i += 1;
                TokenKind::Comparison
            }
            _ => {
                i = word_end(sql, i);
                TokenKind::Word
            }
        };

        tokens.push(Token {
            kind,
            text: &sql[start..i],
            spaced,
        });
        spaced = false;
    }

    tokens
}

fn is_two_char_operator(bytes: &[u8], i: usize) -> bool {
    matches!(
        (bytes.get(i), bytes.get(i + 1)),
        (Some(b'!'), Some(b'='))
            | (Some(b'<'), Some(b'='))
            | (Some(b'>'), Some(b'='))
            | (Some(b'<'), Some(b'>'))
    )
}

/// Byte index just past the closing quote. Doubled quotes and backslash
/// escapes stay inside the literal; an unclosed literal runs to the end.
fn literal_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                } else {
                    return i + 1;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

fn word_end(sql: &str, start: usize) -> usize {
    for (offset, c) in sql[start..].char_indices() {
        if offset == 0 {
            continue;
        }
        let boundary = c.is_whitespace()
            || matches!(c, '\'' | '"' | '`' | ',' | '(' | ')' | '=' | '<' | '>')
            || (c == '!' && sql[start + offset..].starts_with("!="));
        if boundary {
            return start + offset;
        }
    }
    sql.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            normalize_sql("  SELECT *\n   FROM   inventory\t WHERE 1=1  "),
            "SELECT * FROM inventory WHERE 1 = 1"
        );
    }

    #[test]
    fn test_commas_and_parentheses() {
        assert_eq!(
            normalize_sql("SELECT a ,b,  c FROM t WHERE x IN ( 'a' ,'b' )"),
            "SELECT a, b, c FROM t WHERE x IN ('a', 'b')"
        );
        assert_eq!(
            normalize_sql("WHERE supplier_name LIKE CONCAT( '%' , :supplier , '%' )"),
            "WHERE supplier_name LIKE CONCAT('%', :supplier, '%')"
        );
    }

    #[test]
    fn test_multi_char_operators_are_atomic() {
        assert_eq!(normalize_sql("a!=b"), "a != b");
        assert_eq!(normalize_sql("a<=b AND c>=d"), "a <= b AND c >= d");
        assert_eq!(normalize_sql("a<>b"), "a <> b");
        assert_eq!(normalize_sql("a =  b"), "a = b");
        assert_eq!(normalize_sql("quantity>100"), "quantity > 100");
    }

    #[test]
    fn test_literals_untouched() {
        assert_eq!(
            normalize_sql("WHERE note = 'a  =  b, (c)'"),
            "WHERE note = 'a  =  b, (c)'"
        );
        assert_eq!(normalize_sql("name = 'O''Brien'"), "name = 'O''Brien'");
        assert_eq!(normalize_sql("O''Brien"), "O''Brien");
    }

    #[test]
    fn test_unresolved_variables_survive() {
        assert_eq!(
            normalize_sql("WHERE factory = '{{ factory }}'"),
            "WHERE factory = '{{ factory }}'"
        );
        assert_eq!(normalize_sql("LIMIT {{ limit }}"), "LIMIT {{ limit }}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_sql(""), "");
        assert_eq!(normalize_sql("   \n "), "");
    }

    #[test]
    fn test_function_calls_keep_adjacency() {
        assert_eq!(
            normalize_sql("SELECT COUNT(*) AS total, SUM( quantity ) FROM inventory"),
            "SELECT COUNT(*) AS total, SUM(quantity) FROM inventory"
        );
    }
}
