//! # Petrel CSS Parser
//!
//! Minimal CSS syntax parser for the Petrel pipeline: turns a stylesheet
//! string into a flat list of `selector-list { prop: value; }` rules.
//!
//! This is deliberately not a full CSS parser. It understands rule blocks,
//! comma-separated selector lists, `/* ... */` comments, and strips a
//! trailing `!important` from declaration values. At-rules, nesting, and
//! string/url tokenization are not supported.

use thiserror::Error;

/// Errors that can occur while parsing CSS.
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("Unexpected end of input inside a rule block")]
    UnexpectedEof,
}

/// A parsed stylesheet.
#[derive(Debug, Default, Clone)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

/// A parsed rule: one or more selectors sharing a declaration block.
#[derive(Debug, Clone)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

/// A parsed `property: value` declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

/// Parse a stylesheet string into rules.
///
/// Empty selectors and rules without declarations are dropped rather than
/// reported; an unclosed block is the only hard error.
pub fn parse_stylesheet(css: &str) -> Result<Stylesheet, ParseError> {
    let mut out = Stylesheet::default();

    let mut selector_text = String::new();
    let mut property = String::new();
    let mut value = String::new();
    let mut declarations: Vec<Declaration> = Vec::new();

    let mut in_block = false;
    let mut in_value = false;

    let mut chars = css.chars().peekable();
    while let Some(c) = chars.next() {
        // Skip /* ... */ wherever it appears.
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            while let Some(cc) = chars.next() {
                if cc == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    break;
                }
            }
            continue;
        }

        if !in_block {
            if c == '{' {
                in_block = true;
                property.clear();
                value.clear();
                declarations.clear();
                in_value = false;
            } else {
                selector_text.push(c);
            }
            continue;
        }

        if c == '}' {
            flush_declaration(&mut property, &mut value, &mut declarations);
            let selectors = split_selectors(&selector_text);
            if !selectors.is_empty() && !declarations.is_empty() {
                out.rules.push(Rule {
                    selectors,
                    declarations: std::mem::take(&mut declarations),
                });
            }

            in_block = false;
            selector_text.clear();
            property.clear();
            value.clear();
            declarations.clear();
            in_value = false;
            continue;
        }

        if !in_value {
            if c == ':' {
                in_value = true;
            } else {
                property.push(c);
            }
            continue;
        }

        if c == ';' {
            flush_declaration(&mut property, &mut value, &mut declarations);
            in_value = false;
            continue;
        }

        value.push(c);
    }

    if in_block {
        return Err(ParseError::UnexpectedEof);
    }

    Ok(out)
}

fn split_selectors(selector_text: &str) -> Vec<String> {
    selector_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn flush_declaration(property: &mut String, value: &mut String, decls: &mut Vec<Declaration>) {
    let prop = property.trim();
    let val = strip_important(value.trim());
    if !prop.is_empty() && !val.is_empty() {
        decls.push(Declaration {
            property: prop.to_string(),
            value: val.to_string(),
        });
    }
    property.clear();
    value.clear();
}

fn strip_important(value: &str) -> &str {
    let lower = value.to_ascii_lowercase();
    match lower.rfind("!important") {
        Some(idx) => value[..idx].trim_end(),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_stylesheet() {
        let css = r#"
            body { color: black; }
            .container { width: 100%; height: 10px; }
        "#;
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].selectors, vec!["body"]);
        assert_eq!(sheet.rules[0].declarations.len(), 1);
        assert_eq!(sheet.rules[0].declarations[0].property, "color");
        assert_eq!(sheet.rules[0].declarations[0].value, "black");
        assert_eq!(sheet.rules[1].selectors, vec![".container"]);
        assert_eq!(sheet.rules[1].declarations.len(), 2);
    }

    #[test]
    fn parse_selector_list() {
        let css = "h1, h2 , .title { font-weight: bold; }";
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].selectors, vec!["h1", "h2", ".title"]);
    }

    #[test]
    fn parse_descendant_selector() {
        let css = "body div #myid { color: red; }";
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules[0].selectors, vec!["body div #myid"]);
    }

    #[test]
    fn parse_with_comments() {
        let css = r#"
            /* heading */
            body { color: black; /* inside */ width: 10px; }
        "#;
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].declarations.len(), 2);
    }

    #[test]
    fn important_is_stripped() {
        let css = ".box { height: 10px !important; }";
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules[0].declarations[0].value, "10px");
    }

    #[test]
    fn empty_rule_is_dropped() {
        let css = "p {} div { color: blue; }";
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].selectors, vec!["div"]);
    }

    #[test]
    fn unclosed_block_is_error() {
        let css = "body { color: black;";
        assert!(matches!(
            parse_stylesheet(css),
            Err(ParseError::UnexpectedEof)
        ));
    }
}
