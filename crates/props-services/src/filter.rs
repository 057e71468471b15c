//! LDAP-style filter expressions over registration properties
//!
//! Supported forms: `(attr=value)`, `(attr=*)`, `(attr=pre*mid*suf)`,
//! `(&F...)`, `(|F...)` and `(!F)`. Attribute names compare
//! case-insensitively, values exactly. `\` escapes the next character.
//! An empty expression or a bare `*` matches everything.

use crate::error::RegistryError;
use std::collections::BTreeMap;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Any,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal(String, String),
    /// Value split at unescaped `*`
    Substring(String, Vec<String>),
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> RegistryError {
        RegistryError::InvalidFilter {
            filter: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), RegistryError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}' at index {}", self.pos)))
        }
    }

    fn filter(&mut self) -> Result<Filter, RegistryError> {
        self.skip_whitespace();
        self.expect('(')?;
        self.skip_whitespace();
        let parsed = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(parsed)
    }

    fn list(&mut self) -> Result<Vec<Filter>, RegistryError> {
        let mut filters = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.filter()?);
        }
        if filters.is_empty() {
            return Err(self.error(format!("empty filter list at index {}", self.pos)));
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter, RegistryError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '=' {
                break;
            }
            if matches!(c, '(' | ')' | '*' | '\\') {
                return Err(self.error(format!("invalid character '{c}' in attribute at index {}", self.pos)));
            }
            self.pos += 1;
        }
        let attr: String = self.chars[start..self.pos].iter().collect::<String>().trim().to_string();
        if attr.is_empty() {
            return Err(self.error(format!("missing attribute at index {start}")));
        }
        if attr.ends_with(['~', '<', '>']) {
            return Err(self.error(format!("unsupported operator after '{attr}'")));
        }
        self.expect('=')?;

        let mut parts = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error(format!("unescaped '(' at index {}", self.pos))),
                Some('*') => {
                    self.pos += 1;
                    parts.push(String::new());
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    self.pos += 1;
                    if let Some(last) = parts.last_mut() {
                        last.push(escaped);
                    }
                }
                Some(c) => {
                    self.pos += 1;
                    if let Some(last) = parts.last_mut() {
                        last.push(c);
                    }
                }
            }
        }

        Ok(match parts.len() {
            1 => Filter::Equal(attr, parts.remove(0)),
            2 if parts.iter().all(String::is_empty) => Filter::Present(attr),
            _ => Filter::Substring(attr, parts),
        })
    }
}

fn lookup<'p>(properties: &'p BTreeMap<String, String>, attr: &str) -> Option<&'p str> {
    properties
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(attr))
        .map(|(_, v)| v.as_str())
}

fn substring_match(value: &str, parts: &[String]) -> bool {
    let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
        return false;
    };
    let Some(mut rest) = value.strip_prefix(first.as_str()) else {
        return false;
    };
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle.as_str()) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }
    rest.ends_with(last.as_str())
}

impl Filter {
    /// Parse a filter expression.
    pub fn parse(source: &str) -> Result<Self, RegistryError> {
        let trimmed = source.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::Any);
        }
        let mut parser = Parser {
            source,
            chars: source.chars().collect(),
            pos: 0,
        };
        let filter = parser.filter()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            return Err(parser.error(format!("trailing input at index {}", parser.pos)));
        }
        Ok(filter)
    }

    /// Evaluate against a set of registration properties.
    pub fn matches(&self, properties: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Any => true,
            Self::And(filters) => filters.iter().all(|f| f.matches(properties)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(properties)),
            Self::Not(filter) => !filter.matches(properties),
            Self::Present(attr) => lookup(properties, attr).is_some(),
            Self::Equal(attr, expected) => lookup(properties, attr) == Some(expected.as_str()),
            Self::Substring(attr, parts) => {
                lookup(properties, attr).is_some_and(|v| substring_match(v, parts))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn props() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("objectClass".to_string(), "app::Greeter".to_string()),
            ("lang".to_string(), "en".to_string()),
            ("region".to_string(), "us-east-1".to_string()),
            ("note".to_string(), "a*b".to_string()),
        ])
    }

    #[rstest]
    #[case("", true)]
    #[case("*", true)]
    #[case("(lang=en)", true)]
    #[case("(LANG=en)", true)]
    #[case("(lang=fr)", false)]
    #[case("(lang=*)", true)]
    #[case("(missing=*)", false)]
    #[case("(region=us-*)", true)]
    #[case("(region=*east*)", true)]
    #[case("(region=*west*)", false)]
    #[case("(note=a\\*b)", true)]
    #[case("(&(lang=en)(region=us-*))", true)]
    #[case("(&(lang=en)(region=eu-*))", false)]
    #[case("(|(lang=fr)(lang=en))", true)]
    #[case("(!(lang=fr))", true)]
    #[case(" ( & (lang=en) (objectClass=app::Greeter) ) ", true)]
    fn evaluates(#[case] source: &str, #[case] expected: bool) {
        let filter = Filter::parse(source).unwrap();
        assert_eq!(filter.matches(&props()), expected, "{source}");
    }

    #[rstest]
    #[case("lang=en")]
    #[case("(lang=en")]
    #[case("(=en)")]
    #[case("(&)")]
    #[case("(lang~=en)")]
    #[case("(lang>=1)")]
    #[case("(lang=en))")]
    #[case("(lang=(en))")]
    #[case("(lang=en\\")]
    fn rejects_malformed(#[case] source: &str) {
        let err = Filter::parse(source).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFilter { ref filter, .. } if filter == source));
    }
}
