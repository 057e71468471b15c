//! Flat `key=value` properties text codec
//!
//! The format is line oriented with no sections:
//!
//! - `#` or `!` as the first non-blank character starts a comment line
//! - the key ends at the first unescaped `=`, `:` or whitespace
//! - an odd number of trailing backslashes continues a line
//! - `\t \n \r \f \uXXXX` are escapes; any other escaped character is literal

use crate::{Error, Result};
use std::collections::BTreeMap;

/// A parsed property table, ordered by key.
pub type Properties = BTreeMap<String, String>;

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Split text at `\n`, `\r` or `\r\n`.
fn natural_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&text[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&text[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn continues(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Parse properties text into a table. Later duplicates win.
pub fn parse(text: &str) -> Result<Properties> {
    let lines = natural_lines(text);
    let mut props = Properties::new();
    let mut i = 0;

    while i < lines.len() {
        let line_no = i + 1;
        let first = lines[i].trim_start_matches(is_blank);
        i += 1;
        if first.is_empty() || first.starts_with('#') || first.starts_with('!') {
            continue;
        }

        let mut logical = String::new();
        let mut current = first;
        loop {
            if !continues(current) {
                logical.push_str(current);
                break;
            }
            logical.push_str(&current[..current.len() - 1]);
            // A continuation at end of input just drops the backslash
            let Some(next) = lines.get(i) else { break };
            current = next.trim_start_matches(is_blank);
            i += 1;
        }

        let (key, value) = split_entry(&logical);
        props.insert(unescape(key, line_no)?, unescape(value, line_no)?);
    }

    Ok(props)
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut key_end = bytes.len();
    let mut value_start = bytes.len();
    let mut has_separator = false;
    let mut preceding_backslash = false;

    for (idx, &b) in bytes.iter().enumerate() {
        if !preceding_backslash {
            if b == b'=' || b == b':' {
                key_end = idx;
                value_start = idx + 1;
                has_separator = true;
                break;
            }
            if matches!(b, b' ' | b'\t' | b'\x0c') {
                key_end = idx;
                value_start = idx + 1;
                break;
            }
        }
        preceding_backslash = b == b'\\' && !preceding_backslash;
    }

    while value_start < bytes.len() {
        let b = bytes[value_start];
        if !matches!(b, b' ' | b'\t' | b'\x0c') {
            if !has_separator && (b == b'=' || b == b':') {
                has_separator = true;
            } else {
                break;
            }
        }
        value_start += 1;
    }

    (&line[..key_end], &line[value_start..])
}

fn read_code_unit(chars: &mut std::str::Chars<'_>, line: usize) -> Result<u16> {
    let mut unit: u16 = 0;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| Error::Malformed {
                line,
                message: "malformed \\uXXXX escape".into(),
            })?;
        unit = (unit << 4) | digit as u16;
    }
    Ok(unit)
}

fn unescape(raw: &str, line: usize) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let unit = read_code_unit(&mut chars, line)?;
                if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: pair it with a following \uXXXX low surrogate
                    let mut lookahead = chars.clone();
                    let low = match (lookahead.next(), lookahead.next()) {
                        (Some('\\'), Some('u')) => read_code_unit(&mut lookahead, line)
                            .ok()
                            .filter(|u| (0xDC00..0xE000).contains(u)),
                        _ => None,
                    };
                    match low {
                        Some(low) => {
                            chars = lookahead;
                            out.extend(char::decode_utf16([unit, low]).map(|r| {
                                r.unwrap_or(char::REPLACEMENT_CHARACTER)
                            }));
                        }
                        None => out.push(char::REPLACEMENT_CHARACTER),
                    }
                } else {
                    out.push(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

fn escape_into(out: &mut String, text: &str, is_key: bool) {
    for (idx, c) in text.chars().enumerate() {
        match c {
            ' ' if is_key || idx == 0 => out.push_str("\\ "),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
}

/// Render a table as properties text, one entry per line in key order.
///
/// `header` is written as leading comment lines.
pub fn serialize(props: &Properties, header: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(header) = header {
        for line in header.split(['\r', '\n']) {
            out.push('#');
            out.push_str(line);
            out.push('\n');
        }
    }

    for (key, value) in props {
        escape_into(&mut out, key, true);
        out.push('=');
        escape_into(&mut out, value, false);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[rstest]
    #[case("a=1", "a", "1")]
    #[case("a:1", "a", "1")]
    #[case("a 1", "a", "1")]
    #[case("a = 1", "a", "1")]
    #[case("  a\t:\t1", "a", "1")]
    #[case("a", "a", "")]
    #[case("a=", "a", "")]
    #[case("a==1", "a", "=1")]
    #[case("a 1 2 ", "a", "1 2 ")]
    #[case("a\\=b=c", "a=b", "c")]
    #[case("a\\ b=c", "a b", "c")]
    #[case("path=C:\\\\data", "path", "C:\\data")]
    fn parses_single_entry(#[case] text: &str, #[case] key: &str, #[case] value: &str) {
        assert_eq!(parse(text).unwrap(), table(&[(key, value)]));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# comment\n! bang comment\n\n   \n  # indented\nkey=value\n";
        assert_eq!(parse(text).unwrap(), table(&[("key", "value")]));
    }

    #[test]
    fn handles_mixed_line_endings() {
        let text = "a=1\r\nb=2\rc=3\n";
        assert_eq!(parse(text).unwrap(), table(&[("a", "1"), ("b", "2"), ("c", "3")]));
    }

    #[test]
    fn joins_continuation_lines() {
        let text = "fruits=apple, \\\n        banana, \\\n   pear\n";
        assert_eq!(parse(text).unwrap(), table(&[("fruits", "apple, banana, pear")]));
    }

    #[test]
    fn even_backslashes_do_not_continue() {
        let text = "a=x\\\\\nb=y";
        assert_eq!(parse(text).unwrap(), table(&[("a", "x\\"), ("b", "y")]));
    }

    #[test]
    fn continuation_at_end_of_input_is_dropped() {
        assert_eq!(parse("a=x\\").unwrap(), table(&[("a", "x")]));
    }

    #[test]
    fn comment_marker_on_continuation_is_content() {
        let text = "a=1\\\n#2";
        assert_eq!(parse(text).unwrap(), table(&[("a", "1#2")]));
    }

    #[test]
    fn decodes_escapes() {
        let text = "msg=tab\\there\\nnext\\u00e9\\uD83D\\uDE00";
        assert_eq!(parse(text).unwrap(), table(&[("msg", "tab\there\nnext\u{e9}\u{1F600}")]));
    }

    #[test]
    fn lone_surrogate_becomes_replacement() {
        assert_eq!(parse("a=\\uD800x").unwrap(), table(&[("a", "\u{FFFD}x")]));
    }

    #[test]
    fn malformed_unicode_escape_reports_line() {
        let err = parse("ok=1\nbad=\\u12G4").unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 2, .. }), "got {err:?}");
    }

    #[test]
    fn later_duplicate_wins() {
        assert_eq!(parse("a=1\na=2").unwrap(), table(&[("a", "2")]));
    }

    #[test]
    fn serialize_escapes_keys_and_values() {
        let props = table(&[("a key", " lead"), ("x=y", "a:b#c!d"), ("t", "1\t2\n")]);
        let text = serialize(&props, None);
        assert_eq!(text, "a\\ key=\\ lead\nt=1\\t2\\n\nx\\=y=a\\:b\\#c\\!d\n");
    }

    #[test]
    fn serialize_writes_header_comment() {
        let text = serialize(&table(&[("a", "1")]), Some("generated\nby test"));
        assert_eq!(text, "#generated\n#by test\na=1\n");
    }

    #[test]
    fn serialize_keeps_non_ascii() {
        let text = serialize(&table(&[("name", "café")]), None);
        assert_eq!(text, "name=café\n");
    }

    #[test]
    fn serialize_escapes_control_characters() {
        let text = serialize(&table(&[("bell", "\x07")]), None);
        assert_eq!(text, "bell=\\u0007\n");
        assert_eq!(parse(&text).unwrap(), table(&[("bell", "\x07")]));
    }
}
