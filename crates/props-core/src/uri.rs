//! URI reference parsing for the `Uri` coercion kind
//!
//! Components are split with the generic-syntax expression from RFC 3986
//! Appendix B, then each component is checked against its allowed
//! characters. Non-ASCII characters are accepted as-is.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$").unwrap()
});

static SCHEME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").unwrap());

/// Why a string is not a URI reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("Illegal character in scheme name at index {index}")]
    IllegalScheme { index: usize },

    #[error("Illegal character in {component} at index {index}: {ch:?}")]
    IllegalCharacter {
        component: &'static str,
        index: usize,
        ch: char,
    },

    #[error("Malformed escape pair at index {index}")]
    MalformedEscape { index: usize },

    #[error("Expected scheme-specific part at index {index}")]
    MissingSchemeSpecificPart { index: usize },
}

/// A parsed URI reference (absolute or relative).
#[derive(Debug, Clone)]
pub struct Uri {
    raw: String,
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

fn is_sub_delim(c: char) -> bool {
    matches!(c, '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=')
}

fn is_other(c: char) -> bool {
    !c.is_ascii() && !c.is_control() && !c.is_whitespace()
}

/// Check one component; `offset` is its byte index within the whole input.
fn validate(
    component: &'static str,
    text: &str,
    offset: usize,
    extra: fn(char) -> bool,
) -> Result<(), UriError> {
    let bytes = text.as_bytes();
    for (idx, c) in text.char_indices() {
        if c == '%' {
            let hex_ok = bytes.get(idx + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(idx + 2).is_some_and(u8::is_ascii_hexdigit);
            if !hex_ok {
                return Err(UriError::MalformedEscape {
                    index: offset + idx,
                });
            }
            continue;
        }
        if is_unreserved(c) || is_sub_delim(c) || is_other(c) || extra(c) {
            continue;
        }
        return Err(UriError::IllegalCharacter {
            component,
            index: offset + idx,
            ch: c,
        });
    }
    Ok(())
}

impl Uri {
    /// Parse a URI reference.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        // The pattern accepts every string; the groups just may be empty
        let Some(caps) = URI_PATTERN.captures(input) else {
            return Err(UriError::IllegalCharacter {
                component: "URI",
                index: 0,
                ch: input.chars().next().unwrap_or(' '),
            });
        };

        let scheme = caps.get(1);
        if let Some(m) = scheme {
            if !SCHEME_PATTERN.is_match(m.as_str()) {
                let index = m
                    .as_str()
                    .char_indices()
                    .find(|&(i, c)| {
                        !(c.is_ascii_alphabetic() || (i > 0 && (c.is_ascii_digit() || matches!(c, '+' | '.' | '-'))))
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                return Err(UriError::IllegalScheme { index });
            }
        }

        let authority = caps.get(2);
        if let Some(m) = authority {
            validate("authority", m.as_str(), m.start(), |c| {
                matches!(c, ':' | '@' | '[' | ']')
            })?;
        }

        let path = caps.get(3).map_or("", |m| m.as_str());
        let path_start = caps.get(3).map_or(0, |m| m.start());
        validate("path", path, path_start, |c| matches!(c, ':' | '@' | '/'))?;

        let query = caps.get(4);
        if let Some(m) = query {
            validate("query", m.as_str(), m.start(), |c| {
                matches!(c, ':' | '@' | '/' | '?')
            })?;
        }

        let fragment = caps.get(5);
        if let Some(m) = fragment {
            validate("fragment", m.as_str(), m.start(), |c| {
                matches!(c, ':' | '@' | '/' | '?')
            })?;
        }

        if let Some(m) = scheme {
            if authority.is_none() && path.is_empty() && query.is_none() {
                return Err(UriError::MissingSchemeSpecificPart { index: m.end() + 1 });
            }
        }

        Ok(Self {
            raw: input.to_string(),
            scheme: scheme.map(|m| m.as_str().to_string()),
            authority: authority.map(|m| m.as_str().to_string()),
            path: path.to_string(),
            query: query.map(|m| m.as_str().to_string()),
            fragment: fragment.map(|m| m.as_str().to_string()),
        })
    }

    /// The original text of the URI.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// Host part of the authority, without user info or port.
    pub fn host(&self) -> Option<&str> {
        let authority = self.authority.as_deref()?;
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
        let host = if host_port.starts_with('[') {
            host_port
                .find(']')
                .map_or(host_port, |end| &host_port[..=end])
        } else {
            host_port.rsplit_once(':').map_or(host_port, |(h, _)| h)
        };
        (!host.is_empty()).then_some(host)
    }

    /// Port of the authority, if present and numeric.
    pub fn port(&self) -> Option<u16> {
        let authority = self.authority.as_deref()?;
        let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
        let after_host = match host_port.find(']') {
            Some(end) if host_port.starts_with('[') => &host_port[end + 1..],
            _ => host_port,
        };
        after_host.rsplit_once(':')?.1.parse().ok()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// An absolute URI has a scheme.
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Uri {}

impl std::hash::Hash for Uri {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
