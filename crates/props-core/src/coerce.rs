//! Raw string to typed value coercion
//!
//! Every supported target is a [`PropertyKind`]. [`coerce`] dispatches on
//! the requested kind, never on the shape of the raw string, so the same
//! value can coerce differently depending on what the caller asks for.

use crate::uri::Uri;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// The closed set of types a property can be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    String,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Path,
    Uri,
    /// A caller-named type with no coercion rule
    Custom(&'static str),
}

impl PropertyKind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::F32
                | Self::F64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Path => "path",
            Self::Uri => "uri",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A coerced property value, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Path(PathBuf),
    Uri(Uri),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::String(_) => PropertyKind::String,
            Self::I8(_) => PropertyKind::I8,
            Self::I16(_) => PropertyKind::I16,
            Self::I32(_) => PropertyKind::I32,
            Self::I64(_) => PropertyKind::I64,
            Self::U8(_) => PropertyKind::U8,
            Self::U16(_) => PropertyKind::U16,
            Self::U32(_) => PropertyKind::U32,
            Self::U64(_) => PropertyKind::U64,
            Self::F32(_) => PropertyKind::F32,
            Self::F64(_) => PropertyKind::F64,
            Self::Bool(_) => PropertyKind::Bool,
            Self::Path(_) => PropertyKind::Path,
            Self::Uri(_) => PropertyKind::Uri,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v),
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_uri(&self) -> Option<&Uri> {
        match self {
            Self::Uri(u) => Some(u),
            _ => None,
        }
    }
}

fn conversion(name: &str, raw: &str, kind: PropertyKind, reason: impl ToString) -> Error {
    Error::Conversion {
        name: name.to_string(),
        value: raw.to_string(),
        kind,
        reason: reason.to_string(),
    }
}

fn parse_int<T>(name: &str, raw: &str, kind: PropertyKind) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| conversion(name, raw, kind, e))
}

/// Floats tolerate surrounding whitespace and a trailing type suffix.
fn parse_float<T>(name: &str, raw: &str, kind: PropertyKind) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let trimmed = raw.trim();
    let literal = trimmed
        .strip_suffix(['f', 'F', 'd', 'D'])
        .filter(|rest| rest.ends_with(|c: char| c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed);
    literal.parse::<T>().map_err(|e| conversion(name, raw, kind, e))
}

/// `true` only for a case-insensitive "true"; every other string is `false`.
pub fn parse_bool(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("true")
}

/// Coerce the raw value of property `name` to `kind`.
pub fn coerce(name: &str, raw: &str, kind: PropertyKind) -> Result<PropertyValue> {
    use PropertyKind as K;

    let value = match kind {
        K::String => PropertyValue::String(raw.to_string()),

        K::I8 => PropertyValue::I8(parse_int(name, raw, kind)?),
        K::I16 => PropertyValue::I16(parse_int(name, raw, kind)?),
        K::I32 => PropertyValue::I32(parse_int(name, raw, kind)?),
        K::I64 => PropertyValue::I64(parse_int(name, raw, kind)?),
        K::U8 => PropertyValue::U8(parse_int(name, raw, kind)?),
        K::U16 => PropertyValue::U16(parse_int(name, raw, kind)?),
        K::U32 => PropertyValue::U32(parse_int(name, raw, kind)?),
        K::U64 => PropertyValue::U64(parse_int(name, raw, kind)?),
        K::F32 => PropertyValue::F32(parse_float(name, raw, kind)?),
        K::F64 => PropertyValue::F64(parse_float(name, raw, kind)?),

        K::Bool => PropertyValue::Bool(parse_bool(raw)),

        K::Path => {
            if raw.contains('\0') {
                return Err(conversion(
                    name,
                    raw,
                    kind,
                    "nul character is not allowed in an OS file system path",
                ));
            }
            PropertyValue::Path(PathBuf::from(raw))
        }

        K::Uri => PropertyValue::Uri(Uri::parse(raw).map_err(|e| conversion(name, raw, kind, e))?),

        K::Custom(_) => return Err(Error::UnsupportedType { kind }),
    };

    Ok(value)
}

/// A Rust type readable from a property.
pub trait FromProperty: Sized {
    /// The kind requested when reading this type.
    const KIND: PropertyKind;

    /// Extract the typed value; `None` when `value` is of another kind.
    fn from_value(value: PropertyValue) -> Option<Self>;
}

macro_rules! impl_from_property {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromProperty for $ty {
                const KIND: PropertyKind = PropertyKind::$variant;

                fn from_value(value: PropertyValue) -> Option<Self> {
                    match value {
                        PropertyValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_property! {
    String => String,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    PathBuf => Path,
    Uri => Uri,
}
