use std::borrow::Cow;
use std::fmt;

/// How an integer should be rendered. Never affects parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberBase {
    #[default]
    Decimal,
    Hex,
}

/// A typed value recorded in the parse context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Wide enough for both `u64` and `i64` fields.
    Integer { value: i128, base: NumberBase },
    Text(Cow<'static, str>),
    Boolean(bool),
}

impl Value {
    pub fn int(value: impl Into<i128>) -> Self {
        Value::Integer {
            value: value.into(),
            base: NumberBase::Decimal,
        }
    }

    pub fn hex(value: impl Into<i128>) -> Self {
        Value::Integer {
            value: value.into(),
            base: NumberBase::Hex,
        }
    }

    pub fn text(value: impl Into<Cow<'static, str>>) -> Self {
        Value::Text(value.into())
    }

    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Integer { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer { .. } => "integer",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
        }
    }

    /// JSON form: integers stay numbers when they fit, hex integers become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer {
                value,
                base: NumberBase::Decimal,
            } => i64::try_from(*value)
                .map(serde_json::Value::from)
                .or_else(|_| u64::try_from(*value).map(serde_json::Value::from))
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string())),
            Value::Integer { .. } => serde_json::Value::String(self.to_string()),
            Value::Text(s) => serde_json::Value::String(s.to_string()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer {
                value,
                base: NumberBase::Decimal,
            } => write!(f, "{}", value),
            Value::Integer {
                value,
                base: NumberBase::Hex,
            } => {
                if *value < 0 {
                    write!(f, "-0x{:X}", value.unsigned_abs())
                } else {
                    write!(f, "0x{:X}", value)
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Cow::Owned(s))
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value::Text(Cow::Borrowed(s))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::int(v as u64)
    }
}
