use std::fmt::{self, Display};
use std::str::FromStr;

/// Typed value attached to a notification under a hint key.
///
/// `Unsupported` carries the kind name of a value that has no native setter;
/// applying it is a logged no-op.
#[derive(Clone, Debug, PartialEq)]
pub enum HintValue {
    Int32(i32),
    Double(f64),
    String(String),
    Byte(u8),
    ByteArray(Vec<u8>),
    Unsupported(String),
}

impl HintValue {
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Int32(_) => "int",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Byte(_) => "byte",
            Self::ByteArray(_) => "bytes",
            Self::Unsupported(kind) => kind,
        }
    }

    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl From<i32> for HintValue {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<f64> for HintValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<u8> for HintValue {
    fn from(value: u8) -> Self {
        Self::Byte(value)
    }
}

impl From<&str> for HintValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for HintValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for HintValue {
    fn from(value: Vec<u8>) -> Self {
        Self::ByteArray(value)
    }
}

impl From<&[u8]> for HintValue {
    fn from(value: &[u8]) -> Self {
        Self::ByteArray(value.to_vec())
    }
}

impl Display for HintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32(v) => write!(f, "int:{v}"),
            Self::Double(v) => write!(f, "double:{v}"),
            Self::String(v) => write!(f, "string:{v}"),
            Self::Byte(v) => write!(f, "byte:{v}"),
            Self::ByteArray(v) => {
                f.write_str("bytes:")?;
                for (idx, byte) in v.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{byte}")?;
                }
                Ok(())
            }
            Self::Unsupported(kind) => write!(f, "{kind}:"),
        }
    }
}

/// Parses `kind:value`, e.g. `int:5`, `string:im.received`, `bytes:1,2,3`.
///
/// An unknown kind parses to [`HintValue::Unsupported`]; a known kind with a
/// malformed value is an error.
impl FromStr for HintValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, raw) = s
            .split_once(':')
            .ok_or_else(|| format!("expected kind:value, got {s:?}"))?;
        let parsed = match kind.to_ascii_lowercase().as_str() {
            "int" | "int32" | "i" => raw.trim().parse().map(Self::Int32).map_err(|e| e.to_string()),
            "double" | "d" => raw.trim().parse().map(Self::Double).map_err(|e| e.to_string()),
            "string" | "str" | "s" => Ok(Self::String(raw.to_string())),
            "byte" | "y" => raw.trim().parse().map(Self::Byte).map_err(|e| e.to_string()),
            "bytes" | "ay" => parse_bytes(raw).map(Self::ByteArray),
            _ => return Ok(Self::Unsupported(kind.to_string())),
        };
        parsed.map_err(|err| format!("invalid {kind} hint value {raw:?}: {err}"))
    }
}

fn parse_bytes(raw: &str) -> Result<Vec<u8>, String> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|e| e.to_string()))
        .collect()
}

/// Splits a `key=kind:value` assignment.
///
/// # Errors
///
/// Returns a message when the `=` separator is missing, the key is empty or
/// the value does not parse.
pub fn parse_assignment(input: &str) -> Result<(String, HintValue), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=kind:value, got {input:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("hint key cannot be empty".to_string());
    }
    Ok((key.to_string(), value.parse()?))
}
