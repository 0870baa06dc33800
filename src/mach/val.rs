use crate::error;
use crate::lang::Error;
use indexmap::IndexMap;

type Result<T> = std::result::Result<T, Error>;

/// Most elements a list or array may reach through an index or `DIM`.
pub const MAX_ELEMENTS: usize = 1 << 20;

/// Most bytes a string may reach through repetition.
pub const MAX_STRING: usize = 1 << 24;

/// `text` repeated `count` times; a negative count gives "".
pub fn repeat_text(text: &str, count: i64) -> Result<String> {
    let count = count.max(0) as usize;
    match text.len().checked_mul(count) {
        Some(len) if len <= MAX_STRING => Ok(text.repeat(count)),
        _ => Err(error!(OutOfMemory; format!("STRING TOO LONG ({} x {})", text.len(), count))),
    }
}

/// ## Dynamic value
///
/// Every expression evaluates to one of these. Integers and floats mix
/// freely; whole floats print without a fraction.

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Val {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Val>),
    Dict(IndexMap<String, Val>),
}

impl Val {
    /// Numeric result that is an integer when whole.
    pub fn number(n: f64) -> Val {
        if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
            Val::Integer(n as i64)
        } else {
            Val::Float(n)
        }
    }

    pub fn bool(b: bool) -> Val {
        Val::Integer(b as i64)
    }

    /// Typed-in text: numbers become numeric, anything else stays text.
    pub fn coerce(s: &str) -> Val {
        let t = s.trim();
        if let Ok(n) = t.parse::<i64>() {
            return Val::Integer(n);
        }
        match t.parse::<f64>() {
            Ok(n) if n.is_finite() => Val::number(n),
            _ => Val::String(s.to_string()),
        }
    }

    /// Numeric view for comparisons; numeric-looking text counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Val::Integer(n) => Some(*n as f64),
            Val::Float(n) => Some(*n),
            Val::String(s) => match s.trim().parse::<f64>() {
                Ok(n) if !s.trim().is_empty() => Some(n),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Val::Null => Ok(0.0),
            Val::Integer(n) => Ok(*n as f64),
            Val::Float(n) => Ok(*n),
            Val::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => Ok(n),
                Err(_) => Err(error!(TypeMismatch; format!("EXPECTED A NUMBER, GOT \"{}\"", s))),
            },
            Val::List(_) | Val::Dict(_) => Err(error!(TypeMismatch; "EXPECTED A NUMBER")),
        }
    }

    /// Truncates toward zero.
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Val::Integer(n) => Ok(*n),
            _ => {
                let n = self.to_f64()?.trunc();
                if n.is_finite() && n.abs() <= i64::MAX as f64 {
                    Ok(n as i64)
                } else {
                    Err(error!(Overflow))
                }
            }
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Null => false,
            Val::Integer(n) => *n != 0,
            Val::Float(n) => *n != 0.0,
            Val::String(s) => !s.is_empty(),
            Val::List(l) => !l.is_empty(),
            Val::Dict(d) => !d.is_empty(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Val::Integer(_) | Val::Float(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "NULL",
            Val::Integer(_) => "INTEGER",
            Val::Float(_) => "FLOAT",
            Val::String(_) => "STRING",
            Val::List(_) => "LIST",
            Val::Dict(_) => "DICT",
        }
    }

    /// Inside lists and dicts strings are quoted.
    fn repr(&self) -> String {
        match self {
            Val::String(s) => format!("\"{}\"", s),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Val::*;
        match self {
            Null => Ok(()),
            Integer(n) => write!(f, "{}", n),
            Float(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            String(s) => write!(f, "{}", s),
            List(items) => {
                let items: Vec<std::string::String> = items.iter().map(|v| v.repr()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Dict(map) => {
                let pairs: Vec<std::string::String> = map
                    .iter()
                    .map(|(k, v)| format!("\"{}\": {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Val {
        Val::String(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Val {
        Val::String(s)
    }
}

impl From<i64> for Val {
    fn from(n: i64) -> Val {
        Val::Integer(n)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Val {
        Val::Float(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Val::Float(5.0).to_string(), "5");
        assert_eq!(Val::Float(2.5).to_string(), "2.5");
        assert_eq!(Val::Null.to_string(), "");
        assert_eq!(
            Val::List(vec![Val::Integer(1), Val::from("a")]).to_string(),
            "[1, \"a\"]"
        );
    }

    #[test]
    fn test_coerce() {
        assert_eq!(Val::coerce("42"), Val::Integer(42));
        assert_eq!(Val::coerce("3.0"), Val::Integer(3));
        assert_eq!(Val::coerce("0.5"), Val::Float(0.5));
        assert_eq!(Val::coerce("Bob"), Val::from("Bob"));
        assert_eq!(Val::coerce("nan"), Val::from("nan"));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Val::from("").is_truthy());
        assert!(Val::from("0").is_truthy());
        assert!(!Val::Integer(0).is_truthy());
        assert!(!Val::List(vec![]).is_truthy());
    }
}
