use std::cmp::Ordering;
use std::fmt;

use super::error::ConversionError;
use super::expr::CompareOp;

/// The payload of a [`Value`], independent of its sensitivity mark.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// Not determined yet. An upstream object has not finished evaluating.
    Unknown,
    /// Explicitly absent.
    Null,
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence of values.
    List(Vec<Value>),
}

/// A value flowing through condition evaluation.
///
/// Knowability and nullability live in [`Data`]; sensitivity is a separate
/// attribute that every operation must either carry forward or strip
/// explicitly via [`Value::unmark`].
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    data: Data,
    sensitive: bool,
}

impl Value {
    #[must_use]
    pub fn new(data: Data) -> Self {
        Self {
            data,
            sensitive: false,
        }
    }

    /// A value that will only be known later in the walk.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(Data::Unknown)
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(Data::Null)
    }

    #[must_use]
    pub fn data(&self) -> &Data {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Data {
        self.data
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self.data, Data::Unknown)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self.data, Data::Null)
    }

    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    /// Whether this value or any list element nested inside it is marked.
    #[must_use]
    pub fn has_sensitive(&self) -> bool {
        self.sensitive
            || matches!(&self.data, Data::List(items) if items.iter().any(Value::has_sensitive))
    }

    /// Mark this value as sensitive.
    #[must_use]
    pub fn mark_sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Add the sensitive mark if `sensitive` is set. Never removes an
    /// existing mark.
    #[must_use]
    pub fn with_mark(mut self, sensitive: bool) -> Self {
        self.sensitive |= sensitive;
        self
    }

    /// Strip the sensitive mark, returning the bare value and whether it was
    /// marked.
    #[must_use]
    pub fn unmark(self) -> (Self, bool) {
        let was = self.sensitive;
        (Self::new(self.data), was)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            Data::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            Data::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.data {
            Data::Unknown => "unknown",
            Data::Null => "null",
            Data::Int(_) | Data::Float(_) => "number",
            Data::Bool(_) => "bool",
            Data::String(_) => "string",
            Data::List(_) => "list",
        }
    }

    /// Convert to a bool. Unknown and null pass through unchanged, as does
    /// the sensitive mark. The strings `"true"` and `"false"` convert.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::BoolRequired`] for any other value.
    pub fn convert_to_bool(self) -> Result<Value, ConversionError> {
        let sensitive = self.sensitive;
        let data = match self.data {
            d @ (Data::Unknown | Data::Null | Data::Bool(_)) => d,
            Data::String(s) => match s.as_str() {
                "true" => Data::Bool(true),
                "false" => Data::Bool(false),
                _ => return Err(ConversionError::BoolRequired),
            },
            Data::Int(_) | Data::Float(_) | Data::List(_) => {
                return Err(ConversionError::BoolRequired);
            }
        };
        Ok(Value::new(data).with_mark(sensitive))
    }

    /// Convert to a string. Unknown and null pass through unchanged, as does
    /// the sensitive mark. Numbers and bools render in their canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::StringRequired`] for lists.
    pub fn convert_to_string(self) -> Result<Value, ConversionError> {
        let sensitive = self.sensitive;
        let data = match self.data {
            d @ (Data::Unknown | Data::Null | Data::String(_)) => d,
            Data::Int(v) => Data::String(v.to_string()),
            Data::Float(v) => Data::String(format_float(v)),
            Data::Bool(v) => Data::String(v.to_string()),
            Data::List(_) => return Err(ConversionError::StringRequired),
        };
        Ok(Value::new(data).with_mark(sensitive))
    }

    /// Compare the payloads of two known values using the given operator.
    /// Returns `None` for incompatible types or when either side is unknown
    /// or null. Marks are not considered.
    #[must_use]
    pub fn compare(&self, op: CompareOp, other: &Value) -> Option<bool> {
        let ord = self.partial_cmp_value(other)?;
        Some(match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Neq => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn partial_cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (&self.data, &other.data) {
            (Data::Int(a), Data::Int(b)) => a.partial_cmp(b),
            (Data::Float(a), Data::Float(b)) => a.partial_cmp(b),
            (Data::Int(a), Data::Float(b)) => (*a as f64).partial_cmp(b),
            (Data::Float(a), Data::Int(b)) => a.partial_cmp(&(*b as f64)),
            // Only equality is meaningful for bools; the ordering exists so
            // Eq/Neq share the same path.
            (Data::Bool(a), Data::Bool(b)) => Some(a.cmp(b)),
            (Data::String(a), Data::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        (v as i64).to_string()
    } else {
        v.to_string()
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        Value::new(data)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::new(Data::Int(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::new(Data::Float(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::new(Data::Bool(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::new(Data::String(v.to_owned()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::new(Data::String(v))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sensitive {
            return write!(f, "(sensitive value)");
        }
        match &self.data {
            Data::Unknown => write!(f, "(known after apply)"),
            Data::Null => write!(f, "null"),
            Data::Int(v) => write!(f, "{v}"),
            Data::Float(v) => write!(f, "{v}"),
            Data::Bool(v) => write!(f, "{v}"),
            Data::String(v) => write!(f, "\"{v}\""),
            Data::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
