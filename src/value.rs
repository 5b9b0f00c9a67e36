use indexmap::IndexMap;
use std::error::Error;
use std::fmt;

/// A context or extra value attached to a [`LogRecord`](crate::record::LogRecord).
///
/// Anything that is not natively representable as JSON is carried as an
/// [`Exception`] or as an opaque [`Value::Object`] with a string form; the
/// formatter knows how to normalize every variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Seq(Vec<Value>),
    Map(Fields),
    Exception(Exception),
    /// Opaque value known only by its type name and string form.
    Object { class: String, repr: String },
}

impl Value {
    pub fn object(class: impl Into<String>, repr: impl Into<String>) -> Self {
        Value::Object {
            class: class.into(),
            repr: repr.into(),
        }
    }

    /// Capture any `Debug` value as an opaque object named after its type.
    pub fn debug<T: fmt::Debug>(value: &T) -> Self {
        Value::Object {
            class: std::any::type_name::<T>().to_string(),
            repr: format!("{:?}", value),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered, string-keyed mapping of [`Value`]s. Insertion order is kept
/// and re-inserting a key replaces the value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(IndexMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut fields = Fields(IndexMap::with_capacity(iter.size_hint().0));
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

/// Structured snapshot of an error, including its cause chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub class: String,
    pub message: String,
    pub code: i64,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Stack frames, one `file:line` (or symbol) per entry.
    pub trace: Vec<String>,
    pub previous: Option<Box<Exception>>,
}

impl Exception {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            code: 0,
            file: None,
            line: None,
            trace: Vec::new(),
            previous: None,
        }
    }

    /// Snapshot a typed error. The class is the error's type name and the
    /// `source()` chain becomes the `previous` chain.
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        let mut exception = Exception::new(std::any::type_name::<E>(), err.to_string());
        exception.previous = err.source().map(|src| Box::new(Exception::from_dyn(src)));
        exception
    }

    /// Snapshot a type-erased error. The concrete type is unknown, so the
    /// class is reported as `Error`.
    pub fn from_dyn(err: &(dyn Error + 'static)) -> Self {
        let mut exception = Exception::new("Error", err.to_string());
        exception.previous = err.source().map(|src| Box::new(Exception::from_dyn(src)));
        exception
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_trace<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trace = frames.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_previous(mut self, previous: Exception) -> Self {
        self.previous = Some(Box::new(previous));
        self
    }

    /// `file:line`, when the location is known.
    pub fn location(&self) -> Option<String> {
        let file = self.file.as_deref()?;
        Some(match self.line {
            Some(line) => format!("{}:{}", file, line),
            None => file.to_string(),
        })
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Fields> for Value {
    fn from(v: Fields) -> Self {
        Value::Map(v)
    }
}

impl From<Exception> for Value {
    fn from(v: Exception) -> Self {
        Value::Exception(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Seq(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Map(map.into_iter().collect()),
        }
    }
}
