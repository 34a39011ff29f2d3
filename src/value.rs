use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// One result row, keyed by logical column alias.
pub type Record = HashMap<String, Value>;

/// A single column value as returned by (or bound to) the database.
///
/// The set of variants is closed so callers can match exhaustively. Integer
/// columns of every width decode to [`Value::Int`]; `DATE` columns decode to a
/// [`Value::Timestamp`] at midnight.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

value_from! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    bool => Bool as bool,
    String => Text as String,
    &str => Text as String,
    NaiveDateTime => Timestamp as NaiveDateTime,
}

/// Values above `i64::MAX` are kept as decimal text.
impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Int)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Timestamp(v.and_time(NaiveTime::MIN))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A value bound to a named placeholder by `and`/`or`/`bind`.
///
/// A list expands to one positional placeholder per element, which is what
/// `column in (:name)` expects. A `Vec<u8>` therefore binds as a list of
/// integers; wrap it in [`Value::Bytes`] to bind a blob.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Value(Value),
    List(Vec<Value>),
}

impl Param {
    /// Null and empty lists are treated as "no filter".
    pub fn is_absent(&self) -> bool {
        match self {
            Param::Value(v) => v.is_null(),
            Param::List(items) => items.is_empty(),
        }
    }
}

macro_rules! param_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Param {
                fn from(v: $t) -> Self {
                    Param::Value(v.into())
                }
            }

            impl From<Option<$t>> for Param {
                fn from(v: Option<$t>) -> Self {
                    Param::Value(v.map_or(Value::Null, Into::into))
                }
            }
        )*
    };
}

param_from! {
    Value, i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, bool,
    String, &str, NaiveDateTime, NaiveDate,
}

impl<T: Into<Value>> From<Vec<T>> for Param {
    fn from(v: Vec<T>) -> Self {
        Param::List(v.into_iter().map(Into::into).collect())
    }
}

/// `None` is an absent filter, like an empty list.
impl<T: Into<Value>> From<Option<Vec<T>>> for Param {
    fn from(v: Option<Vec<T>>) -> Self {
        v.map_or(Param::Value(Value::Null), Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_params() {
        assert!(Param::from(None::<i32>).is_absent());
        assert!(Param::from(Vec::<String>::new()).is_absent());
        assert!(Param::from(Value::Null).is_absent());
        assert!(!Param::from(0).is_absent());
        assert!(!Param::from("").is_absent());
        assert!(!Param::from(vec![1, 2]).is_absent());
    }

    #[test]
    fn test_list_param_converts_elements() {
        assert_eq!(
            Param::from(vec!["a", "b"]),
            Param::List(vec![Value::Text("a".into()), Value::Text("b".into())])
        );
    }

    #[test]
    fn test_optional_list_param() {
        assert!(Param::from(None::<Vec<&str>>).is_absent());
        assert!(Param::from(Some(Vec::<i64>::new())).is_absent());
        assert_eq!(
            Param::from(Some(vec![1_u8, 2])),
            Param::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_unsigned_and_date_conversions() {
        assert_eq!(Value::from(7_u8), Value::Int(7));
        assert_eq!(Value::from(7_usize), Value::Int(7));
        assert_eq!(Value::from(u64::MAX), Value::Text(u64::MAX.to_string()));

        let day = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            Param::from(day),
            Param::Value(Value::Timestamp(day.and_hms_opt(0, 0, 0).unwrap()))
        );
        assert!(Param::from(None::<NaiveDate>).is_absent());
        assert_eq!(Param::from(Some(3_u64)), Param::Value(Value::Int(3)));
    }

    #[test]
    fn test_serialize_untagged() {
        let row: Vec<Value> = vec![Value::Int(7), Value::Text("Acme".into()), Value::Null];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[7,"Acme",null]"#);
    }
}
