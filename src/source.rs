use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, MySqlConnection, MySqlPool, Row, TypeInfo, ValueRef};

use crate::value::Value;

/// Type alias for SQLx Query with MySQL arguments
pub type Q<'q> = Query<'q, MySql, MySqlArguments>;

/// Something that can run a statement with positional (`?`) parameters and
/// return its rows as positional values.
///
/// Implemented for [`MySqlPool`] and [`MySqlConnection`]; use `&mut *tx` to
/// run inside a transaction. Errors from the database are returned as
/// [`Error::Database`](crate::Error::Database) and never retried.
#[allow(async_fn_in_trait)]
pub trait RowSource {
    async fn fetch_rows(&mut self, sql: &str, params: &[Value]) -> crate::Result<Vec<Vec<Value>>>;
}

impl RowSource for MySqlPool {
    async fn fetch_rows(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> crate::Result<Vec<Vec<Value>>> {
        let rows = bind_values(sqlx::query::<MySql>(sql), params)
            .fetch_all(&*self)
            .await?;
        rows.iter().map(decode_row).collect()
    }
}

impl RowSource for MySqlConnection {
    async fn fetch_rows(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> crate::Result<Vec<Vec<Value>>> {
        let rows = bind_values(sqlx::query::<MySql>(sql), params)
            .fetch_all(&mut *self)
            .await?;
        rows.iter().map(decode_row).collect()
    }
}

fn bind_values<'q>(mut query: Q<'q>, values: &[Value]) -> Q<'q> {
    for value in values {
        query = match value.clone() {
            Value::Null => query.bind(None::<String>),
            Value::Int(v) => query.bind(v),
            Value::Float(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Bool(v) => query.bind(v),
            Value::Bytes(v) => query.bind(v),
            Value::Timestamp(v) => query.bind(v),
        };
    }
    query
}

/// How a column is decoded into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int,
    Unsigned,
    BigUnsigned,
    Float,
    Double,
    DateTime,
    Date,
    Time,
    Bytes,
    Text,
}

/// Maps a MySQL type name (any case) to its decoding.
fn column_kind(type_name: &str) -> ColumnKind {
    match type_name.to_ascii_uppercase().as_str() {
        "BOOLEAN" => ColumnKind::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => ColumnKind::Int,
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "YEAR" => ColumnKind::Unsigned,
        "BIGINT UNSIGNED" => ColumnKind::BigUnsigned,
        "FLOAT" => ColumnKind::Float,
        "DOUBLE" => ColumnKind::Double,
        "DATETIME" | "TIMESTAMP" => ColumnKind::DateTime,
        "DATE" => ColumnKind::Date,
        "TIME" => ColumnKind::Time,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => ColumnKind::Bytes,
        // DECIMAL, JSON, ENUM, SET and the character types arrive as text
        _ => ColumnKind::Text,
    }
}

/// Decodes every column of `row` by its MySQL type name.
fn decode_row(row: &MySqlRow) -> crate::Result<Vec<Value>> {
    row.columns()
        .iter()
        .map(|column| -> crate::Result<Value> {
            let idx = column.ordinal();
            if row.try_get_raw(idx)?.is_null() {
                return Ok(Value::Null);
            }
            let value = match column_kind(column.type_info().name()) {
                ColumnKind::Bool => Value::Bool(row.try_get(idx)?),
                ColumnKind::Int => Value::Int(row.try_get(idx)?),
                ColumnKind::Unsigned => {
                    Value::Int(i64::from(row.try_get_unchecked::<u32, _>(idx)?))
                }
                ColumnKind::BigUnsigned => {
                    let v: u64 = row.try_get(idx)?;
                    i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Int)
                }
                ColumnKind::Float => Value::Float(f64::from(row.try_get::<f32, _>(idx)?)),
                ColumnKind::Double => Value::Float(row.try_get(idx)?),
                ColumnKind::DateTime => Value::Timestamp(row.try_get::<NaiveDateTime, _>(idx)?),
                ColumnKind::Date => Value::Timestamp(
                    row.try_get::<NaiveDate, _>(idx)?.and_time(NaiveTime::MIN),
                ),
                ColumnKind::Time => Value::Text(row.try_get::<NaiveTime, _>(idx)?.to_string()),
                ColumnKind::Bytes => Value::Bytes(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
                ColumnKind::Text => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
            };
            Ok(value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_integers() {
        assert_eq!(column_kind("bigint"), ColumnKind::Int);
        assert_eq!(column_kind("TINYINT"), ColumnKind::Int);
        assert_eq!(column_kind("INT UNSIGNED"), ColumnKind::Unsigned);
        assert_eq!(column_kind("YEAR"), ColumnKind::Unsigned);
        assert_eq!(column_kind("BIGINT UNSIGNED"), ColumnKind::BigUnsigned);
        assert_eq!(column_kind("BOOLEAN"), ColumnKind::Bool);
    }

    #[test]
    fn test_column_kind_floats_and_dates() {
        assert_eq!(column_kind("FLOAT"), ColumnKind::Float);
        assert_eq!(column_kind("DOUBLE"), ColumnKind::Double);
        assert_eq!(column_kind("DATETIME"), ColumnKind::DateTime);
        assert_eq!(column_kind("timestamp"), ColumnKind::DateTime);
        assert_eq!(column_kind("DATE"), ColumnKind::Date);
        assert_eq!(column_kind("TIME"), ColumnKind::Time);
    }

    #[test]
    fn test_column_kind_bytes_and_text() {
        for name in ["VARBINARY", "BLOB", "LONGBLOB", "BIT"] {
            assert_eq!(column_kind(name), ColumnKind::Bytes, "{name}");
        }
        for name in ["DECIMAL", "VARCHAR", "CHAR", "TEXT", "JSON", "ENUM"] {
            assert_eq!(column_kind(name), ColumnKind::Text, "{name}");
        }
    }
}
