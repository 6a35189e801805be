//! Conversion between `sqlx` MySQL rows/arguments and [`SqlValue`]

use crate::domain::{DatabaseError, Row, SqlValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySql, MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _, Type, TypeInfo, ValueRef};

/// Binds statement parameters in order
pub(crate) fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::UInt(v) => query.bind(*v),
            SqlValue::Float(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Bytes(b) => query.bind(b.as_slice()),
        };
    }
    query
}

/// Decodes every column of a row
pub(crate) fn decode_row(row: &MySqlRow) -> Result<Row, DatabaseError> {
    let mut out = Row::with_capacity(row.columns().len());
    for column in row.columns() {
        let type_info = column.type_info();
        let unsigned = <u8 as Type<MySql>>::compatible(type_info);
        let decoding = Decoding::for_column(type_info.name(), unsigned);
        let value = decode_value(row, column.ordinal(), decoding).map_err(|e| {
            DatabaseError::DecodeFailed {
                column: column.name().to_string(),
                message: e.to_string(),
            }
        })?;
        out.insert(column.name(), value);
    }
    Ok(out)
}

/// How a column is read into a [`SqlValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoding {
    Int,
    UInt,
    Float,
    Double,
    Text,
    Year,
    Date,
    DateTime,
    Timestamp,
    Time,
    Bytes,
    Utf8OrBytes,
}

impl Decoding {
    // The driver names every TINYINT(1) "BOOLEAN"; it is read as an integer
    // so values other than 0 and 1 survive a copy.
    fn for_column(type_name: &str, unsigned: bool) -> Self {
        match type_name {
            "BOOLEAN" if unsigned => Decoding::UInt,
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => Decoding::Int,
            "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
            | "BIGINT UNSIGNED" => Decoding::UInt,
            "FLOAT" => Decoding::Float,
            "DOUBLE" => Decoding::Double,
            "DECIMAL" | "JSON" | "ENUM" | "SET" => Decoding::Text,
            "YEAR" => Decoding::Year,
            "DATE" => Decoding::Date,
            "DATETIME" => Decoding::DateTime,
            "TIMESTAMP" => Decoding::Timestamp,
            "TIME" => Decoding::Time,
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
            | "GEOMETRY" => Decoding::Bytes,
            _ => Decoding::Utf8OrBytes,
        }
    }
}

fn decode_value(
    row: &MySqlRow,
    index: usize,
    decoding: Decoding,
) -> Result<SqlValue, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(SqlValue::Null);
    }

    let value = match decoding {
        Decoding::Int => SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?),
        Decoding::UInt => SqlValue::UInt(row.try_get_unchecked::<u64, _>(index)?),
        Decoding::Float => SqlValue::Float(f64::from(row.try_get::<f32, _>(index)?)),
        Decoding::Double => SqlValue::Float(row.try_get::<f64, _>(index)?),
        Decoding::Text => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
        Decoding::Year => SqlValue::UInt(u64::from(row.try_get_unchecked::<u16, _>(index)?)),
        Decoding::Date => SqlValue::Text(
            row.try_get::<NaiveDate, _>(index)?
                .format("%Y-%m-%d")
                .to_string(),
        ),
        Decoding::DateTime => SqlValue::Text(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%d %H:%M:%S%.f")
                .to_string(),
        ),
        Decoding::Timestamp => SqlValue::Text(
            row.try_get::<DateTime<Utc>, _>(index)?
                .naive_utc()
                .format("%Y-%m-%d %H:%M:%S%.f")
                .to_string(),
        ),
        Decoding::Time => SqlValue::Text(
            row.try_get::<NaiveTime, _>(index)?
                .format("%H:%M:%S%.f")
                .to_string(),
        ),
        Decoding::Bytes => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        Decoding::Utf8OrBytes => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            match String::from_utf8(bytes) {
                Ok(text) => SqlValue::Text(text),
                Err(e) => SqlValue::Bytes(e.into_bytes()),
            }
        }
    };
    Ok(value)
}
