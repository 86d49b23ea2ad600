//! Dynamic values for call arguments, bound parameters and decoded cells.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A dynamically typed value.
///
/// Dynamic calls take their arguments as `Vec<Value>` (see [`args!`](crate::args)), and
/// every bound parameter is stored as a `Value` until it is sent to Postgres.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, the empty string and the empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::List(_) => "list",
        }
    }

    /// JSON rendering used by array hydration.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(v) => Json::Bool(*v),
            Value::Int(v) => Json::from(*v),
            Value::Float(v) => Json::from(*v),
            Value::Decimal(v) => Json::String(v.to_string()),
            Value::Json(v) => v.clone(),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            other => Json::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    Decimal => Decimal,
    String => String,
    &str => String,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    Uuid => Uuid,
    serde_json::Value => Json,
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v.naive_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

type BoxError = Box<dyn Error + Sync + Send>;

fn parse_err(value: &str, ty: &Type) -> BoxError {
    format!("cannot bind '{value}' as {ty}").into()
}

/// Text-like column types, including extension types such as `citext`.
fn is_text(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn as_text(v: impl fmt::Display, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    v.to_string().as_str().to_sql(ty, out)
}

/// Hand off to the native encoder, refusing column types it does not write.
fn delegate<T: ToSql>(
    v: &T,
    kind: &str,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, BoxError> {
    if T::accepts(ty) {
        v.to_sql(ty, out)
    } else {
        Err(format!("cannot bind {kind} value as {ty}").into())
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        let kind = self.kind();
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => Value::Int(i64::from(*v)).to_sql(ty, out),
                _ if is_text(ty) => as_text(v, ty, out),
                _ => delegate(v, kind, ty, out),
            },
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                _ if is_text(ty) => as_text(v, ty, out),
                _ => delegate(v, kind, ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ if is_text(ty) => as_text(v, ty, out),
                _ => delegate(v, kind, ty, out),
            },
            Value::Decimal(v) => match *ty {
                Type::FLOAT4 | Type::FLOAT8 => v
                    .to_f64()
                    .ok_or_else(|| parse_err(&v.to_string(), ty))?
                    .to_sql(ty, out),
                _ if is_text(ty) => as_text(v, ty, out),
                _ => delegate(v, kind, ty, out),
            },
            Value::String(s) => match *ty {
                Type::INT2 | Type::INT4 | Type::INT8 => {
                    let n: i64 = s.trim().parse().map_err(|_| parse_err(s, ty))?;
                    Value::Int(n).to_sql(ty, out)
                }
                Type::FLOAT4 | Type::FLOAT8 => {
                    let n: f64 = s.trim().parse().map_err(|_| parse_err(s, ty))?;
                    Value::Float(n).to_sql(ty, out)
                }
                Type::NUMERIC => s
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|_| parse_err(s, ty))?
                    .to_sql(ty, out),
                Type::UUID => Uuid::parse_str(s)
                    .map_err(|_| parse_err(s, ty))?
                    .to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)
                    .map_err(|_| parse_err(s, ty))?
                    .to_sql(ty, out),
                _ => delegate(&s.as_str(), kind, ty, out),
            },
            Value::Date(v) => match *ty {
                Type::TIMESTAMP | Type::TIMESTAMPTZ => {
                    let midnight = v
                        .and_hms_opt(0, 0, 0)
                        .ok_or_else(|| parse_err(&v.to_string(), ty))?;
                    Value::DateTime(midnight).to_sql(ty, out)
                }
                _ if is_text(ty) => as_text(v, ty, out),
                _ => delegate(v, kind, ty, out),
            },
            Value::Time(v) if is_text(ty) => as_text(v, ty, out),
            Value::Time(v) => delegate(v, kind, ty, out),
            Value::DateTime(v) => match *ty {
                Type::TIMESTAMPTZ => v.and_utc().to_sql(ty, out),
                Type::DATE => v.date().to_sql(ty, out),
                _ if is_text(ty) => as_text(v, ty, out),
                _ => delegate(v, kind, ty, out),
            },
            Value::Uuid(v) if is_text(ty) => as_text(v, ty, out),
            Value::Uuid(v) => delegate(v, kind, ty, out),
            Value::Json(v) if is_text(ty) => as_text(v, ty, out),
            Value::Json(v) => delegate(v, kind, ty, out),
            Value::List(items) => match ty.kind() {
                Kind::Array(_) => items.to_sql(ty, out),
                _ => Err(format!("list value cannot be bound to scalar type {ty}").into()),
            },
        }
    }

    /// Every type is accepted here; `to_sql` converts or refuses per value.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Build a `Vec<Value>` argument list for dynamic calls.
///
/// ```ignore
/// let qb = qb.call("priceBetween", args![10, 20])?;
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_rust_values() {
        assert_eq!(Value::from(5_i32), Value::Int(5));
        assert_eq!(Value::from("a"), Value::String("a".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn args_macro_builds_value_list() {
        let args = crate::args!["active", 3, true];
        assert_eq!(
            args,
            vec![Value::from("active"), Value::Int(3), Value::Bool(true)]
        );
        assert!(crate::args![].is_empty());
    }

    #[test]
    fn empty_values() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::List(vec![]).is_empty());
        assert!(!Value::Int(0).is_empty());
    }

    #[test]
    fn binds_int_into_narrower_columns() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(7).to_sql(&Type::INT4, &mut buf).is_ok());
        assert_eq!(&buf[..], &7_i32.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(Value::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn null_binds_as_sql_null() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::TEXT, &mut buf),
            Ok(IsNull::Yes)
        ));
    }

    #[test]
    fn list_requires_array_column() {
        let mut buf = BytesMut::new();
        let list = Value::from(vec![1, 2]);
        assert!(list.to_sql(&Type::INT4, &mut buf).is_err());
        assert!(list.to_sql(&Type::INT4_ARRAY, &mut buf).is_ok());
    }

    #[test]
    fn refuses_mismatched_column_types() {
        let mut buf = BytesMut::new();
        assert!(Value::Float(3.0).to_sql(&Type::INT8, &mut buf).is_err());
        assert!(Value::Bool(true).to_sql(&Type::FLOAT8, &mut buf).is_err());
        assert!(Value::from("2024-03-01").to_sql(&Type::TIMESTAMP, &mut buf).is_err());
        assert!(Value::Decimal(Decimal::new(15, 1)).to_sql(&Type::INT4, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn scalars_bind_into_text_columns_as_their_text() {
        let mut buf = BytesMut::new();
        Value::Bool(true).to_sql(&Type::TEXT, &mut buf).unwrap();
        assert_eq!(&buf[..], b"true");

        let mut buf = BytesMut::new();
        Value::Float(2.5).to_sql(&Type::VARCHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"2.5");
    }

    #[test]
    fn date_binds_into_timestamp_as_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut from_date = BytesMut::new();
        Value::Date(date).to_sql(&Type::TIMESTAMP, &mut from_date).unwrap();

        let mut from_datetime = BytesMut::new();
        date.and_hms_opt(0, 0, 0)
            .unwrap()
            .to_sql(&Type::TIMESTAMP, &mut from_datetime)
            .unwrap();
        assert_eq!(from_date, from_datetime);
    }

    #[test]
    fn native_pairs_still_bind() {
        let mut buf = BytesMut::new();
        Value::Int(42).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(&buf[..], &42_i64.to_be_bytes());

        let mut buf = BytesMut::new();
        Value::Float(3.0).to_sql(&Type::FLOAT8, &mut buf).unwrap();
        assert_eq!(&buf[..], &3.0_f64.to_be_bytes());
    }
}
