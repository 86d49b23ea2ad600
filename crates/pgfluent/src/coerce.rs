//! Converting raw argument values into a field's declared semantic type.

use crate::config::QbConfig;
use crate::error::{OrmError, OrmResult};
use crate::metadata::{EntityMetadata, FieldType};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

/// Coerces values for the fields of one entity.
#[derive(Debug, Clone, Copy)]
pub struct FieldTypeCoercer<'a> {
    metadata: &'a EntityMetadata,
    config: &'a QbConfig,
}

impl<'a> FieldTypeCoercer<'a> {
    pub fn new(metadata: &'a EntityMetadata, config: &'a QbConfig) -> Self {
        Self { metadata, config }
    }

    /// Convert `raw` to the declared type of `field`.
    ///
    /// Undeclared fields (including associations) and `Null` pass through unchanged. Temporal
    /// types are parsed with `format`, or the configured default for the type, unless
    /// `skip_temporal_cast` is set or the value is empty. Lists are coerced element-wise.
    pub fn coerce(
        &self,
        field: &str,
        raw: Value,
        format: Option<&str>,
        skip_temporal_cast: bool,
    ) -> OrmResult<Value> {
        let Some(field_type) = self.metadata.type_of_field(field) else {
            return Ok(raw);
        };
        if field_type.is_temporal() && (skip_temporal_cast || raw.is_empty()) {
            return Ok(raw);
        }
        self.coerce_as(field, field_type, raw, format)
    }

    fn coerce_as(
        &self,
        field: &str,
        field_type: FieldType,
        raw: Value,
        format: Option<&str>,
    ) -> OrmResult<Value> {
        let raw = match raw {
            Value::Null => return Ok(Value::Null),
            Value::List(items) => {
                return items
                    .into_iter()
                    .map(|item| self.coerce_as(field, field_type, item, format))
                    .collect::<OrmResult<Vec<_>>>()
                    .map(Value::List);
            }
            other => other,
        };

        let mismatch = |raw: &Value| {
            OrmError::invalid_argument(format!(
                "field '{}.{field}' expects {field_type}, got {} '{raw}'",
                self.metadata.short_name(),
                raw.kind()
            ))
        };

        let coerced = match field_type {
            FieldType::String => match raw {
                Value::String(_) => raw,
                other => Value::String(other.to_string()),
            },
            FieldType::SmallInt | FieldType::Integer | FieldType::BigInt => {
                Value::Int(to_int(&raw).ok_or_else(|| mismatch(&raw))?)
            }
            FieldType::Boolean => Value::Bool(to_bool(&raw)),
            FieldType::Decimal => Value::Decimal(to_decimal(&raw).ok_or_else(|| mismatch(&raw))?),
            FieldType::Float => Value::Float(to_float(&raw).ok_or_else(|| mismatch(&raw))?),
            FieldType::Date => {
                let fmt = format.unwrap_or(&self.config.date_format);
                match &raw {
                    Value::Date(d) => Value::Date(*d),
                    Value::DateTime(dt) => Value::Date(dt.date()),
                    Value::String(s) => Value::Date(
                        NaiveDate::parse_from_str(s.trim(), fmt).map_err(|_| mismatch(&raw))?,
                    ),
                    _ => return Err(mismatch(&raw)),
                }
            }
            FieldType::Time => {
                let fmt = format.unwrap_or(&self.config.time_format);
                match &raw {
                    Value::Time(t) => Value::Time(*t),
                    Value::DateTime(dt) => Value::Time(dt.time()),
                    Value::String(s) => Value::Time(
                        NaiveTime::parse_from_str(s.trim(), fmt).map_err(|_| mismatch(&raw))?,
                    ),
                    _ => return Err(mismatch(&raw)),
                }
            }
            FieldType::DateTime | FieldType::DateTimeTz => {
                let fmt = format.unwrap_or(&self.config.datetime_format);
                match &raw {
                    Value::DateTime(dt) => Value::DateTime(*dt),
                    Value::Date(d) => Value::DateTime(d.and_time(NaiveTime::MIN)),
                    Value::String(s) => {
                        let s = s.trim();
                        let parsed = NaiveDateTime::parse_from_str(s, fmt).or_else(|_| {
                            DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc())
                        });
                        Value::DateTime(parsed.map_err(|_| mismatch(&raw))?)
                    }
                    _ => return Err(mismatch(&raw)),
                }
            }
            FieldType::Guid => match raw {
                Value::String(ref s) => {
                    Value::Uuid(Uuid::parse_str(s.trim()).map_err(|_| mismatch(&raw))?)
                }
                other => other,
            },
            FieldType::Json | FieldType::Other => raw,
        };
        Ok(coerced)
    }
}

fn to_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Int(v) => Some(*v),
        Value::Bool(v) => Some(i64::from(*v)),
        Value::Float(v) if v.is_finite() => Some(v.trunc() as i64),
        Value::Decimal(v) => v.trunc().to_i64(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn to_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Float(v) => Some(*v),
        Value::Int(v) => Some(*v as f64),
        Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        Value::Decimal(v) => v.to_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_decimal(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::Decimal(v) => Some(*v),
        Value::Int(v) => Some(Decimal::from(*v)),
        Value::Bool(v) => Some(Decimal::from(i64::from(*v))),
        Value::Float(v) => Decimal::try_from(*v).ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(v) => *v,
        Value::Int(v) => *v != 0,
        Value::Float(v) => *v != 0.0,
        Value::Decimal(v) => !v.is_zero(),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "f" | "no" | "off"
        ),
        other => !other.is_empty(),
    }
}
