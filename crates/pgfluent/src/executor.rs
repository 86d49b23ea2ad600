//! Running built queries and decoding result rows into [`Record`]s.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::qb::BuiltQuery;
use crate::row::Record;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

/// Shape requested from the backend by a terminal fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HydrationMode {
    /// Mapped into entity structs.
    Object,
    /// Column-name keyed maps.
    Array,
    /// Rows of plain column values.
    Scalar,
    /// Flat entity mapping without associations.
    SimpleObject,
    /// One value from one row.
    SingleScalar,
}

impl HydrationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HydrationMode::Object => "object",
            HydrationMode::Array => "array",
            HydrationMode::Scalar => "scalar",
            HydrationMode::SimpleObject => "simple_object",
            HydrationMode::SingleScalar => "single_scalar",
        }
    }
}

impl fmt::Display for HydrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs built queries.
///
/// Implemented for every [`GenericClient`]; tests implement it directly to capture the
/// statements a session produces.
pub trait QueryExecutor: Send + Sync {
    fn fetch(
        &self,
        query: &BuiltQuery,
        mode: HydrationMode,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    fn execute(&self, query: &BuiltQuery) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

impl<C: GenericClient> QueryExecutor for C {
    async fn fetch(&self, query: &BuiltQuery, mode: HydrationMode) -> OrmResult<Vec<Record>> {
        tracing::debug!(
            target: "pgfluent.sql",
            sql = %query.sql,
            params = query.params.len(),
            mode = %mode,
            "fetch"
        );
        let rows = self.query_built(query).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, query: &BuiltQuery) -> OrmResult<u64> {
        tracing::debug!(
            target: "pgfluent.sql",
            sql = %query.sql,
            params = query.params.len(),
            "execute"
        );
        self.execute_built(query).await
    }
}

/// Decode every column of `row` by its Postgres type.
pub fn decode_row(row: &Row) -> OrmResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_cell(row, idx, column.type_())
            .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
        record.push(column.name(), value);
    }
    Ok(record)
}

fn get<'a, T>(row: &'a Row, idx: usize) -> Result<Value, tokio_postgres::Error>
where
    T: FromSql<'a>,
    Value: From<Option<T>>,
{
    row.try_get::<_, Option<T>>(idx).map(Value::from)
}

fn decode_cell(row: &Row, idx: usize, ty: &Type) -> Result<Value, tokio_postgres::Error> {
    match *ty {
        Type::BOOL => get::<bool>(row, idx),
        Type::INT2 => get::<i16>(row, idx),
        Type::INT4 => get::<i32>(row, idx),
        Type::INT8 => get::<i64>(row, idx),
        Type::FLOAT4 => get::<f32>(row, idx),
        Type::FLOAT8 => get::<f64>(row, idx),
        Type::NUMERIC => get::<Decimal>(row, idx),
        Type::DATE => get::<NaiveDate>(row, idx),
        Type::TIME => get::<NaiveTime>(row, idx),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx),
        Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx),
        Type::UUID => get::<Uuid>(row, idx),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx),
        Type::INT4_ARRAY => get::<Vec<i32>>(row, idx),
        Type::INT8_ARRAY => get::<Vec<i64>>(row, idx),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => get::<Vec<String>>(row, idx),
        _ => get::<String>(row, idx),
    }
}
