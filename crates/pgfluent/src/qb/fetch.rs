//! Terminal operations. Each consumes the session, renders it once and makes a single
//! round trip through a [`QueryExecutor`].

use super::entity::{EntityQb, QueryKind};
use crate::error::{OrmError, OrmResult};
use crate::executor::{HydrationMode, QueryExecutor};
use crate::row::{FromRecord, Record};
use crate::value::Value;

impl EntityQb {
    /// Run the session and return the raw records.
    pub async fn fetch_records(
        self,
        conn: &impl QueryExecutor,
        mode: HydrationMode,
    ) -> OrmResult<Vec<Record>> {
        let query = self.build()?;
        conn.fetch(&query, mode).await
    }

    /// First record of a one-row window, or `None`.
    pub async fn fetch_one_record(
        self,
        conn: &impl QueryExecutor,
        mode: HydrationMode,
    ) -> OrmResult<Option<Record>> {
        let records = self.limit(1, Some(0))?.fetch_records(conn, mode).await?;
        at_most_one(records)
    }

    /// Fetch at most one entity.
    ///
    /// Returns `Ok(None)` on zero rows and `OrmError::NonUniqueResult` when the backend
    /// returns more than one.
    pub async fn fetch_one<E: FromRecord>(self, conn: &impl QueryExecutor) -> OrmResult<Option<E>> {
        self.fetch_one_record(conn, HydrationMode::Object)
            .await?
            .map(|record| E::from_record(&record))
            .transpose()
    }

    /// Fetch exactly one entity from a one-row window.
    ///
    /// Zero rows give `OrmError::NoResult`.
    pub async fn fetch_single<E: FromRecord>(self, conn: &impl QueryExecutor) -> OrmResult<E> {
        let record = self
            .fetch_one_record(conn, HydrationMode::Object)
            .await?
            .ok_or(OrmError::NoResult)?;
        E::from_record(&record)
    }

    /// First column of the first row.
    pub async fn fetch_single_scalar(self, conn: &impl QueryExecutor) -> OrmResult<Value> {
        let record = self
            .fetch_one_record(conn, HydrationMode::SingleScalar)
            .await?
            .ok_or(OrmError::NoResult)?;
        record
            .first()
            .cloned()
            .ok_or_else(|| OrmError::decode("?column?", "scalar query returned no columns"))
    }

    pub async fn fetch_all<E: FromRecord>(self, conn: &impl QueryExecutor) -> OrmResult<Vec<E>> {
        let records = self.fetch_records(conn, HydrationMode::Object).await?;
        records.iter().map(E::from_record).collect()
    }

    /// Every row as a column-name keyed JSON object.
    pub async fn fetch_all_array(
        self,
        conn: &impl QueryExecutor,
    ) -> OrmResult<Vec<serde_json::Map<String, serde_json::Value>>> {
        let records = self.fetch_records(conn, HydrationMode::Array).await?;
        Ok(records.iter().map(Record::to_json_map).collect())
    }

    pub async fn fetch_all_scalar(self, conn: &impl QueryExecutor) -> OrmResult<Vec<Record>> {
        self.fetch_records(conn, HydrationMode::Scalar).await
    }

    pub async fn fetch_all_simple<E: FromRecord>(
        self,
        conn: &impl QueryExecutor,
    ) -> OrmResult<Vec<E>> {
        let records = self
            .fetch_records(conn, HydrationMode::SimpleObject)
            .await?;
        records.iter().map(E::from_record).collect()
    }

    /// `COUNT(*)` over the session's filters, ignoring ordering and the result window.
    pub async fn count(self, conn: &impl QueryExecutor) -> OrmResult<i64> {
        let query = self.build_count()?;
        let records = conn.fetch(&query, HydrationMode::SingleScalar).await?;
        let record = exactly_one(records)?;
        match record.first() {
            Some(Value::Int(n)) => Ok(*n),
            Some(other) => Err(OrmError::decode(
                "count",
                format!("expected an integer, got {}", other.kind()),
            )),
            None => Err(OrmError::decode("count", "count query returned no columns")),
        }
    }

    /// Run an UPDATE or DELETE session and return the affected row count.
    ///
    /// Sessions without a WHERE predicate are refused unless
    /// `QbConfig::allow_unfiltered_mutations` is set.
    pub async fn execute(self, conn: &impl QueryExecutor) -> OrmResult<u64> {
        if self.kind == QueryKind::Select {
            return Err(OrmError::validation(
                "execute() requires an UPDATE or DELETE session; use a fetch method for SELECT",
            ));
        }
        let unfiltered = self.where_expr.as_ref().is_none_or(|e| e.is_empty());
        if unfiltered && !self.config.allow_unfiltered_mutations {
            return Err(OrmError::validation(format!(
                "{:?} without WHERE would affect every row of {}",
                self.kind,
                self.metadata().table()
            )));
        }
        let query = self.build()?;
        conn.execute(&query).await
    }
}

fn at_most_one(records: Vec<Record>) -> OrmResult<Option<Record>> {
    match records.len() {
        0 | 1 => Ok(records.into_iter().next()),
        n => Err(OrmError::NonUniqueResult(n)),
    }
}

fn exactly_one(records: Vec<Record>) -> OrmResult<Record> {
    at_most_one(records)?.ok_or(OrmError::NoResult)
}
