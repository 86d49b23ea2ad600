//! Connections a query session can run on.

use crate::error::OrmResult;
use crate::qb::BuiltQuery;
use std::future::Future;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A plain connection or a transaction.
///
/// Every `GenericClient` is a [`QueryExecutor`](crate::QueryExecutor), so terminal session
/// methods take either one.
pub trait GenericClient: Send + Sync {
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Run a rendered session and return its raw rows.
    fn query_built(&self, query: &BuiltQuery) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        async move { self.query(&query.sql, &query.params_ref()).await }
    }

    fn execute_built(&self, query: &BuiltQuery) -> impl Future<Output = OrmResult<u64>> + Send {
        async move { self.execute(&query.sql, &query.params_ref()).await }
    }
}

macro_rules! impl_generic_client {
    ($($ty:ty),+) => {
        $(
            impl GenericClient for $ty {
                async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
                    Ok(<$ty>::query(self, sql, params).await?)
                }

                async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
                    Ok(<$ty>::execute(self, sql, params).await?)
                }
            }
        )+
    };
}

impl_generic_client!(tokio_postgres::Client, tokio_postgres::Transaction<'_>);
