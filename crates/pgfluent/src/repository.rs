//! Per-entity repository and pagination on top of [`EntityQb`].

use crate::config::QbConfig;
use crate::error::{OrmError, OrmResult};
use crate::executor::QueryExecutor;
use crate::metadata::{Entity, EntityMetadata};
use crate::qb::{AliasResolver, EntityQb};
use crate::row::{FromRecord, Record};
use crate::value::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Entry point for querying one entity type.
///
/// ```ignore
/// let repo = Repository::<Invoice>::new();
/// let newest = repo.max(&client, "issued_on").await?;
/// let page = repo.paginate(3, None)?;
/// let invoices: Vec<Invoice> = page.items(&client).await?;
/// ```
pub struct Repository<E: Entity> {
    metadata: Arc<EntityMetadata>,
    config: Arc<QbConfig>,
    max_results: i64,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            metadata: Arc::clone(&self.metadata),
            config: Arc::clone(&self.config),
            max_results: self.max_results,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new() -> Self {
        Self::from_config(Arc::new(QbConfig::default()))
    }

    /// A repository whose sessions use `config`, once it passes [`QbConfig::validate`].
    pub fn with_config(config: impl Into<Arc<QbConfig>>) -> OrmResult<Self> {
        let config = config.into();
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: Arc<QbConfig>) -> Self {
        Self {
            metadata: E::metadata(),
            max_results: config.default_max_results,
            config,
            _entity: PhantomData,
        }
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    pub fn config(&self) -> &QbConfig {
        &self.config
    }

    /// Page size used when [`paginate`](Self::paginate) is given none.
    pub fn max_results(&self) -> i64 {
        self.max_results
    }

    pub fn set_max_results(&mut self, max_results: i64) -> OrmResult<&mut Self> {
        if max_results < 1 {
            return Err(OrmError::invalid_argument(format!(
                "max results must be a positive integer, got {max_results}"
            )));
        }
        self.max_results = max_results;
        Ok(self)
    }

    /// Alias used by [`create_query_builder`](Self::create_query_builder) when none is given.
    pub fn entity_alias(&self) -> String {
        AliasResolver::new(Arc::clone(&self.metadata))
            .entity_alias()
            .to_string()
    }

    /// A session pre-populated with `SELECT alias FROM Entity alias`.
    pub fn create_query_builder(&self, alias: Option<&str>) -> EntityQb {
        let mut qb = EntityQb::new(Arc::clone(&self.metadata));
        qb.config = Arc::clone(&self.config);
        qb.select_from_entity(alias)
    }

    /// Identifier columns of every row.
    pub async fn find_all_identifiers(&self, conn: &impl QueryExecutor) -> OrmResult<Vec<Record>> {
        let identifiers = self.metadata.identifier();
        if identifiers.is_empty() {
            return Err(OrmError::metadata(format!(
                "entity '{}' declares no identifier field",
                self.metadata.name()
            )));
        }
        let qb = self.create_query_builder(None);
        let select: Vec<String> = identifiers.iter().map(|f| qb.alias(f)).collect();
        qb.select(select).fetch_all_scalar(conn).await
    }

    pub async fn min(&self, conn: &impl QueryExecutor, column: &str) -> OrmResult<Value> {
        self.aggregate(conn, "MIN", column).await
    }

    pub async fn max(&self, conn: &impl QueryExecutor, column: &str) -> OrmResult<Value> {
        self.aggregate(conn, "MAX", column).await
    }

    pub async fn sum(&self, conn: &impl QueryExecutor, column: &str) -> OrmResult<Value> {
        self.aggregate(conn, "SUM", column).await
    }

    pub async fn avg(&self, conn: &impl QueryExecutor, column: &str) -> OrmResult<Value> {
        self.aggregate(conn, "AVG", column).await
    }

    /// `SELECT FN(alias.column) AS fn_column`, single scalar.
    async fn aggregate(
        &self,
        conn: &impl QueryExecutor,
        function: &str,
        column: &str,
    ) -> OrmResult<Value> {
        if !self.metadata.has_field(column) {
            return Err(OrmError::invalid_argument(format!(
                "'{column}' is not a field of {}",
                self.metadata.short_name()
            )));
        }
        let qb = self.create_query_builder(None);
        let item = format!(
            "{function}({}) AS {}_{column}",
            qb.alias(column),
            function.to_ascii_lowercase()
        );
        qb.select([item]).fetch_single_scalar(conn).await
    }

    /// Paginator over the whole entity; `per_page` defaults to [`max_results`](Self::max_results).
    pub fn paginate(&self, page: i64, per_page: Option<i64>) -> OrmResult<Paginator> {
        let per_page = per_page.unwrap_or(self.max_results);
        Paginator::new(self.create_query_builder(None), page, per_page)
    }
}

/// One page over a query session.
///
/// `count` ignores the page window; `items` applies it.
#[derive(Debug, Clone)]
pub struct Paginator {
    query_builder: EntityQb,
    page: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(query_builder: EntityQb, page: i64, per_page: i64) -> OrmResult<Self> {
        if page < 1 {
            return Err(OrmError::invalid_argument(format!(
                "page must be a positive integer, got {page}"
            )));
        }
        if per_page < 1 {
            return Err(OrmError::invalid_argument(format!(
                "per-page must be a positive integer, got {per_page}"
            )));
        }
        Ok(Self {
            query_builder,
            page,
            per_page,
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    pub fn query_builder(&self) -> &EntityQb {
        &self.query_builder
    }

    pub fn into_query_builder(self) -> EntityQb {
        self.query_builder
    }

    pub fn set_query_builder(&mut self, query_builder: EntityQb) -> &mut Self {
        self.query_builder = query_builder;
        self
    }

    /// Total rows matching the session, ignoring the page window.
    pub fn count<'a, X: QueryExecutor>(
        &self,
        conn: &'a X,
    ) -> impl Future<Output = OrmResult<i64>> + Send + use<'a, X> {
        let query_builder = self.query_builder.clone();
        async move { query_builder.count(conn).await }
    }

    /// Entities on the current page.
    pub fn items<'a, E: FromRecord + Send, X: QueryExecutor>(
        &self,
        conn: &'a X,
    ) -> impl Future<Output = OrmResult<Vec<E>>> + Send + use<'a, E, X> {
        let window = self
            .query_builder
            .clone()
            .paginate(self.page, self.per_page);
        async move { window?.fetch_all(conn).await }
    }

    pub fn total_pages<'a, X: QueryExecutor>(
        &self,
        conn: &'a X,
    ) -> impl Future<Output = OrmResult<i64>> + Send + use<'a, X> {
        let per_page = self.per_page;
        let count = self.count(conn);
        async move {
            let total = count.await?;
            Ok((total + per_page - 1) / per_page)
        }
    }
}
