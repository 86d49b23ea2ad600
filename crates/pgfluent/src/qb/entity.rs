//! `EntityQb`: the chainable query session bound to one entity.

use super::alias::AliasResolver;
use super::expr::Expr;
use super::param::{ParamBinding, ParamTable};
use crate::coerce::FieldTypeCoercer;
use crate::config::QbConfig;
use crate::dynamic::{self, Conjunction};
use crate::error::{OrmError, OrmResult};
use crate::metadata::{Entity, EntityMetadata, FieldType};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Statement kind of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Update,
    Delete,
}

/// Sort direction of one ordering entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// Parse `asc` / `desc` in any case.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(OrmError::invalid_argument(format!(
                "sort direction must be ASC or DESC, got '{s}'"
            )))
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Join {
    pub(crate) kind: JoinKind,
    /// `alias.association` or a table name.
    pub(crate) join: String,
    pub(crate) alias: String,
    pub(crate) condition: Option<String>,
}

/// A query session over one entity.
///
/// Field arguments of the explicit API are alias-qualified when they name a declared
/// field or association; anything else (`COUNT(u.id)`, `a.name`, `1=1`) passes through.
///
/// ```ignore
/// let qb = EntityQb::for_entity::<User>()
///     .select_from_entity(Some("u"))
///     .call("statusEqual", args!["active"])?
///     .call("orderDescByCreatedAt", args![])?
///     .paginate(2, 20)?;
/// let users: Vec<User> = qb.fetch_all(&client).await?;
/// ```
#[derive(Debug, Clone)]
pub struct EntityQb {
    pub(crate) config: Arc<QbConfig>,
    pub(crate) resolver: AliasResolver,
    pub(crate) kind: QueryKind,
    pub(crate) select: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) joins: Vec<Join>,
    pub(crate) where_expr: Option<Expr>,
    pub(crate) having_expr: Option<Expr>,
    pub(crate) group_by: Vec<String>,
    pub(crate) order_by: Vec<(String, Option<Direction>)>,
    pub(crate) set: Vec<(String, String)>,
    pub(crate) params: ParamTable,
    pub(crate) max_results: Option<u64>,
    pub(crate) first_result: Option<u64>,
}

impl EntityQb {
    /// Start an empty session bound to `metadata`.
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self {
            config: Arc::new(QbConfig::default()),
            resolver: AliasResolver::new(metadata),
            kind: QueryKind::Select,
            select: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            where_expr: None,
            having_expr: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            set: Vec::new(),
            params: ParamTable::new(),
            max_results: None,
            first_result: None,
        }
    }

    pub fn for_entity<E: Entity>() -> Self {
        Self::new(E::metadata())
    }

    /// Replace the session's configuration after checking it with [`QbConfig::validate`].
    pub fn with_config(mut self, config: impl Into<Arc<QbConfig>>) -> OrmResult<Self> {
        let config = config.into();
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &QbConfig {
        &self.config
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        self.resolver.metadata()
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    /// `SELECT alias FROM Entity alias`, optionally overriding the alias.
    ///
    /// The override only applies while nothing has resolved the alias yet.
    pub fn select_from_entity(mut self, alias: Option<&str>) -> Self {
        if let Some(alias) = alias {
            self.resolver = self.resolver.with_alias(alias);
        }
        self.kind = QueryKind::Select;
        self.select = vec![self.resolver.entity_alias().to_string()];
        self
    }

    /// Make the session a SELECT over the entity, keeping the current select list.
    pub fn from_entity(mut self) -> Self {
        self.kind = QueryKind::Select;
        if self.select.is_empty() {
            self.select = vec![self.resolver.entity_alias().to_string()];
        }
        self
    }

    // ==================== Selection ====================

    /// Replace the select list.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.kind = QueryKind::Select;
        self.select = fields.into_iter().map(|f| self.alias(f.as_ref())).collect();
        self
    }

    pub fn add_select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added: Vec<String> = fields.into_iter().map(|f| self.alias(f.as_ref())).collect();
        self.select.extend(added);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    // ==================== Joins ====================

    /// Join an association (`author` or `u.author`) under `alias`.
    pub fn inner_join(self, association: &str, alias: &str) -> Self {
        self.push_join(JoinKind::Inner, association, alias, None)
    }

    pub fn left_join(self, association: &str, alias: &str) -> Self {
        self.push_join(JoinKind::Left, association, alias, None)
    }

    /// Join a table or association with an explicit condition.
    pub fn inner_join_on(self, join: &str, alias: &str, condition: &str) -> Self {
        self.push_join(JoinKind::Inner, join, alias, Some(condition))
    }

    pub fn left_join_on(self, join: &str, alias: &str, condition: &str) -> Self {
        self.push_join(JoinKind::Left, join, alias, Some(condition))
    }

    fn push_join(mut self, kind: JoinKind, join: &str, alias: &str, condition: Option<&str>) -> Self {
        let join = Join {
            kind,
            join: self.alias(join),
            alias: alias.to_string(),
            condition: condition.map(str::to_string),
        };
        self.joins.push(join);
        self
    }

    // ==================== Predicates ====================

    /// Replace the WHERE predicate.
    pub fn where_(mut self, predicate: impl Into<Expr>) -> Self {
        self.where_expr = Some(predicate.into());
        self
    }

    pub fn and_where(mut self, predicate: impl Into<Expr>) -> Self {
        self.attach(Conjunction::And, predicate.into());
        self
    }

    pub fn or_where(mut self, predicate: impl Into<Expr>) -> Self {
        self.attach(Conjunction::Or, predicate.into());
        self
    }

    pub fn having(mut self, predicate: impl Into<Expr>) -> Self {
        self.having_expr = Some(predicate.into());
        self
    }

    pub fn and_having(mut self, predicate: impl Into<Expr>) -> Self {
        self.having_expr = Some(combine(self.having_expr.take(), predicate.into(), Conjunction::And));
        self
    }

    pub fn or_having(mut self, predicate: impl Into<Expr>) -> Self {
        self.having_expr = Some(combine(self.having_expr.take(), predicate.into(), Conjunction::Or));
        self
    }

    pub(crate) fn attach(&mut self, conjunction: Conjunction, predicate: Expr) {
        self.where_expr = Some(combine(self.where_expr.take(), predicate, conjunction));
    }

    // ==================== Ordering & grouping ====================

    /// Replace the ordering with one entry.
    pub fn order_by(mut self, sort: &str, direction: Option<Direction>) -> Self {
        self.push_order(true, sort, direction);
        self
    }

    pub fn add_order_by(mut self, sort: &str, direction: Option<Direction>) -> Self {
        self.push_order(false, sort, direction);
        self
    }

    pub fn order_asc(self, sort: &str) -> Self {
        self.order_by(sort, Some(Direction::Asc))
    }

    pub fn order_desc(self, sort: &str) -> Self {
        self.order_by(sort, Some(Direction::Desc))
    }

    pub fn add_order_asc_by(self, sort: &str) -> Self {
        self.add_order_by(sort, Some(Direction::Asc))
    }

    pub fn add_order_desc_by(self, sort: &str) -> Self {
        self.add_order_by(sort, Some(Direction::Desc))
    }

    pub(crate) fn push_order(&mut self, replace: bool, sort: &str, direction: Option<Direction>) {
        let entry = (self.alias(sort), direction);
        if replace {
            self.order_by.clear();
        }
        self.order_by.push(entry);
    }

    /// Replace the grouping list.
    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_by.clear();
        for field in fields {
            self.push_group(false, field.as_ref());
        }
        self
    }

    pub fn add_group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            self.push_group(false, field.as_ref());
        }
        self
    }

    pub(crate) fn push_group(&mut self, replace: bool, field: &str) {
        let entry = self.alias(field);
        if replace {
            self.group_by.clear();
        }
        self.group_by.push(entry);
    }

    // ==================== Update / delete ====================

    /// Turn the session into an UPDATE of the entity.
    pub fn update(mut self) -> Self {
        self.kind = QueryKind::Update;
        self
    }

    /// Turn the session into a DELETE of the entity.
    pub fn delete(mut self) -> Self {
        self.kind = QueryKind::Delete;
        self
    }

    /// `SET field = value`; also switches the session to UPDATE.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        let key = self.alias(field);
        let field_type = self.metadata().type_of_field(self.resolver.strip(&key));
        let prefix = self.config.param_prefix.clone();
        let name = self.params.bind(&prefix, value, field_type);
        self.kind = QueryKind::Update;
        self.set.push((key, name));
        self
    }

    // ==================== Window ====================

    /// Limit the result window; `max` must be at least 1 and `offset` non-negative.
    ///
    /// Without an offset the current first result is kept.
    pub fn limit(mut self, max: i64, offset: Option<i64>) -> OrmResult<Self> {
        if max < 1 {
            return Err(OrmError::invalid_argument(format!(
                "max results must be a positive integer, got {max}"
            )));
        }
        if let Some(offset) = offset {
            if offset < 0 {
                return Err(OrmError::invalid_argument(format!(
                    "offset must be a non-negative integer, got {offset}"
                )));
            }
            self.first_result = Some(offset.unsigned_abs());
        }
        self.max_results = Some(max.unsigned_abs());
        Ok(self)
    }

    /// `limit(per_page, (page - 1) * per_page)`.
    pub fn paginate(self, page: i64, per_page: i64) -> OrmResult<Self> {
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
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| OrmError::invalid_argument("page offset overflows"))?;
        self.limit(per_page, Some(offset))
    }

    /// Paginate with the configured default page size.
    pub fn paginate_default(self, page: i64) -> OrmResult<Self> {
        let per_page = self.config.default_per_page;
        self.paginate(page, per_page)
    }

    // ==================== Parameters ====================

    pub fn set_parameter(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.set(name, value, None);
        self
    }

    pub fn set_typed_parameter(mut self, name: &str, value: impl Into<Value>, field_type: FieldType) -> Self {
        self.params.set(name, value, Some(field_type));
        self
    }

    /// Bind many parameters at once; see [`ParamBinding`] for the accepted forms.
    pub fn append_parameters<K, B>(mut self, bindings: impl IntoIterator<Item = (K, B)>) -> Self
    where
        K: Into<String>,
        B: Into<ParamBinding>,
    {
        self.params.append(bindings);
        self
    }

    /// Bind `value` under a fresh placeholder and return it as `:name` for raw fragments.
    pub fn param(&mut self, value: impl Into<Value>, field_type: Option<FieldType>) -> String {
        let prefix = self.config.param_prefix.clone();
        self.param_named(&prefix, value, field_type)
    }

    /// Like [`param`](Self::param) with a caller-chosen base name.
    pub fn param_named(&mut self, base: &str, value: impl Into<Value>, field_type: Option<FieldType>) -> String {
        format!(":{}", self.params.bind(base, value, field_type))
    }

    // ==================== Resolution ====================

    /// `alias.name` for a bare declared field or association, else `name`.
    pub fn alias(&self, name: &str) -> String {
        self.resolver.alias(name)
    }

    pub fn entity_alias(&self) -> &str {
        self.resolver.entity_alias()
    }

    pub fn field_names(&self) -> &HashSet<String> {
        self.resolver.field_names()
    }

    /// Coerce `value` to the declared type of `field`.
    pub fn type_cast_field(
        &self,
        field: &str,
        value: impl Into<Value>,
        format: Option<&str>,
        skip_temporal_cast: bool,
    ) -> OrmResult<Value> {
        FieldTypeCoercer::new(self.metadata(), &self.config).coerce(
            field,
            value.into(),
            format,
            skip_temporal_cast,
        )
    }

    /// Coerce (when enabled) and bind a dynamic-call argument for `field`.
    pub(crate) fn bind_argument(&mut self, field: &str, value: Value) -> OrmResult<String> {
        let value = if self.config.coerce_arguments {
            self.type_cast_field(field, value, None, false)?
        } else {
            value
        };
        let field_type = self.metadata().type_of_field(field);
        let prefix = self.config.param_prefix.clone();
        Ok(self.params.bind(&prefix, value, field_type))
    }

    // ==================== Dynamic calls ====================

    /// Compile a dynamically named call such as `orPriceGreaterThan` or `filterByStatus`.
    pub fn call(mut self, method: &str, args: Vec<Value>) -> OrmResult<Self> {
        self.apply(method, args)?;
        Ok(self)
    }

    /// In-place form of [`call`](Self::call).
    pub fn apply(&mut self, method: &str, args: Vec<Value>) -> OrmResult<&mut Self> {
        let parsed = dynamic::parse_call(self.metadata(), method, args.len())?;
        dynamic::compile(self, method, &parsed, args)?;
        Ok(self)
    }

    // ==================== Introspection ====================

    pub fn predicate(&self) -> Option<&Expr> {
        self.where_expr.as_ref()
    }

    pub fn having_predicate(&self) -> Option<&Expr> {
        self.having_expr.as_ref()
    }

    pub fn select_entries(&self) -> &[String] {
        &self.select
    }

    pub fn order_by_entries(&self) -> &[(String, Option<Direction>)] {
        &self.order_by
    }

    pub fn group_by_entries(&self) -> &[String] {
        &self.group_by
    }

    pub fn parameters(&self) -> &ParamTable {
        &self.params
    }

    pub fn max_results(&self) -> Option<u64> {
        self.max_results
    }

    pub fn first_result(&self) -> Option<u64> {
        self.first_result
    }
}

fn combine(existing: Option<Expr>, predicate: Expr, conjunction: Conjunction) -> Expr {
    match (existing, conjunction) {
        (None, _) => predicate,
        (Some(existing), Conjunction::Or) => existing.or(predicate),
        (Some(existing), Conjunction::And | Conjunction::None) => existing.and(predicate),
    }
}
