//! Rendering a session into DQL text and into positional Postgres SQL.
//!
//! DQL text names the entity and its fields (`SELECT u FROM User u WHERE u.createdAt > :p0`).
//! SQL translation swaps the entity for its table, `alias.field` for `alias.column`, and
//! `:name` placeholders for `$n`, expanding list values inside `IN (...)`. Tables, columns
//! and the entity alias that are reserved keywords are quoted in SQL.

use super::entity::{EntityQb, QueryKind};
use super::param::ParamTable;
use crate::error::{OrmError, OrmResult};
use crate::ident::{sql_table, sql_word};
use crate::metadata::EntityMetadata;
use crate::value::Value;
use std::collections::HashMap;
use tokio_postgres::types::ToSql;

/// The result of building a query.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl BuiltQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }
}

/// Accumulates SQL text and positional parameters.
struct SqlWriter<'a> {
    sql: String,
    params: Vec<Value>,
    bound: HashMap<String, String>,
    table: &'a ParamTable,
    metadata: &'a EntityMetadata,
    alias: &'a str,
    sql_alias: String,
}

impl<'a> SqlWriter<'a> {
    fn new(table: &'a ParamTable, metadata: &'a EntityMetadata, alias: &'a str) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            bound: HashMap::new(),
            table,
            metadata,
            alias,
            sql_alias: sql_word(alias),
        }
    }

    /// Append SQL verbatim.
    fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append DQL text, translating field references and placeholders.
    fn push_dql(&mut self, dql: &str) -> OrmResult<()> {
        let bytes = dql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            match c {
                b'\'' | b'"' => {
                    let end = skip_quoted(bytes, i, c);
                    self.sql.push_str(&dql[i..end]);
                    i = end;
                }
                b':' if bytes.get(i + 1) == Some(&b':') => {
                    self.sql.push_str("::");
                    i += 2;
                    // The cast target is a type name, never a field.
                    let end = scan_word(bytes, i);
                    self.sql.push_str(&dql[i..end]);
                    i = end;
                }
                b':' if bytes.get(i + 1).is_some_and(|b| is_ident_start(*b)) => {
                    let end = scan_word(bytes, i + 1);
                    let name = &dql[i + 1..end];
                    let expand = in_list_context(bytes, i, end);
                    let placeholder = self.bind(name, expand)?;
                    self.sql.push_str(&placeholder);
                    i = end;
                }
                b'0'..=b'9' | b'$' => {
                    let end = scan_word(bytes, i + 1);
                    self.sql.push_str(&dql[i..end]);
                    i = end;
                }
                _ if is_ident_start(c) => {
                    let end = scan_word(bytes, i);
                    let word = &dql[i..end];
                    if word == self.alias
                        && bytes.get(end) == Some(&b'.')
                        && bytes.get(end + 1).is_some_and(|b| is_ident_start(*b))
                    {
                        let field_end = scan_word(bytes, end + 1);
                        let field = &dql[end + 1..field_end];
                        let column = self.metadata.column_for(field).unwrap_or(field);
                        self.sql.push_str(&self.sql_alias);
                        self.sql.push('.');
                        self.sql.push_str(&sql_word(column));
                        i = field_end;
                    } else {
                        self.sql.push_str(word);
                        i = end;
                    }
                }
                _ => {
                    // Copy the whole (possibly multi-byte) character.
                    let ch_len = dql[i..].chars().next().map_or(1, char::len_utf8);
                    self.sql.push_str(&dql[i..i + ch_len]);
                    i += ch_len;
                }
            }
        }
        Ok(())
    }

    fn bind(&mut self, name: &str, expand: bool) -> OrmResult<String> {
        if let Some(placeholder) = self.bound.get(name) {
            return Ok(placeholder.clone());
        }
        let table = self.table;
        let value = table.value(name).ok_or_else(|| {
            OrmError::validation(format!("no value bound for parameter ':{name}'"))
        })?;
        let placeholder = match value {
            Value::List(items) if expand => {
                if items.is_empty() {
                    "NULL".to_string()
                } else {
                    let slots: Vec<String> = items
                        .iter()
                        .map(|item| {
                            self.params.push(item.clone());
                            format!("${}", self.params.len())
                        })
                        .collect();
                    slots.join(", ")
                }
            }
            other => {
                self.params.push(other.clone());
                format!("${}", self.params.len())
            }
        };
        self.bound.insert(name.to_string(), placeholder.clone());
        Ok(placeholder)
    }

    fn finish(self) -> BuiltQuery {
        BuiltQuery::new(self.sql, self.params)
    }
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    end
}

/// End index (exclusive) of a quoted run starting at `start`; doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// True when the placeholder spanning `start..end` is the sole item of an `IN ( ... )` list.
fn in_list_context(bytes: &[u8], start: usize, end: usize) -> bool {
    let before = trim_end(&bytes[..start]);
    let Some((&b'(', before)) = before.split_last() else {
        return false;
    };
    if trim_start(&bytes[end..]).first() != Some(&b')') {
        return false;
    }
    let before = trim_end(before);
    let len = before.len();
    len >= 2
        && before[len - 2..].eq_ignore_ascii_case(b"IN")
        && (len == 2 || !is_ident_char(before[len - 3]))
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let len = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &bytes[..len]
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

impl EntityQb {
    /// Entity-level text of the session, with `:name` placeholders.
    pub fn to_dql(&self) -> String {
        let meta = self.resolver.metadata();
        let alias = self.resolver.entity_alias();
        let mut dql = match self.kind {
            QueryKind::Select => {
                let mut s = String::from("SELECT ");
                if self.distinct {
                    s.push_str("DISTINCT ");
                }
                if self.select.is_empty() {
                    s.push_str(alias);
                } else {
                    s.push_str(&self.select.join(", "));
                }
                s.push_str(&format!(" FROM {} {alias}", meta.name()));
                for join in &self.joins {
                    s.push_str(&format!(" {} {} {}", join.kind.as_sql(), join.join, join.alias));
                    if let Some(condition) = &join.condition {
                        s.push_str(" WITH ");
                        s.push_str(condition);
                    }
                }
                s
            }
            QueryKind::Update => {
                let mut s = format!("UPDATE {} {alias} SET ", meta.name());
                let assignments: Vec<String> = self
                    .set
                    .iter()
                    .map(|(field, param)| format!("{field} = :{param}"))
                    .collect();
                s.push_str(&assignments.join(", "));
                s
            }
            QueryKind::Delete => format!("DELETE FROM {} {alias}", meta.name()),
        };

        if let Some(predicate) = self.where_expr.as_ref().filter(|e| !e.is_empty()) {
            dql.push_str(" WHERE ");
            dql.push_str(&predicate.to_dql());
        }
        if self.kind == QueryKind::Select {
            if !self.group_by.is_empty() {
                dql.push_str(" GROUP BY ");
                dql.push_str(&self.group_by.join(", "));
            }
            if let Some(having) = self.having_expr.as_ref().filter(|e| !e.is_empty()) {
                dql.push_str(" HAVING ");
                dql.push_str(&having.to_dql());
            }
            if !self.order_by.is_empty() {
                dql.push_str(" ORDER BY ");
                let parts: Vec<String> = self
                    .order_by
                    .iter()
                    .map(|(sort, dir)| match dir {
                        Some(dir) => format!("{sort} {}", dir.as_sql()),
                        None => sort.clone(),
                    })
                    .collect();
                dql.push_str(&parts.join(", "));
            }
        }
        dql
    }

    /// Build positional SQL and its parameters.
    pub fn build(&self) -> OrmResult<BuiltQuery> {
        let mut w = self.writer();
        match self.kind {
            QueryKind::Select => {
                self.write_select_head(&mut w)?;
                self.write_filters(&mut w)?;
                self.write_grouping(&mut w)?;
                self.write_ordering(&mut w)?;
                if let Some(max) = self.max_results {
                    w.push(&format!(" LIMIT {max}"));
                }
                if let Some(offset) = self.first_result.filter(|o| *o > 0) {
                    w.push(&format!(" OFFSET {offset}"));
                }
            }
            QueryKind::Update => {
                if self.set.is_empty() {
                    return Err(OrmError::validation("UPDATE requires at least one SET"));
                }
                let meta = self.resolver.metadata();
                let head = format!("UPDATE {} AS {} SET ", sql_table(meta.table()), w.sql_alias);
                w.push(&head);
                for (i, (field, param)) in self.set.iter().enumerate() {
                    if i > 0 {
                        w.push(", ");
                    }
                    let bare = self.resolver.strip(field);
                    w.push(&sql_word(meta.column_for(bare).unwrap_or(bare)));
                    w.push(" = ");
                    w.push_dql(&format!(":{param}"))?;
                }
                self.write_filters(&mut w)?;
            }
            QueryKind::Delete => {
                let head = format!(
                    "DELETE FROM {} AS {}",
                    sql_table(self.resolver.metadata().table()),
                    w.sql_alias
                );
                w.push(&head);
                self.write_filters(&mut w)?;
            }
        }
        Ok(w.finish())
    }

    /// Positional SQL of the session (debug helper).
    pub fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|q| q.sql)
    }

    /// Build `SELECT COUNT(*)` over the session's filters, ignoring ordering and window.
    ///
    /// Grouped or distinct selections are counted through a subquery.
    pub fn build_count(&self) -> OrmResult<BuiltQuery> {
        if self.kind != QueryKind::Select {
            return Err(OrmError::validation("COUNT requires a SELECT session"));
        }
        let mut w = self.writer();
        let grouped =
            !self.group_by.is_empty() || self.having_expr.is_some() || self.distinct;
        if grouped {
            w.push("SELECT COUNT(*) FROM (");
            self.write_select_head(&mut w)?;
            self.write_filters(&mut w)?;
            self.write_grouping(&mut w)?;
            w.push(") AS t");
        } else {
            let head = format!(
                "SELECT COUNT(*) FROM {} {}",
                sql_table(self.resolver.metadata().table()),
                w.sql_alias
            );
            w.push(&head);
            self.write_joins(&mut w)?;
            self.write_filters(&mut w)?;
        }
        Ok(w.finish())
    }

    pub fn to_count_sql(&self) -> OrmResult<String> {
        self.build_count().map(|q| q.sql)
    }

    fn writer(&self) -> SqlWriter<'_> {
        SqlWriter::new(
            &self.params,
            self.resolver.metadata(),
            self.resolver.entity_alias(),
        )
    }

    fn write_select_head(&self, w: &mut SqlWriter<'_>) -> OrmResult<()> {
        let alias = self.resolver.entity_alias();
        let all_columns = format!("{}.*", w.sql_alias);
        w.push("SELECT ");
        if self.distinct {
            w.push("DISTINCT ");
        }
        if self.select.is_empty() {
            w.push(&all_columns);
        } else {
            for (i, item) in self.select.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                if item == alias {
                    w.push(&all_columns);
                } else {
                    w.push_dql(item)?;
                }
            }
        }
        let from = format!(
            " FROM {} {}",
            sql_table(self.resolver.metadata().table()),
            w.sql_alias
        );
        w.push(&from);
        self.write_joins(w)
    }

    fn write_joins(&self, w: &mut SqlWriter<'_>) -> OrmResult<()> {
        let meta = self.resolver.metadata();
        let alias = self.resolver.entity_alias();
        for join in &self.joins {
            let keyword = join.kind.as_sql();
            let association = join
                .join
                .strip_prefix(alias)
                .and_then(|rest| rest.strip_prefix('.'))
                .and_then(|name| meta.association(name));
            match (association, &join.condition) {
                (Some(assoc), condition) => {
                    let on = format!(
                        " {keyword} {} {} ON {}.{} = {}.{}",
                        sql_table(&assoc.target_table),
                        join.alias,
                        join.alias,
                        sql_word(&assoc.referenced_column),
                        w.sql_alias,
                        sql_word(&assoc.join_column)
                    );
                    w.push(&on);
                    if let Some(condition) = condition {
                        w.push(" AND ");
                        w.push_dql(condition)?;
                    }
                }
                (None, Some(condition)) => {
                    w.push(&format!(" {keyword} {} {} ON ", join.join, join.alias));
                    w.push_dql(condition)?;
                }
                (None, None) => {
                    return Err(OrmError::validation(format!(
                        "join '{}' is not an association of '{}' and needs a condition",
                        join.join,
                        meta.short_name()
                    )));
                }
            }
        }
        Ok(())
    }

    fn write_filters(&self, w: &mut SqlWriter<'_>) -> OrmResult<()> {
        if let Some(predicate) = self.where_expr.as_ref().filter(|e| !e.is_empty()) {
            w.push(" WHERE ");
            w.push_dql(&predicate.to_dql())?;
        }
        Ok(())
    }

    fn write_grouping(&self, w: &mut SqlWriter<'_>) -> OrmResult<()> {
        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            w.push_dql(&self.group_by.join(", "))?;
        }
        if let Some(having) = self.having_expr.as_ref().filter(|e| !e.is_empty()) {
            w.push(" HAVING ");
            w.push_dql(&having.to_dql())?;
        }
        Ok(())
    }

    fn write_ordering(&self, w: &mut SqlWriter<'_>) -> OrmResult<()> {
        for (i, (sort, dir)) in self.order_by.iter().enumerate() {
            w.push(if i == 0 { " ORDER BY " } else { ", " });
            w.push_dql(sort)?;
            if let Some(dir) = dir {
                w.push(" ");
                w.push(dir.as_sql());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldMeta, FieldType};
    use std::sync::Arc;

    fn meta() -> EntityMetadata {
        EntityMetadata::builder("User")
            .table("users")
            .alias("u")
            .field(FieldMeta::new("id", FieldType::BigInt).id())
            .field(FieldMeta::new("created_at", FieldType::DateTime).column("created_on"))
            .build()
            .unwrap()
    }

    fn translate(dql: &str, params: &ParamTable) -> OrmResult<BuiltQuery> {
        let meta = meta();
        let mut w = SqlWriter::new(params, &meta, "u");
        w.push_dql(dql)?;
        Ok(w.finish())
    }

    #[test]
    fn maps_fields_to_columns_for_session_alias_only() {
        let params = ParamTable::new();
        let q = translate("u.created_at > x.created_at AND u.id = 1", &params).unwrap();
        assert_eq!(q.sql, "u.created_on > x.created_at AND u.id = 1");
    }

    #[test]
    fn numbers_placeholders_and_reuses_repeated_names() {
        let mut params = ParamTable::new();
        params.set("a", 1, None);
        params.set("b", 2, None);
        let q = translate("u.id = :b OR u.id = :a OR u.id > :b", &params).unwrap();
        assert_eq!(q.sql, "u.id = $1 OR u.id = $2 OR u.id > $1");
        assert_eq!(q.params, vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn leaves_literals_and_casts_alone() {
        let mut params = ParamTable::new();
        params.set("p0", "x", None);
        let q = translate("u.id::text = ':p0' AND u.created_at::date = :p0", &params).unwrap();
        assert_eq!(q.sql, "u.id::text = ':p0' AND u.created_on::date = $1");
    }

    #[test]
    fn expands_lists_inside_parentheses() {
        let mut params = ParamTable::new();
        params.set("ids", vec![1, 2, 3], None);
        params.set("none", Vec::<i64>::new(), None);
        let q = translate("u.id IN (:ids) AND u.id NOT IN ( :none )", &params).unwrap();
        assert_eq!(q.sql, "u.id IN ($1, $2, $3) AND u.id NOT IN ( NULL )");
        assert_eq!(q.params.len(), 3);

        let q = translate("u.id = ANY(:ids)", &params).unwrap();
        assert_eq!(q.sql, "u.id = ANY($1)");
    }

    #[test]
    fn missing_parameter_is_a_validation_error() {
        let params = ParamTable::new();
        let err = translate("u.id = :missing", &params).unwrap_err();
        assert!(matches!(err, OrmError::Validation(ref m) if m.contains(":missing")));
    }

    #[test]
    fn count_wraps_grouped_sessions() {
        let qb = EntityQb::new(Arc::new(meta()))
            .select_from_entity(None)
            .group_by(["created_at"]);
        assert_eq!(
            qb.to_count_sql().unwrap(),
            "SELECT COUNT(*) FROM (SELECT u.* FROM users u GROUP BY u.created_on) AS t"
        );
    }
}
