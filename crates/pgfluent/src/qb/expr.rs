//! Predicate trees for WHERE and HAVING clauses.
//!
//! Predicates reference bound values by placeholder name (`:p0`); the values themselves
//! live in the session's [`ParamTable`](crate::qb::ParamTable). `Expr::to_dql` renders
//! entity-level text, which the renderer later turns into positional SQL.

use std::fmt;

/// Comparison operator of an atomic predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
        }
    }
}

/// Predicate node.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// AND group: all conditions must be true.
    And(Vec<Expr>),

    /// OR group: at least one condition must be true.
    Or(Vec<Expr>),

    /// NOT: negate the inner expression.
    Not(Box<Expr>),

    /// Explicitly parenthesized expression.
    Nested(Box<Expr>),

    /// `column op :param`
    Compare {
        column: String,
        op: CompareOp,
        param: String,
    },

    /// `column IS [NOT] NULL`
    NullCheck { column: String, is_null: bool },

    /// `column [NOT] IN (:param)`; the parameter holds a list.
    InList {
        column: String,
        param: String,
        negated: bool,
    },

    /// `column [NOT] BETWEEN :from AND :to`
    Between {
        column: String,
        from: String,
        to: String,
        negated: bool,
    },

    /// Caller-written condition, may reference `:name` placeholders.
    Raw(String),

    /// Always true (used for empty NOT IN lists).
    True,

    /// Always false (used for empty IN lists).
    False,
}

impl Expr {
    pub fn compare(column: impl Into<String>, op: CompareOp, param: impl Into<String>) -> Self {
        Expr::Compare {
            column: column.into(),
            op,
            param: param.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    pub fn in_list(column: impl Into<String>, param: impl Into<String>) -> Self {
        Expr::InList {
            column: column.into(),
            param: param.into(),
            negated: false,
        }
    }

    pub fn not_in(column: impl Into<String>, param: impl Into<String>) -> Self {
        Expr::InList {
            column: column.into(),
            param: param.into(),
            negated: true,
        }
    }

    pub fn between(column: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.into(),
            to: to.into(),
            negated: true,
        }
    }

    /// Open range: `column > :low AND column < :high`.
    pub fn range(column: impl Into<String>, low: impl Into<String>, high: impl Into<String>) -> Self {
        let column = column.into();
        Expr::And(vec![
            Expr::compare(column.clone(), CompareOp::Gt, low),
            Expr::compare(column, CompareOp::Lt, high),
        ])
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn nested(expr: Expr) -> Self {
        Expr::Nested(Box::new(expr))
    }

    /// `self AND other`, flattening into an existing AND group.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut children) => {
                children.push(other);
                Expr::And(children)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    /// `self OR other`, flattening into an existing OR group.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut children) => {
                children.push(other);
                Expr::Or(children)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    /// Check if this expression is empty (contains no conditions).
    pub fn is_empty(&self) -> bool {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => exprs.iter().all(Expr::is_empty),
            Expr::Not(inner) | Expr::Nested(inner) => inner.is_empty(),
            Expr::Raw(sql) => sql.trim().is_empty(),
            _ => false,
        }
    }

    /// Placeholder names referenced by structured nodes (raw text is not scanned).
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::And(exprs) | Expr::Or(exprs) => {
                for e in exprs {
                    e.collect_params(out);
                }
            }
            Expr::Not(inner) | Expr::Nested(inner) => inner.collect_params(out),
            Expr::Compare { param, .. } | Expr::InList { param, .. } => out.push(param),
            Expr::Between { from, to, .. } => {
                out.push(from);
                out.push(to);
            }
            Expr::NullCheck { .. } | Expr::Raw(_) | Expr::True | Expr::False => {}
        }
    }

    /// Render entity-level text with `:name` placeholders.
    ///
    /// Composite children are wrapped in parentheses; atoms are not.
    pub fn to_dql(&self) -> String {
        match self {
            Expr::And(exprs) => join_group(exprs, " AND "),
            Expr::Or(exprs) => join_group(exprs, " OR "),
            Expr::Not(inner) => {
                let sql = inner.to_dql();
                if sql.is_empty() {
                    String::new()
                } else {
                    format!("NOT ({sql})")
                }
            }
            Expr::Nested(inner) => {
                let sql = inner.to_dql();
                if sql.is_empty() { sql } else { format!("({sql})") }
            }
            Expr::Compare { column, op, param } => format!("{column} {} :{param}", op.as_sql()),
            Expr::NullCheck { column, is_null } => {
                if *is_null {
                    format!("{column} IS NULL")
                } else {
                    format!("{column} IS NOT NULL")
                }
            }
            Expr::InList {
                column,
                param,
                negated,
            } => {
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{column} {op} (:{param})")
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{column} {op} :{from} AND :{to}")
            }
            Expr::Raw(sql) => sql.trim().to_string(),
            Expr::True => "1=1".to_string(),
            Expr::False => "1=0".to_string(),
        }
    }
}

fn join_group(exprs: &[Expr], sep: &str) -> String {
    let parts: Vec<String> = exprs
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| {
            let sql = e.to_dql();
            let composite = match e {
                Expr::And(children) | Expr::Or(children) => {
                    children.iter().filter(|c| !c.is_empty()).count() > 1
                }
                Expr::Raw(_) => true,
                _ => false,
            };
            if composite { format!("({sql})") } else { sql }
        })
        .collect();
    parts.join(sep)
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dql())
    }
}

impl From<&str> for Expr {
    fn from(sql: &str) -> Self {
        Expr::Raw(sql.to_string())
    }
}

impl From<String> for Expr {
    fn from(sql: String) -> Self {
        Expr::Raw(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_atoms() {
        assert_eq!(
            Expr::compare("u.age", CompareOp::Gte, "p0").to_dql(),
            "u.age >= :p0"
        );
        assert_eq!(Expr::is_not_null("u.email").to_dql(), "u.email IS NOT NULL");
        assert_eq!(Expr::not_in("u.id", "p1").to_dql(), "u.id NOT IN (:p1)");
        assert_eq!(
            Expr::not_between("u.age", "lo", "hi").to_dql(),
            "u.age NOT BETWEEN :lo AND :hi"
        );
    }

    #[test]
    fn wraps_composite_children() {
        let expr = Expr::compare("u.a", CompareOp::Eq, "p0")
            .or(Expr::compare("u.b", CompareOp::Eq, "p1"))
            .and(Expr::is_null("u.c"));
        assert_eq!(expr.to_dql(), "(u.a = :p0 OR u.b = :p1) AND u.c IS NULL");
    }

    #[test]
    fn raw_children_are_parenthesized() {
        let expr = Expr::raw("u.a = 1 OR u.b = 2").and(Expr::raw("u.c = 3"));
        assert_eq!(expr.to_dql(), "(u.a = 1 OR u.b = 2) AND (u.c = 3)");
    }

    #[test]
    fn nested_atoms_keep_their_parentheses() {
        let expr = Expr::Or(vec![
            Expr::nested(Expr::compare("u.name", CompareOp::Eq, "p0")),
            Expr::nested(Expr::is_null("u.name")),
        ]);
        assert_eq!(expr.to_dql(), "(u.name = :p0) OR (u.name IS NULL)");
    }

    #[test]
    fn and_flattens_existing_group() {
        let expr = Expr::is_null("a").and(Expr::is_null("b")).and(Expr::is_null("c"));
        assert!(matches!(&expr, Expr::And(children) if children.len() == 3));
    }

    #[test]
    fn range_is_open_interval() {
        let expr = Expr::range("u.age", "p0", "p1");
        assert_eq!(expr.to_dql(), "u.age > :p0 AND u.age < :p1");
        assert_eq!(expr.params(), vec!["p0", "p1"]);
    }
}
