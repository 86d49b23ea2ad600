use super::parser::{Operator, ParsedCall};
use crate::error::{OrmError, OrmResult};
use crate::metadata::FieldType;
use crate::qb::{CompareOp, Direction, EntityQb, Expr};
use crate::value::Value;

/// Apply a parsed call to `qb`, consuming the call arguments.
pub(crate) fn compile(
    qb: &mut EntityQb,
    method: &str,
    call: &ParsedCall,
    args: Vec<Value>,
) -> OrmResult<()> {
    tracing::debug!(
        target: "pgfluent.call",
        method,
        field = %call.field_name,
        operator = ?call.operator,
        conjunction = ?call.conjunction,
        args = args.len(),
        "compiling dynamic call"
    );

    let field = call.field_name.as_str();
    let column = qb.alias(field);
    let mut args = args.into_iter();

    let predicate = match call.operator {
        Operator::Where | Operator::FilterBy | Operator::Equal => {
            compare(qb, method, call, &column, CompareOp::Eq, args.next())?
        }
        Operator::NotEqual => compare(qb, method, call, &column, CompareOp::Ne, args.next())?,
        Operator::GreaterThan => compare(qb, method, call, &column, CompareOp::Gt, args.next())?,
        Operator::GreaterThanEqual => compare(qb, method, call, &column, CompareOp::Gte, args.next())?,
        Operator::LessThan => compare(qb, method, call, &column, CompareOp::Lt, args.next())?,
        Operator::LessThanEqual => compare(qb, method, call, &column, CompareOp::Lte, args.next())?,
        Operator::Like => pattern(qb, method, call, &column, CompareOp::Like, args.next())?,
        Operator::NotLike => pattern(qb, method, call, &column, CompareOp::NotLike, args.next())?,
        Operator::In => membership(qb, method, call, &column, false, args.next())?,
        Operator::NotIn => membership(qb, method, call, &column, true, args.next())?,
        Operator::IsNull => Expr::is_null(column),
        Operator::IsNotNull => Expr::is_not_null(column),
        Operator::IsEmpty => {
            let param = empty_string(qb);
            Expr::nested(Expr::compare(column.clone(), CompareOp::Eq, param))
                .or(Expr::nested(Expr::is_null(column)))
        }
        Operator::IsNotEmpty => {
            let param = empty_string(qb);
            Expr::nested(Expr::compare(column.clone(), CompareOp::Ne, param))
                .and(Expr::nested(Expr::is_not_null(column)))
        }
        Operator::OrderBy | Operator::AddOrderBy => {
            let direction = direction(args.next())?;
            qb.push_order(call.operator == Operator::OrderBy, field, direction);
            return Ok(());
        }
        Operator::OrderAscBy | Operator::AddOrderAscBy => {
            qb.push_order(call.operator == Operator::OrderAscBy, field, Some(Direction::Asc));
            return Ok(());
        }
        Operator::OrderDescBy | Operator::AddOrderDescBy => {
            qb.push_order(call.operator == Operator::OrderDescBy, field, Some(Direction::Desc));
            return Ok(());
        }
        Operator::GroupBy | Operator::AddGroupBy => {
            qb.push_group(call.operator == Operator::GroupBy, field);
            return Ok(());
        }
    };

    qb.attach(call.conjunction, predicate);
    Ok(())
}

fn required(method: &str, arg: Option<Value>) -> OrmResult<Value> {
    arg.ok_or_else(|| OrmError::missing_argument(method))
}

fn compare(
    qb: &mut EntityQb,
    method: &str,
    call: &ParsedCall,
    column: &str,
    op: CompareOp,
    arg: Option<Value>,
) -> OrmResult<Expr> {
    let value = required(method, arg)?;
    let param = qb.bind_argument(&call.field_name, value)?;
    Ok(Expr::compare(column, op, param))
}

/// `LIKE` / `NOT LIKE`. The pattern is bound as text without coercion, and a field that is
/// not stored as text is compared through its `::text` form.
fn pattern(
    qb: &mut EntityQb,
    method: &str,
    call: &ParsedCall,
    column: &str,
    op: CompareOp,
    arg: Option<Value>,
) -> OrmResult<Expr> {
    let value = match required(method, arg)? {
        Value::List(_) => {
            return Err(OrmError::invalid_argument(format!(
                "{method} expects a pattern string, got a list"
            )));
        }
        value @ (Value::Null | Value::String(_)) => value,
        other => Value::String(other.to_string()),
    };
    let field_type = qb.metadata().type_of_field(&call.field_name);
    let target = match field_type {
        None | Some(FieldType::String) => column.to_string(),
        Some(_) => format!("{column}::text"),
    };
    let prefix = qb.config.param_prefix.clone();
    let param = qb.params.bind(&prefix, value, Some(FieldType::String));
    Ok(Expr::compare(target, op, param))
}

/// `IN` / `NOT IN`. A scalar becomes a one-element list; an empty list still binds its
/// placeholder but compiles to a constant predicate.
fn membership(
    qb: &mut EntityQb,
    method: &str,
    call: &ParsedCall,
    column: &str,
    negated: bool,
    arg: Option<Value>,
) -> OrmResult<Expr> {
    let value = match required(method, arg)? {
        list @ Value::List(_) => list,
        scalar => Value::List(vec![scalar]),
    };
    let empty = value.is_empty();
    let param = qb.bind_argument(&call.field_name, value)?;
    Ok(match (empty, negated) {
        (true, false) => Expr::False,
        (true, true) => Expr::True,
        (false, false) => Expr::in_list(column, param),
        (false, true) => Expr::not_in(column, param),
    })
}

/// Bind `''` untyped; emptiness checks compare against the raw empty string.
fn empty_string(qb: &mut EntityQb) -> String {
    let prefix = qb.config.param_prefix.clone();
    qb.params.bind(&prefix, Value::from(""), None)
}

fn direction(arg: Option<Value>) -> OrmResult<Option<Direction>> {
    match arg {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Direction::parse(&s).map(Some),
        Some(other) => Err(OrmError::invalid_argument(format!(
            "sort direction must be a string, got {}",
            other.kind()
        ))),
    }
}
