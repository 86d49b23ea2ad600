//! Dynamically named calls.
//!
//! A method name encodes an optional conjunction, a field and an operator:
//!
//! - `[and|or]<structural><Field>`: `filterByStatus`, `orWhereEmail`, `addOrderDescByCreatedAt`
//! - `[and|or]<field><Comparison>`: `priceGreaterThan`, `orDeletedAtIsNull`, `idNotIn`
//!
//! [`parse_call`] turns the name into a [`ParsedCall`] once; [`compile`] applies it to a
//! session by dispatching on the closed [`Operator`] enumeration.

mod compiler;
mod parser;

pub(crate) use compiler::compile;
pub use parser::{
    COMPARISON_OPERATORS, Conjunction, MatchMode, MethodNameParser, Operator, OperatorEntry,
    OperatorTable, ParsedCall, STRUCTURAL_OPERATORS, parse_call,
};
