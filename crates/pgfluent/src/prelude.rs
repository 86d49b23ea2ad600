//! Convenient imports for typical `pgfluent` usage.
//!
//! ```ignore
//! use pgfluent::prelude::*;
//! ```

pub use crate::{
    CompareOp, Direction, Entity, EntityQb, Expr, FieldType, FromRecord, GenericClient,
    HydrationMode, OrmError, OrmResult, QbConfig, QueryExecutor, Record, Repository, Value, args,
};

pub use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
pub use rust_decimal::Decimal;
