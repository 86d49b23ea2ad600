//! # pgfluent
//!
//! Fluent query building over entity metadata for PostgreSQL.
//!
//! ## Features
//!
//! - **Entity sessions**: [`EntityQb`] binds a query to one entity and qualifies bare field
//!   names with the session alias
//! - **Dynamically named calls**: `filterByStatus`, `orPriceGreaterThan`,
//!   `addOrderDescByCreatedAt` are parsed once and compiled into the predicate tree
//! - **Typed arguments**: call arguments are coerced to the declared field type before binding
//! - **Named placeholders**: every value gets its own `:pN` placeholder; rendering turns them
//!   into positional `$n` parameters
//! - **Transaction-friendly**: terminal calls take any [`QueryExecutor`], including
//!   `tokio_postgres::Transaction`
//!
//! ## Usage
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! #[derive(Entity)]
//! #[orm(table = "orders", alias = "o")]
//! struct Order {
//!     #[orm(id)]
//!     id: i64,
//!     status: String,
//!     amount: Decimal,
//!     created_at: NaiveDateTime,
//! }
//!
//! let big = EntityQb::for_entity::<Order>()
//!     .select_from_entity(None)
//!     .call("statusIn", args![vec!["paid", "shipped"]])?
//!     .call("andAmountGreaterThanEqual", args!["100.00"])?
//!     .call("orderDescByCreatedAt", args![])?
//!     .limit(20, None)?
//!     .fetch_all::<Order>(&client)
//!     .await?;
//! ```

pub mod client;
pub mod coerce;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod executor;
pub mod ident;
pub mod metadata;
pub mod prelude;
pub mod qb;
pub mod repository;
pub mod row;
pub mod value;

pub use client::GenericClient;
pub use coerce::FieldTypeCoercer;
pub use config::QbConfig;
pub use dynamic::{Conjunction, MethodNameParser, Operator, ParsedCall};
pub use error::{OrmError, OrmResult};
pub use executor::{HydrationMode, QueryExecutor};
pub use ident::Ident;
pub use metadata::{
    AssociationMeta, Entity, EntityMetadata, EntityMetadataBuilder, FieldMeta, FieldType,
    MetadataRegistry,
};
pub use qb::{
    AliasResolver, BuiltQuery, CompareOp, Direction, EntityQb, Expr, JoinKind, ParamBinding,
    ParamTable, Parameter, QueryKind,
};
pub use repository::{Paginator, Repository};
pub use row::{FromRecord, FromValue, Record};
pub use value::Value;

#[cfg(feature = "derive")]
pub use pgfluent_derive::{Entity, FromRecord};

