//! Entity query sessions.
//!
//! An [`EntityQb`] is bound to one entity. Field arguments are alias-qualified, values
//! are bound to named placeholders, and a terminal call renders the session into
//! positional Postgres SQL.
//!
//! # Usage
//!
//! ```ignore
//! use pgfluent::prelude::*;
//!
//! // Explicit API
//! let active = EntityQb::for_entity::<User>()
//!     .select_from_entity(Some("u"))
//!     .and_where(Expr::compare("u.status", CompareOp::Eq, "status"))
//!     .set_parameter("status", "active")
//!     .order_desc("created_at")
//!     .fetch_all::<User>(&client)
//!     .await?;
//!
//! // Dynamically named calls
//! let recent = EntityQb::for_entity::<User>()
//!     .select_from_entity(Some("u"))
//!     .call("createdAtGreaterThan", args!["2024-01-01 00:00:00"])?
//!     .call("orStatusEqual", args!["vip"])?
//!     .call("orderDescByCreatedAt", args![])?
//!     .paginate(1, 20)?
//!     .fetch_all::<User>(&client)
//!     .await?;
//! ```

mod alias;
mod entity;
mod expr;
mod fetch;
mod param;
mod render;

pub use alias::AliasResolver;
pub use entity::{Direction, EntityQb, JoinKind, QueryKind};
pub use expr::{CompareOp, Expr};
pub use param::{ParamBinding, ParamTable, Parameter};
pub use render::BuiltQuery;
