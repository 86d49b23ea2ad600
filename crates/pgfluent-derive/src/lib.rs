//! Derive macros for pgfluent
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRecord)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod common;
mod entity;
mod from_record;

/// Derive `Entity` metadata (and `FromRecord`) for a struct.
///
/// # Example
///
/// ```ignore
/// use pgfluent::prelude::*;
///
/// #[derive(Entity)]
/// #[orm(table = "orders", alias = "o")]
/// struct Order {
///     #[orm(id)]
///     id: i64,
///     status: String,
///     #[orm(column = "placed_on")]
///     created_at: NaiveDateTime,
///     #[orm(association = "Customer", target_table = "customers")]
///     customer: Option<i64>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name", alias = "o")]` - Table name (default: snake_cased struct name) and
///   query alias (default: struct name)
/// - `#[orm(id)]` - Mark field as identifier
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(field_type = "datetimetz")]` - Override the type inferred from the Rust type
/// - `#[orm(association = "Target", target_table = "...", references = "...")]` - Declare the
///   field as a to-one association; `column` then names the join column
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRecord` for a struct, reading each field from the column of the same name.
///
/// # Example
///
/// ```ignore
/// #[derive(FromRecord)]
/// struct Totals {
///     status: String,
///     #[orm(column = "n")]
///     count: i64,
/// }
/// ```
#[proc_macro_derive(FromRecord, attributes(orm))]
pub fn derive_from_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
