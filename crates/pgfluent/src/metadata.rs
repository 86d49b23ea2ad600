//! Entity metadata: declared fields, associations, identifier and per-field semantic types.
//!
//! Metadata records are read-only once built. They are normally generated by
//! `#[derive(Entity)]`, but can be assembled by hand:
//!
//! ```ignore
//! use pgfluent::metadata::{EntityMetadata, FieldMeta, FieldType};
//!
//! let meta = EntityMetadata::builder("User")
//!     .table("users")
//!     .alias("u")
//!     .field(FieldMeta::new("id", FieldType::BigInt).id())
//!     .field(FieldMeta::new("created_at", FieldType::DateTime))
//!     .build()?;
//! ```

mod registry;

pub use registry::MetadataRegistry;

use crate::error::{OrmError, OrmResult};
use crate::ident::Ident;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Semantic type declared for an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    SmallInt,
    Integer,
    BigInt,
    Boolean,
    Decimal,
    Float,
    Date,
    Time,
    DateTime,
    DateTimeTz,
    Guid,
    Json,
    Other,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::SmallInt => "smallint",
            FieldType::Integer => "integer",
            FieldType::BigInt => "bigint",
            FieldType::Boolean => "boolean",
            FieldType::Decimal => "decimal",
            FieldType::Float => "float",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::DateTimeTz => "datetimetz",
            FieldType::Guid => "guid",
            FieldType::Json => "json",
            FieldType::Other => "other",
        }
    }

    /// Date, time and timestamp types, which are parsed with a format string.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::Time | FieldType::DateTime | FieldType::DateTimeTz
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.to_ascii_lowercase().as_str() {
            "string" | "text" => FieldType::String,
            "smallint" => FieldType::SmallInt,
            "integer" | "int" => FieldType::Integer,
            "bigint" => FieldType::BigInt,
            "boolean" | "bool" => FieldType::Boolean,
            "decimal" | "numeric" => FieldType::Decimal,
            "float" => FieldType::Float,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "datetime" => FieldType::DateTime,
            "datetimetz" => FieldType::DateTimeTz,
            "guid" | "uuid" => FieldType::Guid,
            "json" | "jsonb" => FieldType::Json,
            "other" => FieldType::Other,
            _ => return Err(OrmError::metadata(format!("unknown field type '{s}'"))),
        };
        Ok(ty)
    }
}

/// A declared, persisted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    pub column: String,
    pub field_type: FieldType,
    pub is_id: bool,
    pub nullable: bool,
}

impl FieldMeta {
    /// A field stored in a column of the same name.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            field_type,
            is_id: false,
            nullable: false,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn id(mut self) -> Self {
        self.is_id = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A to-one association to another entity, stored as a foreign-key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationMeta {
    pub name: String,
    pub target_entity: String,
    pub target_table: String,
    pub join_column: String,
    pub referenced_column: String,
    pub nullable: bool,
}

impl AssociationMeta {
    /// Defaults: target table is the snake_cased target name, join column is `<name>_id`,
    /// and the referenced column is `id`.
    pub fn new(name: impl Into<String>, target_entity: impl Into<String>) -> Self {
        let name = name.into();
        let target_entity = target_entity.into();
        Self {
            target_table: heck::ToSnakeCase::to_snake_case(target_entity.as_str()),
            join_column: format!("{}_id", heck::ToSnakeCase::to_snake_case(name.as_str())),
            referenced_column: "id".to_string(),
            name,
            target_entity,
            nullable: false,
        }
    }

    pub fn target_table(mut self, table: impl Into<String>) -> Self {
        self.target_table = table.into();
        self
    }

    pub fn join_column(mut self, column: impl Into<String>) -> Self {
        self.join_column = column.into();
        self
    }

    pub fn references(mut self, column: impl Into<String>) -> Self {
        self.referenced_column = column.into();
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Read-only description of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    name: String,
    table: String,
    alias: Option<String>,
    fields: Vec<FieldMeta>,
    associations: Vec<AssociationMeta>,
}

impl EntityMetadata {
    pub fn builder(name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder::new(name)
    }

    /// Entity name, as written in DQL text (`SELECT u FROM User u`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without module path or namespace prefix.
    pub fn short_name(&self) -> &str {
        let tail = self.name.rsplit("::").next().unwrap_or(&self.name);
        tail.rsplit('\\').next().unwrap_or(tail)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Explicitly declared alias, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn associations(&self) -> &[AssociationMeta] {
        &self.associations
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&AssociationMeta> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn has_association(&self, name: &str) -> bool {
        self.association(name).is_some()
    }

    /// Names of the identifier fields, in declaration order.
    pub fn identifier(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.is_id)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Declared type of a field; associations and unknown names have none.
    pub fn type_of_field(&self, name: &str) -> Option<FieldType> {
        self.field(name).map(|f| f.field_type)
    }

    /// Storage column for a field or association name.
    pub fn column_for(&self, name: &str) -> Option<&str> {
        if let Some(field) = self.field(name) {
            return Some(&field.column);
        }
        self.association(name).map(|a| a.join_column.as_str())
    }
}

/// Builder for [`EntityMetadata`].
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    name: String,
    table: Option<String>,
    alias: Option<String>,
    fields: Vec<FieldMeta>,
    associations: Vec<AssociationMeta>,
}

impl EntityMetadataBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            alias: None,
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn field(mut self, field: FieldMeta) -> Self {
        self.fields.push(field);
        self
    }

    pub fn association(mut self, association: AssociationMeta) -> Self {
        self.associations.push(association);
        self
    }

    /// Validate names and produce the metadata record.
    ///
    /// The table defaults to the snake_cased short name.
    pub fn build(self) -> OrmResult<EntityMetadata> {
        if self.name.is_empty() {
            return Err(OrmError::metadata("entity name cannot be empty"));
        }
        let mut meta = EntityMetadata {
            table: String::new(),
            name: self.name,
            alias: self.alias,
            fields: self.fields,
            associations: self.associations,
        };
        meta.table = match self.table {
            Some(table) => table,
            None => heck::ToSnakeCase::to_snake_case(meta.short_name()),
        };

        Ident::parse(&meta.table)
            .map_err(|e| OrmError::metadata(format!("entity '{}': {e}", meta.name)))?;
        if let Some(alias) = &meta.alias {
            Ident::parse_alias(alias)
                .map_err(|e| OrmError::metadata(format!("entity '{}': {e}", meta.name)))?;
        }

        let mut seen = std::collections::HashSet::new();
        for name in meta
            .fields
            .iter()
            .map(|f| &f.name)
            .chain(meta.associations.iter().map(|a| &a.name))
        {
            if !seen.insert(name.as_str()) {
                return Err(OrmError::metadata(format!(
                    "entity '{}' declares '{name}' more than once",
                    meta.name
                )));
            }
        }

        Ok(meta)
    }
}

/// A persisted record type with static metadata.
///
/// Usually implemented by `#[derive(Entity)]`.
pub trait Entity {
    fn metadata() -> Arc<EntityMetadata>;
}
