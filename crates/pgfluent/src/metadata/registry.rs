use super::{Entity, EntityMetadata};
use crate::error::{OrmError, OrmResult};
use crate::qb::EntityQb;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of entity metadata, keyed by entity name.
///
/// Lets callers that only know an entity by name (routing tables, admin tooling)
/// start a query session for it.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: HashMap<String, Arc<EntityMetadata>>,
}

impl MetadataRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type by its derived metadata.
    pub fn register<E: Entity>(&mut self) -> OrmResult<()> {
        self.insert(E::metadata())
    }

    /// Register a metadata record. Names must be unique.
    pub fn insert(&mut self, metadata: Arc<EntityMetadata>) -> OrmResult<()> {
        let name = metadata.short_name().to_string();
        if self.entities.contains_key(&name) {
            return Err(OrmError::metadata(format!(
                "entity '{name}' is already registered"
            )));
        }
        self.entities.insert(name, metadata);
        Ok(())
    }

    /// Look up an entity by name; both `User` and `app::model::User` resolve.
    pub fn get(&self, name: &str) -> OrmResult<Arc<EntityMetadata>> {
        let short = name.rsplit("::").next().unwrap_or(name);
        self.entities
            .get(short)
            .cloned()
            .ok_or_else(|| OrmError::metadata(format!("unknown entity '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate registered entity names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Start a query session selecting the named entity.
    pub fn query_builder(&self, name: &str) -> OrmResult<EntityQb> {
        Ok(EntityQb::new(self.get(name)?).select_from_entity(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldMeta, FieldType};

    fn meta(name: &str) -> Arc<EntityMetadata> {
        Arc::new(
            EntityMetadata::builder(name)
                .field(FieldMeta::new("id", FieldType::BigInt).id())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn looks_up_by_short_or_qualified_name() {
        let mut registry = MetadataRegistry::new();
        registry.insert(meta("app::Invoice")).unwrap();
        assert!(registry.contains("Invoice"));
        assert!(registry.contains("billing::Invoice"));
        assert!(matches!(registry.get("Order"), Err(OrmError::Metadata(_))));
    }

    #[test]
    fn rejects_duplicate_registration() {
        let mut registry = MetadataRegistry::new();
        registry.insert(meta("Invoice")).unwrap();
        assert!(registry.insert(meta("Invoice")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn query_builder_selects_entity() {
        let mut registry = MetadataRegistry::new();
        registry.insert(meta("Invoice")).unwrap();
        let qb = registry.query_builder("Invoice").unwrap();
        assert_eq!(qb.to_dql(), "SELECT Invoice FROM Invoice Invoice");
    }
}
