//! Qualifying bare field names with the session's entity alias.

use crate::metadata::EntityMetadata;
use std::cell::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;

/// Resolves bare field names to `alias.field` for one session.
///
/// The alias and the set of qualifiable names are computed at most once.
#[derive(Debug, Clone)]
pub struct AliasResolver {
    metadata: Arc<EntityMetadata>,
    explicit: Option<String>,
    alias: OnceCell<String>,
    field_names: OnceCell<HashSet<String>>,
}

impl AliasResolver {
    pub fn new(metadata: Arc<EntityMetadata>) -> Self {
        Self {
            metadata,
            explicit: None,
            alias: OnceCell::new(),
            field_names: OnceCell::new(),
        }
    }

    /// Use `alias` instead of the derived one. Ignored once the alias has been computed.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        if self.alias.get().is_none() {
            self.explicit = Some(alias.into());
        }
        self
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    /// The session alias: explicit, else the declared alias, else the entity short name
    /// with dots removed.
    pub fn entity_alias(&self) -> &str {
        self.alias.get_or_init(|| {
            let base = self
                .explicit
                .as_deref()
                .or_else(|| self.metadata.alias())
                .unwrap_or_else(|| self.metadata.short_name());
            base.replace('.', "")
        })
    }

    /// Declared field and association names.
    pub fn field_names(&self) -> &HashSet<String> {
        self.field_names.get_or_init(|| {
            self.metadata
                .fields()
                .iter()
                .map(|f| f.name.clone())
                .chain(self.metadata.associations().iter().map(|a| a.name.clone()))
                .collect()
        })
    }

    /// `alias.name` when `name` is a bare declared field or association, else `name`.
    pub fn alias(&self, name: &str) -> String {
        if !name.contains('.') && self.field_names().contains(name) {
            format!("{}.{name}", self.entity_alias())
        } else {
            name.to_string()
        }
    }

    /// Inverse of [`alias`](Self::alias) for the session alias: `u.email` gives `email`.
    pub fn strip<'a>(&self, expr: &'a str) -> &'a str {
        expr.strip_prefix(self.entity_alias())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AssociationMeta, FieldMeta, FieldType};

    fn meta(alias: Option<&str>) -> Arc<EntityMetadata> {
        let mut builder = EntityMetadata::builder("app::BlogPost")
            .field(FieldMeta::new("status", FieldType::String))
            .association(AssociationMeta::new("author", "User"));
        if let Some(alias) = alias {
            builder = builder.alias(alias);
        }
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn qualifies_declared_names_only() {
        let resolver = AliasResolver::new(meta(Some("u")));
        assert_eq!(resolver.alias("status"), "u.status");
        assert_eq!(resolver.alias("author"), "u.author");
        assert_eq!(resolver.alias("u.status"), "u.status");
        assert_eq!(resolver.alias("1=1"), "1=1");
        assert_eq!(resolver.alias("COUNT(status)"), "COUNT(status)");
    }

    #[test]
    fn derives_alias_from_short_name() {
        let resolver = AliasResolver::new(meta(None));
        assert_eq!(resolver.entity_alias(), "BlogPost");
    }

    #[test]
    fn explicit_alias_wins_and_dots_are_removed() {
        let resolver = AliasResolver::new(meta(Some("u"))).with_alias("p.x");
        assert_eq!(resolver.entity_alias(), "px");
    }

    #[test]
    fn alias_is_computed_once() {
        let resolver = AliasResolver::new(meta(Some("u")));
        let first = resolver.entity_alias() as *const str;
        let second = resolver.entity_alias() as *const str;
        assert_eq!(first, second);
        assert_eq!(resolver.strip("u.status"), "status");
        assert_eq!(resolver.strip("x.status"), "x.status");
    }
}
