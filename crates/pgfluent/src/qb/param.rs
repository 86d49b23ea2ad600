//! Named parameter storage and collision-free placeholder allocation.

use crate::metadata::FieldType;
use crate::value::Value;
use std::collections::BTreeMap;

/// A named parameter bound to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: Value,
    field_type: Option<FieldType>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: normalize(name.into()),
            value: value.into(),
            field_type: None,
        }
    }

    pub fn typed(name: impl Into<String>, value: impl Into<Value>, field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::new(name, value)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }
}

/// One entry handed to `EntityQb::append_parameters`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamBinding {
    /// A bare value, bound under the entry's key.
    Value(Value),
    /// A value with an explicit declared type, bound under the entry's key.
    Typed(Value, FieldType),
    /// A full descriptor; its own name wins over the entry's key.
    Descriptor(Parameter),
}

impl ParamBinding {
    pub fn value(value: impl Into<Value>) -> Self {
        ParamBinding::Value(value.into())
    }

    pub fn typed(value: impl Into<Value>, field_type: FieldType) -> Self {
        ParamBinding::Typed(value.into(), field_type)
    }
}

impl From<Value> for ParamBinding {
    fn from(value: Value) -> Self {
        ParamBinding::Value(value)
    }
}

impl From<(Value, FieldType)> for ParamBinding {
    fn from((value, field_type): (Value, FieldType)) -> Self {
        ParamBinding::Typed(value, field_type)
    }
}

impl From<Parameter> for ParamBinding {
    fn from(parameter: Parameter) -> Self {
        ParamBinding::Descriptor(parameter)
    }
}

/// The parameter table of one session.
///
/// Names are stored without the leading `:`. Every name handed out by [`allocate`]
/// is registered at once, so it cannot be handed out again for this table's lifetime.
///
/// [`allocate`]: ParamTable::allocate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTable {
    entries: BTreeMap<String, Parameter>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name.trim_start_matches(':'))
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.entries.get(name.trim_start_matches(':'))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(Parameter::value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.entries.values()
    }

    /// Bind `value` under `name`, replacing any previous binding.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>, field_type: Option<FieldType>) {
        let mut parameter = Parameter::new(name, value);
        parameter.field_type = field_type;
        self.insert(parameter);
    }

    pub fn insert(&mut self, parameter: Parameter) {
        self.entries.insert(parameter.name.clone(), parameter);
    }

    /// Return the first unused name `base0`, `base1`, ... and reserve it.
    ///
    /// The reserved slot holds `NULL` until a value is set.
    pub fn allocate(&mut self, base: &str) -> String {
        let name = (0usize..)
            .map(|i| format!("{base}{i}"))
            .find(|candidate| !self.entries.contains_key(candidate))
            .unwrap_or_else(|| format!("{base}{}", self.entries.len()));
        self.entries
            .insert(name.clone(), Parameter::new(name.clone(), Value::Null));
        tracing::trace!(target: "pgfluent.param", name = %name, "allocated placeholder");
        name
    }

    /// Allocate a name under `base` and bind `value` to it; returns the bare name.
    pub fn bind(&mut self, base: &str, value: impl Into<Value>, field_type: Option<FieldType>) -> String {
        let name = self.allocate(base);
        self.set(name.clone(), value, field_type);
        name
    }

    /// Merge bindings, each keyed by name unless it carries its own descriptor.
    pub fn append<K, B>(&mut self, bindings: impl IntoIterator<Item = (K, B)>)
    where
        K: Into<String>,
        B: Into<ParamBinding>,
    {
        for (key, binding) in bindings {
            match binding.into() {
                ParamBinding::Value(value) => self.set(key, value, None),
                ParamBinding::Typed(value, field_type) => self.set(key, value, Some(field_type)),
                ParamBinding::Descriptor(parameter) => self.insert(parameter),
            }
        }
    }
}

fn normalize(name: String) -> String {
    match name.strip_prefix(':') {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequential_names() {
        let mut params = ParamTable::new();
        let names: Vec<String> = (0..3).map(|_| params.allocate("p")).collect();
        assert_eq!(names, vec!["p0", "p1", "p2"]);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn skips_names_already_bound() {
        let mut params = ParamTable::new();
        params.set("p0", 1, None);
        params.set(":p2", 2, None);
        assert_eq!(params.allocate("p"), "p1");
        assert_eq!(params.allocate("p"), "p3");
        assert_eq!(params.allocate("status"), "status0");
    }

    #[test]
    fn reserved_slot_is_null_until_set() {
        let mut params = ParamTable::new();
        let name = params.allocate("p");
        assert_eq!(params.value(&name), Some(&Value::Null));
        let bound = params.bind("p", "x", Some(FieldType::String));
        assert_eq!(bound, "p1");
        assert_eq!(params.get(":p1").unwrap().field_type(), Some(FieldType::String));
    }

    #[test]
    fn append_accepts_all_binding_forms() {
        let mut params = ParamTable::new();
        params.append([
            ("a", ParamBinding::value(1)),
            ("b", ParamBinding::typed("2024-01-01", FieldType::Date)),
            ("ignored", Parameter::new(":c", true).into()),
        ]);
        assert_eq!(params.value("a"), Some(&Value::Int(1)));
        assert_eq!(params.get("b").unwrap().field_type(), Some(FieldType::Date));
        assert_eq!(params.value("c"), Some(&Value::Bool(true)));
        assert!(!params.contains("ignored"));
    }
}
