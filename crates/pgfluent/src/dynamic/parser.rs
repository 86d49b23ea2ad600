use crate::error::{OrmError, OrmResult};
use crate::metadata::EntityMetadata;
use heck::{ToLowerCamelCase, ToSnakeCase};
use std::borrow::Cow;

/// Logical connective recorded from an `and` / `or` method-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conjunction {
    And,
    Or,
    /// No prefix; attaches like `And`.
    None,
}

/// Every operator the dynamic grammar knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Where,
    FilterBy,
    OrderBy,
    OrderAscBy,
    OrderDescBy,
    AddOrderBy,
    AddOrderAscBy,
    AddOrderDescBy,
    GroupBy,
    AddGroupBy,
    GreaterThanEqual,
    GreaterThan,
    LessThanEqual,
    LessThan,
    NotEqual,
    Equal,
    NotIn,
    In,
    NotLike,
    Like,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
}

impl Operator {
    /// Whether the operator lives in the structural (prefix) table.
    pub fn is_structural(self) -> bool {
        STRUCTURAL_OPERATORS.entry(self).is_some()
    }

    pub fn requires_argument(self) -> bool {
        STRUCTURAL_OPERATORS
            .entry(self)
            .or_else(|| COMPARISON_OPERATORS.entry(self))
            .is_some_and(|e| e.requires_argument)
    }
}

/// Where the operator keyword sits in the method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Keyword first, field after: `filterByStatus`.
    Prefix,
    /// Field first, keyword last: `statusEqual`.
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorEntry {
    pub keyword: &'static str,
    pub operator: Operator,
    pub requires_argument: bool,
}

const fn entry(keyword: &'static str, operator: Operator, requires_argument: bool) -> OperatorEntry {
    OperatorEntry {
        keyword,
        operator,
        requires_argument,
    }
}

/// An ordered operator table. Entries are tried in declaration order, so longer keywords
/// sharing a tail or head with shorter ones come first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorTable {
    pub mode: MatchMode,
    pub entries: &'static [OperatorEntry],
}

impl OperatorTable {
    pub fn entry(&self, operator: Operator) -> Option<&'static OperatorEntry> {
        self.entries.iter().find(|e| e.operator == operator)
    }
}

pub const STRUCTURAL_OPERATORS: OperatorTable = OperatorTable {
    mode: MatchMode::Prefix,
    entries: &[
        entry("where", Operator::Where, true),
        entry("filterBy", Operator::FilterBy, true),
        entry("orderBy", Operator::OrderBy, false),
        entry("orderAscBy", Operator::OrderAscBy, false),
        entry("orderDescBy", Operator::OrderDescBy, false),
        entry("addOrderBy", Operator::AddOrderBy, false),
        entry("addOrderAscBy", Operator::AddOrderAscBy, false),
        entry("addOrderDescBy", Operator::AddOrderDescBy, false),
        entry("groupBy", Operator::GroupBy, false),
        entry("addGroupBy", Operator::AddGroupBy, false),
    ],
};

pub const COMPARISON_OPERATORS: OperatorTable = OperatorTable {
    mode: MatchMode::Suffix,
    entries: &[
        entry("GreaterThanEqual", Operator::GreaterThanEqual, true),
        entry("GreaterThan", Operator::GreaterThan, true),
        entry("LessThanEqual", Operator::LessThanEqual, true),
        entry("LessThan", Operator::LessThan, true),
        entry("NotEqual", Operator::NotEqual, true),
        entry("Equal", Operator::Equal, true),
        entry("NotIn", Operator::NotIn, true),
        entry("In", Operator::In, true),
        entry("NotLike", Operator::NotLike, true),
        entry("Like", Operator::Like, true),
        entry("IsNull", Operator::IsNull, false),
        entry("IsNotNull", Operator::IsNotNull, false),
        entry("IsEmpty", Operator::IsEmpty, false),
        entry("IsNotEmpty", Operator::IsNotEmpty, false),
    ],
};

/// A method name broken into its parts. The field name is the declared one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub conjunction: Conjunction,
    pub field_name: String,
    pub operator: Operator,
}

/// Parses method names against one entity's declared fields.
#[derive(Debug, Clone, Copy)]
pub struct MethodNameParser<'a> {
    metadata: &'a EntityMetadata,
}

impl<'a> MethodNameParser<'a> {
    pub fn new(metadata: &'a EntityMetadata) -> Self {
        Self { metadata }
    }

    /// Parse `method` against a single table.
    ///
    /// Fails with `UnrecognizedMethod` when no entry matches, `MissingArgument` when the
    /// matched operator needs a value and `arg_count` is zero, and `UnrecognizedField`
    /// when the field part is not declared on the entity.
    pub fn parse(&self, method: &str, table: &OperatorTable, arg_count: usize) -> OrmResult<ParsedCall> {
        let (conjunction, name) = split_conjunction(method);

        for entry in table.entries {
            if entry.keyword.len() >= name.len() {
                continue;
            }
            let field_part = match table.mode {
                MatchMode::Prefix => name
                    .strip_prefix(entry.keyword)
                    .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase())),
                MatchMode::Suffix => name.strip_suffix(entry.keyword),
            };
            let Some(field_part) = field_part.filter(|f| !f.is_empty()) else {
                continue;
            };

            if entry.requires_argument && arg_count == 0 {
                return Err(OrmError::missing_argument(method));
            }
            let field_name = self.canonical_field(field_part).ok_or_else(|| {
                OrmError::unrecognized_field(
                    self.metadata.short_name(),
                    field_part.to_lower_camel_case(),
                    method,
                )
            })?;
            return Ok(ParsedCall {
                conjunction,
                field_name,
                operator: entry.operator,
            });
        }

        Err(OrmError::unrecognized_method(method))
    }

    /// Try the structural table, then the comparison table.
    pub fn parse_any(&self, method: &str, arg_count: usize) -> OrmResult<ParsedCall> {
        match self.parse(method, &STRUCTURAL_OPERATORS, arg_count) {
            Err(OrmError::UnrecognizedMethod { .. }) => {
                self.parse(method, &COMPARISON_OPERATORS, arg_count)
            }
            other => other,
        }
    }

    /// Map a method-name field part (`CreatedAt`, `createdAt`) to a declared name.
    fn canonical_field(&self, part: &str) -> Option<String> {
        [part.to_snake_case(), part.to_lower_camel_case(), part.to_string()]
            .into_iter()
            .find(|candidate| {
                self.metadata.has_field(candidate) || self.metadata.has_association(candidate)
            })
    }
}

/// Parse a dynamic method name for `metadata`, trying every operator table in order.
pub fn parse_call(metadata: &EntityMetadata, method: &str, arg_count: usize) -> OrmResult<ParsedCall> {
    MethodNameParser::new(metadata).parse_any(method, arg_count)
}

/// Strip one leading `and` / `or` at a word boundary and lower-case the next character.
fn split_conjunction(method: &str) -> (Conjunction, Cow<'_, str>) {
    for (prefix, conjunction) in [("and", Conjunction::And), ("or", Conjunction::Or)] {
        if let Some(rest) = method.strip_prefix(prefix) {
            let mut chars = rest.chars();
            if let Some(first) = chars.next().filter(char::is_ascii_uppercase) {
                let mut name = String::with_capacity(rest.len());
                name.push(first.to_ascii_lowercase());
                name.push_str(chars.as_str());
                return (conjunction, Cow::Owned(name));
            }
        }
    }
    (Conjunction::None, Cow::Borrowed(method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AssociationMeta, FieldMeta, FieldType};

    fn meta() -> EntityMetadata {
        EntityMetadata::builder("Order")
            .field(FieldMeta::new("id", FieldType::BigInt).id())
            .field(FieldMeta::new("status", FieldType::String))
            .field(FieldMeta::new("created_at", FieldType::DateTime))
            .field(FieldMeta::new("amount", FieldType::Decimal))
            .field(FieldMeta::new("deleted_at", FieldType::DateTime))
            .association(AssociationMeta::new("customer", "Customer"))
            .build()
            .unwrap()
    }

    fn parsed(conjunction: Conjunction, field: &str, operator: Operator) -> ParsedCall {
        ParsedCall {
            conjunction,
            field_name: field.to_string(),
            operator,
        }
    }

    #[test]
    fn structural_prefixes() {
        let meta = meta();
        assert_eq!(
            parse_call(&meta, "filterByStatus", 1).unwrap(),
            parsed(Conjunction::None, "status", Operator::FilterBy)
        );
        assert_eq!(
            parse_call(&meta, "orAddOrderByCreatedAt", 0).unwrap(),
            parsed(Conjunction::Or, "created_at", Operator::AddOrderBy)
        );
        assert_eq!(
            parse_call(&meta, "addOrderDescByCreatedAt", 0).unwrap(),
            parsed(Conjunction::None, "created_at", Operator::AddOrderDescBy)
        );
        assert_eq!(
            parse_call(&meta, "groupByCustomer", 0).unwrap(),
            parsed(Conjunction::None, "customer", Operator::GroupBy)
        );
    }

    #[test]
    fn comparison_keyword_must_end_the_name() {
        let meta = EntityMetadata::builder("Profile")
            .field(FieldMeta::new("linked_in_url", FieldType::String).nullable())
            .build()
            .unwrap();
        assert_eq!(
            parse_call(&meta, "linkedInUrlIsNull", 0).unwrap(),
            parsed(Conjunction::None, "linked_in_url", Operator::IsNull)
        );
        assert_eq!(
            parse_call(&meta, "linkedInUrlIn", 1).unwrap(),
            parsed(Conjunction::None, "linked_in_url", Operator::In)
        );
    }

    #[test]
    fn comparison_suffixes() {
        let meta = meta();
        assert_eq!(
            parse_call(&meta, "orAmountGreaterThan", 1).unwrap(),
            parsed(Conjunction::Or, "amount", Operator::GreaterThan)
        );
        assert_eq!(
            parse_call(&meta, "amountGreaterThanEqual", 1).unwrap(),
            parsed(Conjunction::None, "amount", Operator::GreaterThanEqual)
        );
        assert_eq!(
            parse_call(&meta, "statusNotEqual", 1).unwrap(),
            parsed(Conjunction::None, "status", Operator::NotEqual)
        );
        assert_eq!(
            parse_call(&meta, "idNotIn", 1).unwrap(),
            parsed(Conjunction::None, "id", Operator::NotIn)
        );
        assert_eq!(
            parse_call(&meta, "andDeletedAtIsNull", 0).unwrap(),
            parsed(Conjunction::And, "deleted_at", Operator::IsNull)
        );
        assert_eq!(
            parse_call(&meta, "statusIsNotEmpty", 0).unwrap(),
            parsed(Conjunction::None, "status", Operator::IsNotEmpty)
        );
    }

    #[test]
    fn order_prefix_is_not_a_conjunction() {
        let meta = meta();
        assert_eq!(
            parse_call(&meta, "orderByStatus", 0).unwrap(),
            parsed(Conjunction::None, "status", Operator::OrderBy)
        );
        assert_eq!(
            parse_call(&meta, "orOrderDescByStatus", 0).unwrap(),
            parsed(Conjunction::Or, "status", Operator::OrderDescBy)
        );
    }

    #[test]
    fn missing_argument_is_reported_before_field_check() {
        let meta = meta();
        assert!(matches!(
            parse_call(&meta, "filterByNickname", 0),
            Err(OrmError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse_call(&meta, "amountLessThan", 0),
            Err(OrmError::MissingArgument { .. })
        ));
    }

    #[test]
    fn undeclared_field_is_rejected() {
        let meta = meta();
        let err = parse_call(&meta, "filterByNickname", 1).unwrap_err();
        match err {
            OrmError::UnrecognizedField {
                entity,
                field,
                method,
            } => {
                assert_eq!(entity, "Order");
                assert_eq!(field, "nickname");
                assert_eq!(method, "filterByNickname");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        let meta = meta();
        for method in ["frobnicate", "where", "Equal", "statusBetween", "orderBy"] {
            assert!(
                matches!(
                    parse_call(&meta, method, 1),
                    Err(OrmError::UnrecognizedMethod { .. })
                ),
                "{method}"
            );
        }
    }

    #[test]
    fn single_table_parse_does_not_fall_through() {
        let meta = meta();
        let parser = MethodNameParser::new(&meta);
        assert!(matches!(
            parser.parse("statusEqual", &STRUCTURAL_OPERATORS, 1),
            Err(OrmError::UnrecognizedMethod { .. })
        ));
        assert!(parser.parse("statusEqual", &COMPARISON_OPERATORS, 1).is_ok());
    }

    #[test]
    fn operator_flags_follow_tables() {
        assert!(Operator::Where.requires_argument());
        assert!(!Operator::OrderBy.requires_argument());
        assert!(!Operator::IsEmpty.requires_argument());
        assert!(Operator::GroupBy.is_structural());
        assert!(!Operator::Like.is_structural());
    }
}
