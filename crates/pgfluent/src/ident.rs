//! SQL identifier validation for table names and entity aliases.
//!
//! Metadata is supplied by derive macros or by hand, so table names and aliases are checked
//! once at registration time instead of on every rendered query.
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts allow any characters except NUL and escape `"` as `""`
//! - Unquoted parts that are Postgres reserved keywords render quoted, in their folded form

use crate::error::{OrmError, OrmResult};

/// Keywords Postgres reserves outright or allows only as function or type names.
/// None of them can name a table, column or table alias without quoting.
const RESERVED: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group",
    "having", "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull",
    "join", "lateral", "leading", "left", "like", "limit", "localtime", "localtimestamp",
    "natural", "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "system_user", "table", "tablesample",
    "then", "to", "trailing", "true", "union", "unique", "user", "using", "variadic",
    "verbose", "when", "where", "window", "with",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Render a single unquoted word for SQL.
///
/// Reserved keywords are quoted as the lowercase name Postgres would have folded them to, so
/// `Order` and `order` both become `"order"`. Other words are left as they are.
pub fn sql_word(word: &str) -> String {
    if is_reserved(word) {
        quote(&word.to_ascii_lowercase())
    } else {
        word.to_string()
    }
}

/// Render a possibly qualified table name for SQL, falling back to the text as given.
pub fn sql_table(name: &str) -> String {
    Ident::parse(name).map_or_else(|_| name.to_string(), |ident| ident.to_sql())
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

/// A possibly schema-qualified SQL identifier such as `public.users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        loop {
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            name.push('"');
                        }
                        Some('"') => break,
                        Some(c) => name.push(c),
                        None => return Err(OrmError::validation("Unclosed quoted identifier")),
                    }
                }
                if name.is_empty() {
                    return Err(OrmError::validation("Empty quoted identifier"));
                }
                parts.push(IdentPart::Quoted(name));
            } else {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c == '.' {
                        break;
                    }
                    let valid = if name.is_empty() {
                        c == '_' || c.is_ascii_alphabetic()
                    } else {
                        c == '_' || c == '$' || c.is_ascii_alphanumeric()
                    };
                    if !valid {
                        return Err(OrmError::validation(format!(
                            "Invalid character '{c}' in identifier '{s}'"
                        )));
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(OrmError::validation(format!(
                        "Empty identifier segment in '{s}'"
                    )));
                }
                parts.push(IdentPart::Unquoted(name));
            }

            match chars.next() {
                None => break,
                Some('.') if chars.peek().is_none() => {
                    return Err(OrmError::validation("Trailing '.' in identifier"));
                }
                Some('.') => {}
                Some(c) => {
                    return Err(OrmError::validation(format!(
                        "Expected '.' between identifier parts, got '{c}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    /// Parse an identifier that must be a single unquoted word, as entity aliases are.
    pub fn parse_alias(s: &str) -> OrmResult<Self> {
        let ident = Self::parse(s)?;
        match ident.parts.as_slice() {
            [IdentPart::Unquoted(_)] => Ok(ident),
            _ => Err(OrmError::validation(format!(
                "Alias '{s}' must be a single unquoted identifier"
            ))),
        }
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) => out.push_str(&sql_word(s)),
                IdentPart::Quoted(s) => out.push_str(&quote(s)),
            }
        }
        out
    }
}
