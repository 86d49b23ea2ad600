//! Parsing of struct-level and field-level `#[orm(...)]` attributes.

use syn::{Attribute, Result};

/// Struct-level `#[orm(table = "...", alias = "...")]`.
#[derive(Default)]
pub(crate) struct StructAttr {
    pub table: Option<String>,
    pub alias: Option<String>,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = StructAttr::default();
        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;
            match key.to_string().as_str() {
                "table" => attr.table = Some(value.value()),
                "alias" => attr.alias = Some(value.value()),
                other => {
                    return Err(syn::Error::new_spanned(
                        &key,
                        format!("unknown struct attribute `{other}`; expected `table` or `alias`"),
                    ));
                }
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

/// Field-level `#[orm(...)]`.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub column: Option<String>,
    pub field_type: Option<syn::LitStr>,
    pub association: Option<String>,
    pub target_table: Option<String>,
    pub references: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();
        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            if key == "id" {
                attr.is_id = true;
            } else {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                match key.to_string().as_str() {
                    "column" => attr.column = Some(value.value()),
                    "field_type" => attr.field_type = Some(value),
                    "association" => attr.association = Some(value.value()),
                    "target_table" => attr.target_table = Some(value.value()),
                    "references" => attr.references = Some(value.value()),
                    other => {
                        return Err(syn::Error::new_spanned(
                            &key,
                            format!("unknown field attribute `{other}`"),
                        ));
                    }
                }
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(attr)
    }
}

impl FieldAttr {
    fn merge(&mut self, other: FieldAttr) {
        self.is_id |= other.is_id;
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.field_type.is_some() {
            self.field_type = other.field_type;
        }
        if other.association.is_some() {
            self.association = other.association;
        }
        if other.target_table.is_some() {
            self.target_table = other.target_table;
        }
        if other.references.is_some() {
            self.references = other.references;
        }
    }
}

pub(crate) fn struct_attr(attrs: &[Attribute]) -> Result<StructAttr> {
    let mut out = StructAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: StructAttr = attr.parse_args()?;
        if parsed.table.is_some() {
            out.table = parsed.table;
        }
        if parsed.alias.is_some() {
            out.alias = parsed.alias;
        }
    }
    Ok(out)
}

pub(crate) fn field_attr(attrs: &[Attribute]) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        out.merge(attr.parse_args()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn parses_struct_attrs() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[orm(table = "orders", alias = "o")])];
        let parsed = struct_attr(&attrs).unwrap();
        assert_eq!(parsed.table.as_deref(), Some("orders"));
        assert_eq!(parsed.alias.as_deref(), Some("o"));
    }

    #[test]
    fn merges_field_attrs() {
        let attrs: Vec<Attribute> = vec![
            parse_quote!(#[orm(id)]),
            parse_quote!(#[orm(column = "order_id", field_type = "bigint")]),
        ];
        let parsed = field_attr(&attrs).unwrap();
        assert!(parsed.is_id);
        assert_eq!(parsed.column.as_deref(), Some("order_id"));
        assert_eq!(parsed.field_type.map(|l| l.value()).as_deref(), Some("bigint"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[orm(colum = "x")])];
        assert!(field_attr(&attrs).is_err());
        let attrs: Vec<Attribute> = vec![parse_quote!(#[orm(schema = "x")])];
        assert!(struct_attr(&attrs).is_err());
    }
}
