//! Type helper utilities for syn type analysis.

/// Extract the inner type T from Option<T>, or return None if not an Option type.
///
/// Recognizes `Option<T>`, `std::option::Option<T>`, and `core::option::Option<T>`.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// `FieldType` variant name for a Rust field type, looking through `Option`.
///
/// Matches on the last path segment, so `chrono::NaiveDate` and `NaiveDate` agree.
/// Unknown types map to `Other`.
pub fn infer_field_type(ty: &syn::Type) -> &'static str {
    let ty = option_inner(ty).unwrap_or(ty);
    let ident = match ty {
        syn::Type::Path(type_path) => match type_path.path.segments.last() {
            Some(seg) => seg.ident.to_string(),
            None => return "Other",
        },
        syn::Type::Reference(reference) => return infer_field_type(&reference.elem),
        _ => return "Other",
    };
    match ident.as_str() {
        "String" | "str" => "String",
        "i16" => "SmallInt",
        "i32" => "Integer",
        "i64" => "BigInt",
        "bool" => "Boolean",
        "f32" | "f64" => "Float",
        "Decimal" => "Decimal",
        "NaiveDate" => "Date",
        "NaiveTime" => "Time",
        "NaiveDateTime" => "DateTime",
        "DateTime" => "DateTimeTz",
        "Uuid" => "Guid",
        "Value" => "Json",
        _ => "Other",
    }
}

/// `FieldType` variant name for an `#[orm(field_type = "...")]` value.
pub fn parse_field_type(name: &str) -> Option<&'static str> {
    let variant = match name.to_ascii_lowercase().as_str() {
        "string" | "text" => "String",
        "smallint" => "SmallInt",
        "integer" | "int" => "Integer",
        "bigint" => "BigInt",
        "boolean" | "bool" => "Boolean",
        "decimal" | "numeric" => "Decimal",
        "float" => "Float",
        "date" => "Date",
        "time" => "Time",
        "datetime" => "DateTime",
        "datetimetz" => "DateTimeTz",
        "guid" | "uuid" => "Guid",
        "json" | "jsonb" => "Json",
        "other" => "Other",
        _ => return None,
    };
    Some(variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_option_inner() {
        let ty: syn::Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(std::option::Option<i32>);
        assert!(option_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(String);
        assert!(option_inner(&ty).is_none());

        let ty: syn::Type = parse_quote!(Vec<String>);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn test_infer_field_type() {
        let cases: Vec<(syn::Type, &str)> = vec![
            (parse_quote!(String), "String"),
            (parse_quote!(Option<i32>), "Integer"),
            (parse_quote!(i64), "BigInt"),
            (parse_quote!(rust_decimal::Decimal), "Decimal"),
            (parse_quote!(chrono::NaiveDate), "Date"),
            (parse_quote!(Option<DateTime<Utc>>), "DateTimeTz"),
            (parse_quote!(uuid::Uuid), "Guid"),
            (parse_quote!(serde_json::Value), "Json"),
            (parse_quote!(Vec<u8>), "Other"),
        ];
        for (ty, expected) in cases {
            assert_eq!(infer_field_type(&ty), expected);
        }
    }

    #[test]
    fn test_parse_field_type() {
        assert_eq!(parse_field_type("DateTimeTz"), Some("DateTimeTz"));
        assert_eq!(parse_field_type("uuid"), Some("Guid"));
        assert_eq!(parse_field_type("blob"), None);
    }
}
