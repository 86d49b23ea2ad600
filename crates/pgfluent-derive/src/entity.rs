//! Entity derive macro implementation

use crate::attrs::{field_attr, struct_attr};
use crate::common::syn_types::{infer_field_type, option_inner, parse_field_type};
use crate::from_record::{impl_from_record, named_fields};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let name = &input.ident;
    let entity_name = name.to_string();
    let attrs = struct_attr(&input.attrs)?;
    if let Some(alias) = &attrs.alias {
        if !is_identifier(alias) {
            return Err(syn::Error::new_spanned(
                &input.ident,
                format!("alias `{alias}` must be a plain identifier"),
            ));
        }
    }

    let fields = named_fields(&input, "Entity")?;
    let mut parsed = Vec::with_capacity(fields.len());
    let mut decls = Vec::with_capacity(fields.len());

    for field in fields {
        let attr = field_attr(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = ident.to_string();
        let nullable = option_inner(&field.ty).is_some();

        if let Some(target) = &attr.association {
            let mut decl = quote! {
                ::pgfluent::AssociationMeta::new(#field_name, #target)
            };
            if let Some(table) = &attr.target_table {
                decl = quote! { #decl.target_table(#table) };
            }
            if let Some(column) = &attr.column {
                decl = quote! { #decl.join_column(#column) };
            }
            if let Some(referenced) = &attr.references {
                decl = quote! { #decl.references(#referenced) };
            }
            if nullable {
                decl = quote! { #decl.nullable() };
            }
            decls.push(quote! { .association(#decl) });
        } else {
            if attr.target_table.is_some() || attr.references.is_some() {
                return Err(syn::Error::new_spanned(
                    ident,
                    "`target_table` and `references` require `association = \"Target\"`",
                ));
            }
            let variant = match &attr.field_type {
                Some(lit) => parse_field_type(&lit.value()).ok_or_else(|| {
                    syn::Error::new_spanned(lit, format!("unknown field type `{}`", lit.value()))
                })?,
                None => infer_field_type(&field.ty),
            };
            let variant = format_ident!("{}", variant);
            let mut decl = quote! {
                ::pgfluent::FieldMeta::new(#field_name, ::pgfluent::FieldType::#variant)
            };
            if let Some(column) = &attr.column {
                decl = quote! { #decl.column(#column) };
            }
            if attr.is_id {
                decl = quote! { #decl.id() };
            }
            if nullable {
                decl = quote! { #decl.nullable() };
            }
            decls.push(quote! { .field(#decl) });
        }
        parsed.push((field, attr));
    }

    let table = attrs.table.as_ref().map(|t| quote! { .table(#t) });
    let alias = attrs.alias.as_ref().map(|a| quote! { .alias(#a) });
    let from_record = impl_from_record(&input, &parsed);

    Ok(quote! {
        impl ::pgfluent::Entity for #name {
            fn metadata() -> ::std::sync::Arc<::pgfluent::EntityMetadata> {
                static METADATA: ::std::sync::OnceLock<::std::sync::Arc<::pgfluent::EntityMetadata>> =
                    ::std::sync::OnceLock::new();
                METADATA
                    .get_or_init(|| {
                        let metadata = ::pgfluent::EntityMetadata::builder(#entity_name)
                            #table
                            #alias
                            #(#decls)*
                            .build()
                            .unwrap_or_else(|e| panic!("invalid entity metadata: {e}"));
                        ::std::sync::Arc::new(metadata)
                    })
                    .clone()
            }
        }

        #from_record
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
