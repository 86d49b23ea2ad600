//! FromRecord derive macro implementation

use crate::attrs::{FieldAttr, field_attr};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

/// Named fields of a struct, or an error naming the derive.
pub(crate) fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}

/// Result column a field is read from: `column`, else `<name>_id` for associations,
/// else the field name.
pub(crate) fn record_column(ident: &syn::Ident, attr: &FieldAttr) -> String {
    match (&attr.column, &attr.association) {
        (Some(column), _) => column.clone(),
        (None, Some(_)) => format!("{}_id", ident.to_string().to_snake_case()),
        (None, None) => ident.to_string(),
    }
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let fields = named_fields(&input, "FromRecord")?;
    let mut pairs = Vec::with_capacity(fields.len());
    for field in fields {
        let attr = field_attr(&field.attrs)?;
        pairs.push((field, attr));
    }
    Ok(impl_from_record(&input, &pairs))
}

/// `impl FromRecord` for already-parsed fields.
pub(crate) fn impl_from_record(input: &DeriveInput, fields: &[(&syn::Field, FieldAttr)]) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_extracts = fields.iter().filter_map(|(field, attr)| {
        let ident = field.ident.as_ref()?;
        let ty = &field.ty;
        let column = record_column(ident, attr);
        Some(quote! {
            #ident: record.try_get::<#ty>(#column)?
        })
    });

    quote! {
        impl #impl_generics ::pgfluent::FromRecord for #name #ty_generics #where_clause {
            fn from_record(record: &::pgfluent::Record) -> ::pgfluent::OrmResult<Self> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    }
}
