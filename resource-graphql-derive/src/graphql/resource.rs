//! Derive macro for the `Resource` trait.

use super::graphql_path;
use crate::helpers::AttrParser;
use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, FieldsNamed, Ident};

/// Generate an implementation of `Resource` for a struct.
pub fn derive(
    DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    }: DeriveInput,
) -> TokenStream {
    if !generics.params.is_empty() {
        panic!("Resource cannot be derived on generic types");
    }
    match data {
        Data::Struct(s) => match s.fields {
            Fields::Named(fields) => generate_struct(ident, attrs, fields),
            _ => panic!("Resource can only be derived for structs with named fields"),
        },
        _ => panic!("Resource can only be derived for structs"),
    }
}

fn generate_struct(name: Ident, attrs: Vec<Attribute>, fields: FieldsNamed) -> TokenStream {
    let graphql = graphql_path();
    let p = AttrParser::new("resource");

    let short_name: Ident = p
        .get_arg(&attrs, "short_name")
        .unwrap_or_else(|| name.clone());
    let plural: Ident = p
        .get_arg(&attrs, "plural")
        .unwrap_or_else(|| format_ident!("{}s", short_name));
    let short_name = short_name.to_string();
    let iri_prefix = format!("/{}", plural.to_string().to_case(Case::Kebab));

    // The ID is the field marked `id`, or else the field called `id`.
    let fields = fields
        .named
        .into_iter()
        .filter(|f| !p.has_bool(&f.attrs, "skip"))
        .collect::<Vec<_>>();
    let id = fields
        .iter()
        .position(|f| p.has_bool(&f.attrs, "id"))
        .or_else(|| fields.iter().position(|f| f.ident.as_ref().unwrap() == "id"))
        .unwrap_or_else(|| panic!("Resource {name} must have an ID field"));
    let id = fields[id].ident.clone().unwrap();

    let with_fields = fields
        .iter()
        .map(|f| f.ident.as_ref().unwrap())
        .filter(|f| **f != id)
        .map(|f| {
            let field_name = f.to_string().to_case(Case::Camel);
            quote!(.with_field(#field_name, self.#f))
        });

    quote! {
        impl #graphql::type_system::Resource for #name {
            const CLASS: &'static str = concat!(module_path!(), "::", stringify!(#name));
            const SHORT_NAME: &'static str = #short_name;
            const IRI_PREFIX: &'static str = #iri_prefix;

            fn into_item(self) -> #graphql::type_system::Item {
                #graphql::type_system::Item::new(Self::CLASS)
                    .with_iri(format!("{}/{}", Self::IRI_PREFIX, self.#id))
                    #(#with_fields)*
            }
        }
    }
}
