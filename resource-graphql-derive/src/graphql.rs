//! Derive macros for the resource type system.

use proc_macro2::TokenStream;
use quote::quote;

pub mod resource;

/// The path of the `resource_graphql::graphql` module in the scope invoking a procedural macro.
fn graphql_path() -> TokenStream {
    quote!(resource_graphql::graphql)
}
