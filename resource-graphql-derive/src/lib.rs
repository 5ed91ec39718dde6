//! Derive macros for the `resource_graphql` crate.

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod graphql;
mod helpers;

/// Derive an implementation of `Resource` for a struct.
///
/// The generated implementation describes the struct to the resolution pipeline: its class (the
/// fully qualified path of the struct), the short name used in the GraphQL schema and in mutation
/// payloads, and the prefix of the IRIs of its items. `into_item` converts a value into an `Item`
/// carrying every field except the ID, under its camelCase name.
///
/// # Examples
///
/// ```
/// use resource_graphql::prelude::*;
///
/// #[derive(Clone, Resource)]
/// #[resource(plural(People))]
/// struct Person {
///     id: u64,
///     given_name: String,
///     #[resource(skip)]
///     cache: Vec<u8>,
/// }
///
/// assert_eq!(Person::IRI_PREFIX, "/people");
///
/// let item = Person { id: 1, given_name: "Ada".into(), cache: vec![] }.into_item();
/// assert_eq!(item.iri(), Some("/people/1"));
/// assert_eq!(item.field("givenName"), Some(&Value::from("Ada")));
/// ```
///
/// # Struct attributes
///
/// | Attribute     | Description                                             | Arg     | Required |
/// |---------------|---------------------------------------------------------|---------|----------|
/// | short_name    | Override the short name, which defaults to the struct name. | ident | no |
/// | plural        | Override the default pluralization of the short name. The default simply appends an `s`. The IRI prefix is the kebab-case plural. | ident | no |
///
/// # Field attributes
///
/// | Attribute     | Description                                             | Arg    | Required |
/// |---------------|---------------------------------------------------------|---------|----------|
/// | id            | Use this field as the ID for this resource. It can be omitted if the field is called `id`. The field must implement `Display`. | n/a | no |
/// | skip          | Do not include this field in the item. | n/a | no |
///
/// Every other field must convert into a `Value`.
#[proc_macro_derive(Resource, attributes(resource))]
pub fn graphql_resource(input: TokenStream) -> TokenStream {
    graphql::resource::derive(parse_macro_input!(input)).into()
}
