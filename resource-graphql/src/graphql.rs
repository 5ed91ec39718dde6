//! The GraphQL operation resolution pipeline.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod operation;
pub mod pagination;
pub mod resolver;
pub mod stage;
pub mod type_system;

// Re-export commonly used `async_graphql` types.
pub use async_graphql::{value, ErrorExtensions, Name, Value};
pub use resource_graphql_derive::Resource;

// Re-export `async_graphql` directly as an escape hatch.
pub extern crate async_graphql;

/// A serialized GraphQL object: field names mapped to values, in insertion order.
pub type Map = indexmap::IndexMap<Name, Value>;

/// Build a serialized object from a fixed list of entries.
pub fn object<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(name, value)| (Name::new(name), value))
            .collect(),
    )
}

/// Lower-case the first character of `name`.
///
/// Mutation and subscription payloads wrap the serialized item under the resource's short name
/// written this way, e.g. `BookAuthor` becomes `bookAuthor`.
pub fn lcfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lcfirst() {
        assert_eq!(lcfirst("BookAuthor"), "bookAuthor");
        assert_eq!(lcfirst("dummy"), "dummy");
        assert_eq!(lcfirst(""), "");
    }

    #[test]
    fn test_object_preserves_order() {
        let obj = object([("b", Value::from(1)), ("a", Value::Null)]);
        let Value::Object(map) = obj else { panic!("expected an object") };
        assert_eq!(
            map.keys().map(Name::as_str).collect::<Vec<_>>(),
            ["b", "a"]
        );
    }
}
