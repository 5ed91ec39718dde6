//! Reading of `#[resource(...)]` helper attributes.

use proc_macro2::TokenStream;
use std::borrow::Borrow;
use syn::{parenthesized, parse::Parse, token::Paren, Attribute, Ident};

/// Reader for helper attributes in one scope.
///
/// An attribute `#[scope(flag, name(arg))]` holds any number of entries, each either a flag or a
/// name with a single argument.
pub struct AttrParser(String);

impl AttrParser {
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// Whether any of `attrs` sets the flag `name`.
    pub fn has_bool<I>(&self, attrs: I, name: &str) -> bool
    where
        I: IntoIterator,
        I::Item: Borrow<Attribute>,
    {
        attrs
            .into_iter()
            .flat_map(|a| self.entries(a.borrow()))
            .any(|(entry, arg)| arg.is_none() && entry == name)
    }

    /// The argument given to `name` in `attrs`, if any.
    ///
    /// # Panics
    ///
    /// Panics if the argument does not parse as a `T`.
    pub fn get_arg<T: Parse, I>(&self, attrs: I, name: &str) -> Option<T>
    where
        I: IntoIterator,
        I::Item: Borrow<Attribute>,
    {
        attrs
            .into_iter()
            .flat_map(|a| self.entries(a.borrow()))
            .find_map(|(entry, arg)| match arg {
                Some(arg) if entry == name => Some(syn::parse2(arg).unwrap_or_else(|_| {
                    panic!(
                        "argument to {name} must be a {}",
                        std::any::type_name::<T>()
                    )
                })),
                _ => None,
            })
    }

    /// The entries of `a`, or nothing if `a` is not in this scope.
    ///
    /// # Panics
    ///
    /// Panics if `a` is in this scope but is not a list of identifiers with optional
    /// parenthesized arguments.
    fn entries(&self, a: &Attribute) -> Vec<(Ident, Option<TokenStream>)> {
        let mut entries = vec![];
        if !a.path().is_ident(&self.0) {
            return entries;
        }
        a.parse_nested_meta(|meta| {
            let name = meta.path.get_ident().cloned().unwrap_or_else(|| {
                panic!("{} attribute entries must be identifiers", self.0)
            });
            let arg = if meta.input.peek(Paren) {
                let content;
                parenthesized!(content in meta.input);
                Some(content.parse()?)
            } else {
                None
            };
            entries.push((name, arg));
            Ok(())
        })
        .unwrap_or_else(|err| panic!("malformed {} attribute: {err}", self.0));
        entries
    }
}
