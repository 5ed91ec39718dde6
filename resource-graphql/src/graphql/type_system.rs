//! Type system for the values that flow through a resolution.
//!
//! The pipeline is driven by metadata, not by Rust types: a resource is identified by its _class_,
//! a string naming the logical type, and every domain object carries its class at run time. This
//! lets one pipeline serve every resource of an application, and it lets the pipeline check the
//! objects returned by user code (custom resolvers, providers) against the class an operation
//! declares.
//!
//! At a high-level the type system consists of the following notions:
//! * An [`Item`] is a single domain object: a class, an optional IRI identifying it, and its
//!   fields.
//! * A [`Collection`] is an ordered list of items. A collection may carry a [`PageState`], which
//!   is the paginator capability consumed when serializing a paginated page.
//! * [`Data`] is either of these. It is what read, deserialize, write and custom resolvers
//!   exchange. Receiving a collection where an item was expected (or vice versa) is a contract
//!   violation.
//! * A [`Resource`] is a Rust type which describes itself to the pipeline. It is usually derived
//!   with [`#[derive(Resource)]`](macro@crate::graphql::Resource).

use super::{Map, Name, Value};
use derive_more::From;

/// A Rust type exposed as a resource.
pub trait Resource: Sized {
    /// The fully qualified class of this resource.
    const CLASS: &'static str;

    /// The short name of this resource, as it appears in the GraphQL schema.
    const SHORT_NAME: &'static str;

    /// The path under which the IRIs of items of this resource live, e.g. `/books`.
    const IRI_PREFIX: &'static str;

    /// Convert this value into an [`Item`] which can flow through the pipeline.
    fn into_item(self) -> Item;
}

/// The short name of a fully qualified class: everything after the last `::` or `\`.
pub fn short_name_of(class: &str) -> &str {
    class
        .rsplit(|c| c == ':' || c == '\\')
        .next()
        .unwrap_or(class)
}

/// A single domain object.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    class: String,
    iri: Option<String>,
    fields: Map,
}

impl Item {
    /// A new item of class `class`, with no IRI and no fields.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            iri: None,
            fields: Map::new(),
        }
    }

    /// Give this item an IRI.
    pub fn with_iri(mut self, iri: impl Into<String>) -> Self {
        self.iri = Some(iri.into());
        self
    }

    /// Add or replace a field.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Add or replace a field in place.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(Name::new(name), value.into());
    }

    /// Set the IRI in place.
    pub fn set_iri(&mut self, iri: impl Into<String>) {
        self.iri = Some(iri.into());
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn short_name(&self) -> &str {
        short_name_of(&self.class)
    }

    pub fn iri(&self) -> Option<&str> {
        self.iri.as_deref()
    }

    pub fn fields(&self) -> &Map {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Is this item an instance of `class`?
    pub fn is_a(&self, class: &str) -> bool {
        self.class == class
    }
}

/// The paginator capability of a [`Collection`].
///
/// A paginator without a known total is _partial_: it knows the page it represents but not how
/// many items exist overall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageState {
    /// The 1-based number of this page.
    pub current_page: u64,
    /// The maximum number of items per page.
    pub items_per_page: u64,
    /// The total number of items across all pages, if known.
    pub total_items: Option<u64>,
}

impl PageState {
    /// A page of a collection whose total size is known.
    pub fn new(current_page: u64, items_per_page: u64, total_items: u64) -> Self {
        Self {
            current_page,
            items_per_page,
            total_items: Some(total_items),
        }
    }

    /// A page of a collection whose total size is unknown.
    pub fn partial(current_page: u64, items_per_page: u64) -> Self {
        Self {
            current_page,
            items_per_page,
            total_items: None,
        }
    }

    /// The number of the last page, if the total is known. Never less than 1.
    pub fn last_page(&self) -> Option<u64> {
        let total = self.total_items?;
        if self.items_per_page == 0 {
            return Some(1);
        }
        Some(((total + self.items_per_page - 1) / self.items_per_page).max(1))
    }
}

/// An ordered list of domain objects.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    items: Vec<Item>,
    page: Option<PageState>,
}

impl Collection {
    /// A collection which is not paginated.
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: items.into_iter().collect(),
            page: None,
        }
    }

    /// One page of a paginated collection.
    pub fn paginated(items: impl IntoIterator<Item = Item>, page: PageState) -> Self {
        Self {
            items: items.into_iter().collect(),
            page: Some(page),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The paginator capability, if this collection is paginated.
    pub fn page(&self) -> Option<&PageState> {
        self.page.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Collection {
    type IntoIter = std::vec::IntoIter<Item>;
    type Item = Item;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type IntoIter = std::slice::Iter<'a, Item>;
    type Item = &'a Item;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Item> for Collection {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A value produced by a read, deserialize or write stage, or by a custom resolver.
#[derive(Clone, Debug, PartialEq, From)]
pub enum Data {
    Item(Item),
    Collection(Collection),
}

impl Data {
    /// A short description of the shape of this value, for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::Collection(_) => "collection",
        }
    }
}
