//! Mock instantiation of the [`backend`](super) collaborators.
//!
//! These collaborators are built on a simple in-memory store. They are useful for testing in
//! isolation from a real persistence layer. Every collaborator call is recorded in a shared
//! [`Journal`], so tests can assert which stages reached their collaborators, and in what order.
#![cfg(any(test, feature = "mocks"))]

use super::{
    Collaborators, ConstraintViolation, ConstraintViolationList, Identifiers,
    SerializerContext, ValidationContext,
};
use crate::graphql::{
    context::{ExtraVariables, ResolverContext},
    error::Error,
    operation::Operation,
    type_system::{short_name_of, Collection, Data, Item, PageState},
    Map, Name, Value,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// Unwrap a serialized object into its map of fields.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn map(value: Value) -> Map {
    match value {
        Value::Object(map) => map,
        value => panic!("expected an object, got {value}"),
    }
}

/// A log of collaborator calls, shared by all the mocks of one [`Backend`].
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    /// All calls recorded so far, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Has a call been recorded whose entry starts with `prefix`?
    pub fn contains(&self, prefix: &str) -> bool {
        self.0
            .lock()
            .unwrap()
            .iter()
            .any(|entry| entry.starts_with(prefix))
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// An in-memory store of items, acting as both [`Provider`](super::Provider) and
/// [`Processor`](super::Processor).
#[derive(Clone, Debug, Default)]
pub struct Store {
    journal: Journal,
    items: Arc<Mutex<Vec<Item>>>,
    page: Option<PageState>,
}

impl Store {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Default::default()
        }
    }

    /// Add an item to the store.
    pub fn insert(&self, item: Item) {
        self.items.lock().unwrap().push(item);
    }

    /// Return collections as one page with the given paginator state.
    pub fn with_page(mut self, page: PageState) -> Self {
        self.page = Some(page);
        self
    }

    /// Look up an item by IRI.
    pub fn find(&self, iri: &str) -> Option<Item> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.iri() == Some(iri))
            .cloned()
    }

    /// All items of class `class`.
    pub fn all(&self, class: &str) -> Vec<Item> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.is_a(class))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl super::Provider for Store {
    async fn provide(
        &self,
        operation: &Operation,
        identifiers: &Identifiers,
        context: &SerializerContext,
    ) -> Result<Option<Data>, Error> {
        match identifiers.get("id") {
            Some(Value::String(iri)) if context.link.is_none() => {
                tracing::info!("PROVIDE {iri}");
                self.journal.record("provide");
                Ok(self.find(iri).map(Data::Item))
            }
            _ => {
                tracing::info!("PROVIDE {} ({:?})", operation.class(), context.link);
                self.journal.record("provide");
                let items = self.all(operation.class());
                Ok(Some(Data::Collection(match self.page {
                    Some(page) => Collection::paginated(items, page),
                    None => Collection::new(items),
                })))
            }
        }
    }
}

#[async_trait]
impl super::Processor for Store {
    type Output = Option<Item>;

    async fn process(
        &self,
        data: Option<Data>,
        operation: &Operation,
        _identifiers: &Identifiers,
        _context: &SerializerContext,
    ) -> Result<Option<Item>, Error> {
        self.journal.record("process");
        let mut item = match data {
            Some(Data::Item(item)) => item,
            Some(data) => {
                return Err(Error::backend(format!(
                    "mock store cannot persist a {}",
                    data.shape()
                )))
            }
            None => return Ok(None),
        };

        let mut items = self.items.lock().unwrap();
        let position = item
            .iri()
            .and_then(|iri| items.iter().position(|stored| stored.iri() == Some(iri)));
        if operation.is_delete() {
            tracing::info!("DELETE {:?}", item.iri());
            if let Some(i) = position {
                items.remove(i);
            }
            return Ok(None);
        }

        tracing::info!("PERSIST {:?}", item.iri());
        match position {
            Some(i) => items[i] = item.clone(),
            None => {
                if item.iri().is_none() {
                    item.set_iri(format!(
                        "/{}s/{}",
                        short_name_of(item.class()).to_lowercase(),
                        items.len() + 1
                    ));
                }
                items.push(item.clone());
            }
        }
        Ok(Some(item))
    }
}

/// A serializer emitting an item's IRI as `id` followed by its fields.
#[derive(Clone, Debug, Default)]
pub struct Serializer {
    journal: Journal,
}

impl Serializer {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl super::Normalizer for Serializer {
    fn normalize(
        &self,
        item: &Item,
        _format: &str,
        _context: &SerializerContext,
    ) -> Result<Value, Error> {
        self.journal.record("normalize");
        let id = item.iri().map(Value::from).unwrap_or(Value::Null);
        Ok(Value::Object(
            [(Name::new("id"), id)]
                .into_iter()
                .chain(item.fields().clone())
                .collect(),
        ))
    }
}

impl super::Denormalizer for Serializer {
    fn denormalize(
        &self,
        input: &Value,
        class: &str,
        _format: &str,
        context: &SerializerContext,
    ) -> Result<Item, Error> {
        self.journal.record("denormalize");
        let Value::Object(input) = input else {
            return Err(Error::unexpected("mutation input must be an object"));
        };
        let mut item = context
            .object_to_populate
            .clone()
            .unwrap_or_else(|| Item::new(class));
        for (name, value) in input {
            if matches!(name.as_str(), "id" | "clientMutationId") {
                continue;
            }
            item.set_field(name.as_str(), value.clone());
        }
        Ok(item)
    }
}

/// A validator requiring certain fields to be present and not `null`.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    journal: Journal,
    required: Vec<String>,
}

impl Validator {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            required: vec![],
        }
    }

    /// Require the field `field`.
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required.push(field.into());
        self
    }
}

impl super::Validator for Validator {
    fn validate(
        &self,
        item: &Item,
        context: &ValidationContext,
    ) -> Result<(), ConstraintViolationList> {
        let groups = context.groups.as_deref().unwrap_or_default();
        self.journal.record(format!("validate:{}", groups.join(",")));
        let violations = self
            .required
            .iter()
            .filter(|field| matches!(item.field(field), None | Some(Value::Null)))
            .map(|field| ConstraintViolation::new(field.as_str(), "This value should not be blank."))
            .collect::<Vec<_>>();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations.into())
        }
    }
}

type Rule = Arc<dyn Fn(&ExtraVariables) -> bool + Send + Sync>;

/// An access checker with a fixed rule per expression. Unknown expressions are denied.
#[derive(Clone, Default)]
pub struct AccessChecker {
    journal: Journal,
    rules: HashMap<String, Rule>,
}

impl AccessChecker {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            rules: HashMap::new(),
        }
    }

    /// Always grant `expression`.
    pub fn grant(self, expression: impl Into<String>) -> Self {
        self.rule(expression, |_| true)
    }

    /// Always deny `expression`.
    pub fn deny(self, expression: impl Into<String>) -> Self {
        self.rule(expression, |_| false)
    }

    /// Decide `expression` by evaluating `rule` against the extra variables.
    pub fn rule<F>(mut self, expression: impl Into<String>, rule: F) -> Self
    where
        F: 'static + Fn(&ExtraVariables) -> bool + Send + Sync,
    {
        self.rules.insert(expression.into(), Arc::new(rule));
        self
    }
}

impl super::AccessChecker for AccessChecker {
    fn is_granted(
        &self,
        _resource_class: &str,
        expression: &str,
        extra_variables: &ExtraVariables,
    ) -> Result<bool, Error> {
        self.journal.record(format!("is_granted:{expression}"));
        Ok(self
            .rules
            .get(expression)
            .map(|rule| rule(extra_variables))
            .unwrap_or(false))
    }
}

/// A subscription manager handing out a fixed subscription ID.
#[derive(Clone, Debug, Default)]
pub struct Subscriptions {
    journal: Journal,
    id: Option<String>,
}

impl Subscriptions {
    pub fn new(journal: Journal, id: Option<String>) -> Self {
        Self { journal, id }
    }
}

#[async_trait]
impl super::SubscriptionManager for Subscriptions {
    async fn retrieve_subscription_id(
        &self,
        _context: &ResolverContext,
        _result: &Value,
    ) -> Result<Option<String>, Error> {
        self.journal.record("subscription_id");
        Ok(self.id.clone())
    }
}

/// A URL generator pointing clients at Mercure hubs.
#[derive(Clone, Debug)]
pub struct Hubs {
    journal: Journal,
    default: Url,
    named: HashMap<String, Url>,
}

impl Hubs {
    pub fn new(journal: Journal, default: Url) -> Self {
        Self {
            journal,
            default,
            named: HashMap::new(),
        }
    }

    pub fn with_hub(mut self, name: impl Into<String>, url: Url) -> Self {
        self.named.insert(name.into(), url);
        self
    }
}

impl super::SubscriptionUrlGenerator for Hubs {
    fn generate_url(&self, subscription_id: &str, hub: Option<&str>) -> Result<Url, Error> {
        self.journal.record("generate_url");
        let mut url = match hub {
            Some(name) => self
                .named
                .get(name)
                .ok_or_else(|| Error::backend(format!("no such hub {name}")))?
                .clone(),
            None => self.default.clone(),
        };
        url.query_pairs_mut().append_pair(
            "topic",
            &format!("http://localhost/subscriptions/{subscription_id}"),
        );
        Ok(url)
    }
}

/// A complete set of mock collaborators sharing one [`Journal`].
#[derive(Clone)]
pub struct Backend {
    pub journal: Journal,
    pub store: Store,
    pub serializer: Serializer,
    pub validator: Validator,
    pub access_checker: Option<AccessChecker>,
    pub subscriptions: Option<Subscriptions>,
    pub hubs: Option<Hubs>,
}

impl Default for Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend {
    /// Mock collaborators with an empty store and no optional collaborators.
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            store: Store::new(journal.clone()),
            serializer: Serializer::new(journal.clone()),
            validator: Validator::new(journal.clone()),
            access_checker: None,
            subscriptions: None,
            hubs: None,
            journal,
        }
    }

    /// Install an access checker configured by `f`.
    pub fn with_access_checker(mut self, f: impl FnOnce(AccessChecker) -> AccessChecker) -> Self {
        self.access_checker = Some(f(AccessChecker::new(self.journal.clone())));
        self
    }

    /// Install a subscription manager handing out `id`.
    pub fn with_subscriptions(mut self, id: Option<&str>) -> Self {
        self.subscriptions = Some(Subscriptions::new(
            self.journal.clone(),
            id.map(String::from),
        ));
        self
    }

    /// Install a URL generator whose default hub is `url`.
    pub fn with_hubs(mut self, url: Url) -> Self {
        self.hubs = Some(Hubs::new(self.journal.clone(), url));
        self
    }

    pub fn with_page(mut self, page: PageState) -> Self {
        self.store = self.store.with_page(page);
        self
    }

    /// Require `field` on every validated item.
    pub fn require(mut self, field: &str) -> Self {
        self.validator = self.validator.require(field);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        let mut collaborators = Collaborators::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(self.serializer.clone()),
            Arc::new(self.serializer.clone()),
            Arc::new(self.validator.clone()),
        );
        if let Some(checker) = &self.access_checker {
            collaborators = collaborators.with_access_checker(Arc::new(checker.clone()));
        }
        if let Some(subscriptions) = &self.subscriptions {
            collaborators = collaborators.with_subscription_manager(Arc::new(subscriptions.clone()));
        }
        if let Some(hubs) = &self.hubs {
            collaborators = collaborators.with_url_generator(Arc::new(hubs.clone()));
        }
        collaborators
    }
}
