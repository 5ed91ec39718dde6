//! Custom resolvers which user code substitutes into the pipeline.
//!
//! An operation may name a custom resolver by [`ResolverId`]. The pipeline looks the resolver up
//! through a [`ResolverLocator`] and calls it at the boundary between reading (for queries) or
//! deserializing (for mutations) and the rest of the pipeline. The resolver receives the value
//! produced so far and returns the value the pipeline continues with. Security and validation
//! still run on the substituted value.

use super::{context::ResolverContext, error::Error, type_system::Data};
use async_trait::async_trait;
use derivative::Derivative;
use derive_more::{Display, From};
use std::collections::HashMap;
use std::sync::Arc;

/// The identifier under which a custom resolver is registered.
#[derive(Clone, Debug, Display, From, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolverId(String);

impl From<&str> for ResolverId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl ResolverId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A user-supplied override of part of the pipeline.
#[async_trait]
pub trait CustomResolver: Send + Sync {
    async fn resolve(
        &self,
        data: Option<Data>,
        context: &ResolverContext,
    ) -> Result<Option<Data>, Error>;
}

#[async_trait]
impl<F> CustomResolver for F
where
    F: Fn(Option<Data>, &ResolverContext) -> Result<Option<Data>, Error> + Send + Sync,
{
    async fn resolve(
        &self,
        data: Option<Data>,
        context: &ResolverContext,
    ) -> Result<Option<Data>, Error> {
        self(data, context)
    }
}

/// Lookup of custom resolvers by identifier.
///
/// Implementations must be safe to share between concurrent resolutions. They are read, never
/// modified, while requests are handled.
pub trait ResolverLocator: Send + Sync {
    /// Is a resolver registered under `id`?
    fn has(&self, id: &ResolverId) -> bool;

    /// The resolver registered under `id`.
    fn get(&self, id: &ResolverId) -> Result<Arc<dyn CustomResolver>, Error>;
}

/// An in-process registry of custom resolvers.
#[derive(Clone, Default, Derivative)]
#[derivative(Debug)]
pub struct ResolverRegistry {
    #[derivative(Debug = "ignore")]
    resolvers: HashMap<ResolverId, Arc<dyn CustomResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver function under `id`, replacing any previous registration.
    pub fn register<F>(mut self, id: impl Into<ResolverId>, resolver: F) -> Self
    where
        F: 'static + Fn(Option<Data>, &ResolverContext) -> Result<Option<Data>, Error> + Send + Sync,
    {
        self.resolvers.insert(id.into(), Arc::new(resolver));
        self
    }

    /// Register a resolver object under `id`, replacing any previous registration.
    pub fn register_resolver(
        mut self,
        id: impl Into<ResolverId>,
        resolver: Arc<dyn CustomResolver>,
    ) -> Self {
        self.resolvers.insert(id.into(), resolver);
        self
    }

    /// The identifiers of all registered resolvers.
    pub fn ids(&self) -> impl '_ + Iterator<Item = &ResolverId> {
        self.resolvers.keys()
    }
}

impl ResolverLocator for ResolverRegistry {
    fn has(&self, id: &ResolverId) -> bool {
        self.resolvers.contains_key(id)
    }

    fn get(&self, id: &ResolverId) -> Result<Arc<dyn CustomResolver>, Error> {
        self.resolvers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ResolverNotFound { id: id.clone() })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphql::{
        context::{FieldInfo, OperationKind},
        error::ErrorKind,
        type_system::Item,
        Map,
    };

    #[async_std::test]
    async fn test_registry() {
        let registry = ResolverRegistry::new().register(
            "rename",
            |data: Option<Data>, _: &ResolverContext| match data {
                Some(Data::Item(item)) => Ok(Some(item.with_field("name", "renamed").into())),
                other => Ok(other),
            },
        );

        let id = ResolverId::from("rename");
        assert!(registry.has(&id));
        assert!(!registry.has(&"missing".into()));

        let ctx = ResolverContext::new(
            OperationKind::ItemQuery,
            None,
            &Map::new(),
            &FieldInfo::new("dummy"),
        );
        let resolved = registry
            .get(&id)
            .unwrap()
            .resolve(Some(Item::new("Dummy").into()), &ctx)
            .await
            .unwrap();
        assert_eq!(
            resolved,
            Some(Item::new("Dummy").with_field("name", "renamed").into())
        );
    }

    #[test]
    fn test_registered_ids() {
        let noop =
            |data: Option<Data>, _: &ResolverContext| -> Result<Option<Data>, Error> { Ok(data) };
        let registry = ResolverRegistry::new()
            .register("second", noop)
            .register("first", noop)
            .register("second", noop);

        let mut ids = registry.ids().map(ResolverId::as_str).collect::<Vec<_>>();
        ids.sort();
        assert_eq!(ids, ["first", "second"]);
        assert_eq!(ResolverRegistry::new().ids().count(), 0);
    }

    #[test]
    fn test_missing_resolver() {
        let err = ResolverRegistry::new()
            .get(&"missing".into())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "custom resolver \"missing\" is not registered");
    }
}
