//! Factories composing the stages into GraphQL field resolvers.
//!
//! A factory is bound to a `(resource class, root class, operation)` triple when the schema is
//! built, and produces a [`FieldResolver`] which the GraphQL engine calls for every resolution of
//! the corresponding field. Which stages the resolver runs, and in what order, depends on the kind
//! of the operation:
//!
//! | kind | pipeline |
//! |------|----------|
//! | item query | read → custom resolver → security → security (post denormalize) → serialize |
//! | collection query | read → custom resolver → security → security (post denormalize) → serialize |
//! | mutation | read → security → deserialize → security (post denormalize) → custom resolver → validate → security (post validation) → write → serialize |
//! | subscription | read → security → serialize → subscription URL |
//!
//! [`ResolverFactories`] dispatches on the kind to the matching factory. The [`generic`] factory
//! implements the provider/processor model instead, where a [`Processor`](super::backend::Processor)
//! decides what happens to the provided data.

use super::{
    backend::Collaborators,
    config::ResolverConfig,
    context::{FieldInfo, OperationKind, ResolverContext, Source},
    error::Error,
    operation::Operation,
    resolver::{ResolverId, ResolverLocator},
    stage::Stages,
    type_system::{short_name_of, Data, Item},
    Map, Value,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod collection;
pub mod generic;
pub mod item;
pub mod item_mutation;
pub mod item_subscription;

pub use collection::CollectionResolverFactory;
pub use generic::{GenericResolverFactory, PipelineProcessor};
pub use item::ItemResolverFactory;
pub use item_mutation::ItemMutationResolverFactory;
pub use item_subscription::ItemSubscriptionResolverFactory;

/// The resolver of a single GraphQL field.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    /// Resolve the field described by `info`, with arguments `args`, on the parent value `source`.
    async fn resolve(
        &self,
        source: Option<&Source>,
        args: &Map,
        info: &FieldInfo,
    ) -> Result<Value, Error>;
}

/// A builder of field resolvers.
pub trait ResolverFactory: Send + Sync {
    fn create(
        &self,
        resource_class: Option<&str>,
        root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver>;
}

/// Dispatch to the factory matching the kind of each operation.
///
/// Operations without a descriptor are resolved as item queries.
#[derive(Clone)]
pub struct ResolverFactories {
    item: ItemResolverFactory,
    collection: CollectionResolverFactory,
    item_mutation: ItemMutationResolverFactory,
    item_subscription: ItemSubscriptionResolverFactory,
}

impl ResolverFactories {
    /// Factories using the default stages, built from `collaborators`.
    pub fn new(
        config: &ResolverConfig,
        collaborators: &Collaborators,
        locator: Arc<dyn ResolverLocator>,
    ) -> Self {
        Self::with_stages(
            Stages::new(config, collaborators),
            collaborators,
            locator,
        )
    }

    /// Factories using the given stages.
    pub fn with_stages(
        stages: Stages,
        collaborators: &Collaborators,
        locator: Arc<dyn ResolverLocator>,
    ) -> Self {
        Self {
            item: ItemResolverFactory::new(stages.clone(), locator.clone()),
            collection: CollectionResolverFactory::new(stages.clone(), locator.clone()),
            item_mutation: ItemMutationResolverFactory::new(stages.clone(), locator),
            item_subscription: ItemSubscriptionResolverFactory::new(
                stages,
                collaborators.subscription_manager.clone(),
                collaborators.url_generator.clone(),
            ),
        }
    }
}

impl ResolverFactory for ResolverFactories {
    fn create(
        &self,
        resource_class: Option<&str>,
        root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver> {
        let factory: &dyn ResolverFactory = match operation.map(Operation::kind) {
            None | Some(OperationKind::ItemQuery) => &self.item,
            Some(OperationKind::CollectionQuery) => &self.collection,
            Some(OperationKind::Mutation) => &self.item_mutation,
            Some(OperationKind::Subscription) => &self.item_subscription,
        };
        factory.create(resource_class, root_class, operation)
    }
}

/// The operation used by query factories created without one.
fn default_operation(kind: OperationKind, resource_class: Option<&str>) -> Operation {
    let name = match kind {
        OperationKind::CollectionQuery => "collection_query",
        _ => "item_query",
    };
    Operation::new(kind, name, resource_class.unwrap_or_default())
}

fn expect_item(data: Option<Data>) -> Result<Option<Item>, Error> {
    match data {
        Some(Data::Item(item)) => Ok(Some(item)),
        Some(Data::Collection(_)) => Err(Error::contract(
            "Item from read stage should be a nullable object.",
        )),
        None => Ok(None),
    }
}

/// Run the custom resolver `id` on `data`.
async fn substitute(
    locator: &dyn ResolverLocator,
    id: &ResolverId,
    data: Option<Data>,
    context: &ResolverContext,
) -> Result<Option<Data>, Error> {
    let resolver = locator.get(id)?;
    tracing::info!("substituting custom resolver {id}");
    resolver.resolve(data, context).await
}

/// Check that a custom resolver returned an item of class `class`, if anything.
fn custom_item(
    data: Option<Data>,
    what: &str,
    id: &ResolverId,
    class: &str,
) -> Result<Option<Item>, Error> {
    let returned = match data {
        None => return Ok(None),
        Some(Data::Item(item)) if item.is_a(class) => return Ok(Some(item)),
        Some(Data::Item(item)) => format!("an item of class {}", item.short_name()),
        Some(Data::Collection(_)) => "a collection".to_string(),
    };
    Err(Error::contract(format!(
        "Custom {what} resolver \"{id}\" has to return an item of class {} but returned {returned}.",
        short_name_of(class)
    )))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphql::{
        backend::mock::{map, Backend},
        operation::Pagination,
        resolver::ResolverRegistry,
        value,
    };

    #[async_std::test]
    async fn test_dispatch_on_kind() {
        let backend = Backend::new();
        backend
            .store
            .insert(Item::new("Dummy").with_iri("/dummies/1").with_field("name", "foo"));
        let factories = ResolverFactories::new(
            &ResolverConfig::default().with_pagination(Pagination::disabled()),
            &backend.collaborators(),
            Arc::new(ResolverRegistry::new()),
        );
        let info = FieldInfo::new("dummy");

        let item = factories
            .create(Some("Dummy"), Some("Dummy"), None)
            .resolve(None, &map(value!({ "id": "/dummies/1" })), &info)
            .await
            .unwrap();
        assert_eq!(item, value!({ "id": "/dummies/1", "name": "foo" }));

        let collection = Operation::new(OperationKind::CollectionQuery, "collection_query", "Dummy");
        let items = factories
            .create(Some("Dummy"), Some("Dummy"), Some(&collection))
            .resolve(None, &Map::new(), &info)
            .await
            .unwrap();
        assert_eq!(items, value!([{ "id": "/dummies/1", "name": "foo" }]));

        let delete = Operation::delete("Dummy");
        let deleted = factories
            .create(Some("Dummy"), None, Some(&delete))
            .resolve(None, &map(value!({ "input": { "id": "/dummies/1" } })), &info)
            .await
            .unwrap();
        assert_eq!(
            deleted,
            value!({ "dummy": { "id": "/dummies/1" }, "clientMutationId": null })
        );
        assert_eq!(backend.store.find("/dummies/1"), None);
    }

    #[test]
    fn test_custom_item_check() {
        let id = ResolverId::from("custom");
        assert_eq!(
            custom_item(Some(Item::new("app::Dummy").into()), "query", &id, "app::Dummy").unwrap(),
            Some(Item::new("app::Dummy"))
        );
        assert_eq!(custom_item(None, "query", &id, "app::Dummy").unwrap(), None);
        assert_eq!(
            custom_item(Some(Item::new("app::Other").into()), "query", &id, "app::Dummy")
                .unwrap_err()
                .to_string(),
            "Custom query resolver \"custom\" has to return an item of class Dummy but returned an item of class Other."
        );
    }
}
