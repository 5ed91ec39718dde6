//! Collection query resolvers, for top-level and nested collections.

use super::{default_operation, substitute, FieldResolver, ResolverFactory};
use crate::graphql::{
    context::{ExtraVariables, FieldInfo, OperationKind, ResolverContext, Source},
    error::Error,
    operation::Operation,
    resolver::ResolverLocator,
    stage::Stages,
    type_system::{Collection, Data},
    Map, Value,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

/// Builder of collection query resolvers.
///
/// A collection field nested in an item is resolved from the data embedded in the parent if there
/// is any, and otherwise by loading the collection linked to the parent. Security expressions are
/// only evaluated for top-level collections.
#[derive(Clone)]
pub struct CollectionResolverFactory {
    stages: Stages,
    locator: Arc<dyn ResolverLocator>,
}

impl CollectionResolverFactory {
    pub fn new(stages: Stages, locator: Arc<dyn ResolverLocator>) -> Self {
        Self { stages, locator }
    }
}

impl ResolverFactory for CollectionResolverFactory {
    fn create(
        &self,
        resource_class: Option<&str>,
        root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver> {
        Arc::new(CollectionResolver {
            stages: self.stages.clone(),
            locator: self.locator.clone(),
            resource_class: resource_class.map(String::from),
            root_class: root_class.map(String::from),
            operation: operation.cloned().unwrap_or_else(|| {
                default_operation(OperationKind::CollectionQuery, resource_class)
            }),
        })
    }
}

struct CollectionResolver {
    stages: Stages,
    locator: Arc<dyn ResolverLocator>,
    resource_class: Option<String>,
    root_class: Option<String>,
    operation: Operation,
}

impl CollectionResolver {
    async fn run(
        &self,
        class: &str,
        root_class: &str,
        mut context: ResolverContext,
    ) -> Result<Value, Error> {
        let op = &self.operation;
        let mut collection = match self
            .stages
            .read
            .read(Some(class), Some(root_class), op, &context)
            .await?
        {
            Some(Data::Collection(collection)) => collection,
            None => Collection::default(),
            Some(Data::Item(_)) => {
                return Err(Error::contract("Collection from read stage should be iterable."))
            }
        };

        if let Some(id) = op.resolver() {
            collection = match substitute(&*self.locator, id, Some(collection.into()), &context)
                .await?
            {
                Some(Data::Collection(collection)) => collection,
                _ => {
                    return Err(Error::contract(format!(
                        "Custom collection resolver \"{id}\" has to return a collection."
                    )))
                }
            };
        }
        let data = Data::Collection(collection);

        if context.source().is_none() {
            context.set_extra_variables(ExtraVariables::object(Some(data.clone())));
            self.stages.security.check(class, op, &context)?;
            context.set_extra_variables(ExtraVariables::with_previous(
                Some(data.clone()),
                Some(data.clone()),
            ));
            self.stages
                .security_post_denormalize
                .check(class, op, &context)?;
        }

        self.stages
            .serialize
            .serialize(Some(&data), class, op, &context)
    }
}

#[async_trait]
impl FieldResolver for CollectionResolver {
    async fn resolve(
        &self,
        source: Option<&Source>,
        args: &Map,
        info: &FieldInfo,
    ) -> Result<Value, Error> {
        let (Some(class), Some(root_class)) = (&self.resource_class, &self.root_class) else {
            return Ok(Value::Null);
        };
        if let Some(source) = source {
            if let Some(value) = source.embedded(info.field_name()) {
                return Ok(value.clone());
            }
            // A parent which is not an item has nothing to link the collection to. This happens
            // when the field was removed from the parent by field-level security.
            if source.resource_class().is_none() {
                return Ok(Value::Null);
            }
        }

        let context = ResolverContext::new(OperationKind::CollectionQuery, source, args, info);
        let span = tracing::info_span!(
            "collection_query",
            operation = self.operation.name(),
            field = info.field_name()
        );
        self.run(class, root_class, context).instrument(span).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::init_logging;
    use crate::graphql::{
        backend::mock::{map, Backend},
        config::ResolverConfig,
        error::ErrorKind,
        operation::{Pagination, PaginationType},
        pagination::empty_page,
        resolver::ResolverRegistry,
        stage::ReadStage,
        type_system::{Item, PageState},
        value,
    };

    /// A read stage returning a fixed value.
    struct FixedRead(Option<Data>);

    #[async_trait]
    impl ReadStage for FixedRead {
        async fn read(
            &self,
            _: Option<&str>,
            _: Option<&str>,
            _: &Operation,
            _: &ResolverContext,
        ) -> Result<Option<Data>, Error> {
            Ok(self.0.clone())
        }
    }

    fn item(id: &str) -> Item {
        Item::new("Dummy").with_iri(format!("/dummies/{id}"))
    }

    fn factory(backend: &Backend, registry: ResolverRegistry) -> CollectionResolverFactory {
        let config = ResolverConfig::default().with_pagination(Pagination::disabled());
        CollectionResolverFactory::new(
            Stages::new(&config, &backend.collaborators()),
            Arc::new(registry),
        )
    }

    fn op() -> Operation {
        Operation::new(OperationKind::CollectionQuery, "collection_query", "Dummy")
    }

    #[async_std::test]
    async fn test_custom_resolver_result_is_secured() {
        init_logging();
        let backend = Backend::new().with_access_checker(|checker| {
            checker.rule("only_b", |vars| {
                matches!(
                    &vars.object,
                    Some(Data::Collection(c)) if c.items() == [item("b")]
                )
            })
        });
        backend.store.insert(item("a"));
        let registry = ResolverRegistry::new().register(
            "replace",
            |_: Option<Data>, _: &ResolverContext| Ok(Some(Collection::new([item("b")]).into())),
        );
        let op = op().with_resolver("replace").with_security("only_b");

        let value = factory(&backend, registry)
            .create(Some("Dummy"), Some("Dummy"), Some(&op))
            .resolve(None, &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap();
        assert_eq!(value, value!([{ "id": "/dummies/b" }]));
        assert_eq!(
            backend.journal.entries(),
            ["provide", "is_granted:only_b", "normalize"]
        );
    }

    #[async_std::test]
    async fn test_custom_resolver_must_return_collection() {
        let backend = Backend::new();
        let registry = ResolverRegistry::new().register(
            "item",
            |_: Option<Data>, _: &ResolverContext| Ok(Some(item("b").into())),
        );
        let err = factory(&backend, registry)
            .create(Some("Dummy"), Some("Dummy"), Some(&op().with_resolver("item")))
            .resolve(None, &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Contract);
    }

    #[async_std::test]
    async fn test_read_must_return_collection() {
        let backend = Backend::new();
        let config = ResolverConfig::default();
        let stages = Stages::new(&config, &backend.collaborators())
            .with_read(Arc::new(FixedRead(Some(item("a").into()))));
        let err = CollectionResolverFactory::new(stages, Arc::new(ResolverRegistry::new()))
            .create(Some("Dummy"), Some("Dummy"), Some(&op()))
            .resolve(None, &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Collection from read stage should be iterable.");
    }

    #[async_std::test]
    async fn test_embedded_collection() {
        let backend = Backend::new();
        let resolver = factory(&backend, ResolverRegistry::new()).create(
            Some("Dummy"),
            Some("RelatedDummy"),
            Some(&op()),
        );

        let source = Source::new(map(value!({ "dummies": [{ "id": "/dummies/1" }] })));
        let value = resolver
            .resolve(Some(&source), &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap();
        assert_eq!(value, value!([{ "id": "/dummies/1" }]));

        let source = Source::new(map(value!({ "dummies": null })));
        let value = resolver
            .resolve(Some(&source), &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);

        // Neither the field nor the markers needed to load it.
        let value = resolver
            .resolve(Some(&Source::default()), &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
        assert!(backend.journal.entries().is_empty());
    }

    #[async_std::test]
    async fn test_nested_collection_skips_security() {
        let backend = Backend::new().with_access_checker(|checker| checker.deny("nope"));
        backend.store.insert(item("a"));
        let source = Source::new(Map::new())
            .with_resource("RelatedDummy", map(value!({ "id": 1 })));

        let value = factory(&backend, ResolverRegistry::new())
            .create(Some("Dummy"), Some("RelatedDummy"), Some(&op().with_security("nope")))
            .resolve(Some(&source), &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap();
        assert_eq!(value, value!([{ "id": "/dummies/a" }]));
        assert!(!backend.journal.contains("is_granted"));
    }

    #[async_std::test]
    async fn test_top_level_collection_denied() {
        let backend = Backend::new().with_access_checker(|checker| checker.deny("nope"));
        let err = factory(&backend, ResolverRegistry::new())
            .create(Some("Dummy"), Some("Dummy"), Some(&op().with_security("nope")))
            .resolve(None, &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }

    #[async_std::test]
    async fn test_disabled_stages_are_idempotent() {
        let backend = Backend::new();
        backend.store.insert(item("a"));
        let info = FieldInfo::new("dummies");

        let resolver = factory(&backend, ResolverRegistry::new()).create(
            Some("Dummy"),
            Some("Dummy"),
            Some(&op().with_read(false)),
        );
        let once = resolver.resolve(None, &Map::new(), &info).await.unwrap();
        let twice = resolver.resolve(None, &Map::new(), &info).await.unwrap();
        assert_eq!(once, value!([]));
        assert_eq!(once, twice);
        assert!(!backend.journal.contains("provide"));

        let resolver = CollectionResolverFactory::new(
            Stages::new(&ResolverConfig::default(), &backend.collaborators()),
            Arc::new(ResolverRegistry::new()),
        )
        .create(Some("Dummy"), Some("Dummy"), Some(&op().with_serialize(false)));
        let once = resolver.resolve(None, &Map::new(), &info).await.unwrap();
        let twice = resolver.resolve(None, &Map::new(), &info).await.unwrap();
        assert_eq!(once, empty_page(PaginationType::Cursor));
        assert_eq!(once, twice);
        assert!(!backend.journal.contains("normalize"));
    }

    #[async_std::test]
    async fn test_missing_classes() {
        let backend = Backend::new();
        let value = factory(&backend, ResolverRegistry::new())
            .create(Some("Dummy"), None, Some(&op()))
            .resolve(None, &Map::new(), &FieldInfo::new("dummies"))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[async_std::test]
    async fn test_paginated() {
        init_logging();
        let backend = Backend::new().with_page(PageState::new(1, 2, 3));
        backend.store.insert(item("a"));
        backend.store.insert(item("b"));
        let value = CollectionResolverFactory::new(
            Stages::new(&ResolverConfig::default(), &backend.collaborators()),
            Arc::new(ResolverRegistry::new()),
        )
        .create(Some("Dummy"), Some("Dummy"), Some(&op()))
        .resolve(None, &Map::new(), &FieldInfo::new("dummies"))
        .await
        .unwrap();
        assert_eq!(
            value,
            value!({
                "totalCount": 3,
                "edges": [
                    { "node": { "id": "/dummies/a" }, "cursor": "MA==" },
                    { "node": { "id": "/dummies/b" }, "cursor": "MQ==" }
                ],
                "pageInfo": {
                    "startCursor": "MA==",
                    "endCursor": "MQ==",
                    "hasNextPage": true,
                    "hasPreviousPage": false
                }
            })
        );
    }
}
