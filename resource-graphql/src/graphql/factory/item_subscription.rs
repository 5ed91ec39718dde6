//! Item subscription resolvers and their Mercure URLs.

use super::{expect_item, FieldResolver, ResolverFactory};
use crate::graphql::{
    backend::{SubscriptionManager, SubscriptionUrlGenerator},
    context::{ExtraVariables, FieldInfo, OperationKind, ResolverContext, Source},
    error::Error,
    operation::Operation,
    stage::Stages,
    type_system::Data,
    Map, Name, Value,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

/// The key under which the URL to listen on for updates is added to a subscription payload.
pub const MERCURE_URL: &str = "mercureUrl";

/// Builder of item subscription resolvers.
///
/// If the operation enables Mercure, the resolver registers the subscription with the
/// [`SubscriptionManager`] and tells the client where to listen for updates.
#[derive(Clone)]
pub struct ItemSubscriptionResolverFactory {
    stages: Stages,
    subscription_manager: Option<Arc<dyn SubscriptionManager>>,
    url_generator: Option<Arc<dyn SubscriptionUrlGenerator>>,
}

impl ItemSubscriptionResolverFactory {
    pub fn new(
        stages: Stages,
        subscription_manager: Option<Arc<dyn SubscriptionManager>>,
        url_generator: Option<Arc<dyn SubscriptionUrlGenerator>>,
    ) -> Self {
        Self {
            stages,
            subscription_manager,
            url_generator,
        }
    }
}

impl ResolverFactory for ItemSubscriptionResolverFactory {
    fn create(
        &self,
        resource_class: Option<&str>,
        _root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver> {
        Arc::new(ItemSubscriptionResolver {
            factory: self.clone(),
            resource_class: resource_class.map(String::from),
            operation: operation.cloned(),
        })
    }
}

struct ItemSubscriptionResolver {
    factory: ItemSubscriptionResolverFactory,
    resource_class: Option<String>,
    operation: Option<Operation>,
}

impl ItemSubscriptionResolver {
    async fn run(
        &self,
        class: &str,
        op: &Operation,
        mut context: ResolverContext,
    ) -> Result<Value, Error> {
        let stages = &self.factory.stages;
        let item = expect_item(stages.read.read(Some(class), None, op, &context).await?)?;
        let data = item.map(Data::Item);

        context.set_extra_variables(ExtraVariables::object(data.clone()));
        stages.security.check(class, op, &context)?;
        let result = stages
            .serialize
            .serialize(data.as_ref(), class, op, &context)?;

        let Some(mercure) = op.mercure() else {
            return Ok(result);
        };
        let Some(manager) = &self.factory.subscription_manager else {
            return Err(Error::configuration(
                "Cannot use Mercure for subscriptions when no subscription manager is installed.",
            ));
        };
        let Some(subscription_id) = manager.retrieve_subscription_id(&context, &result).await?
        else {
            return Ok(result);
        };
        let Some(generator) = &self.factory.url_generator else {
            return Err(Error::configuration(
                "Cannot use Mercure for subscriptions when no subscription URL generator is installed.",
            ));
        };

        let url = generator.generate_url(&subscription_id, mercure.hub.as_deref())?;
        tracing::info!("subscription {subscription_id} listens on {url}");
        let Value::Object(mut payload) = result else {
            return Err(Error::contract(
                "Expected serialized subscription payload to be an object.",
            ));
        };
        payload.insert(Name::new(MERCURE_URL), Value::from(url.to_string()));
        Ok(Value::Object(payload))
    }
}

#[async_trait]
impl FieldResolver for ItemSubscriptionResolver {
    async fn resolve(
        &self,
        source: Option<&Source>,
        args: &Map,
        info: &FieldInfo,
    ) -> Result<Value, Error> {
        let (Some(class), Some(op)) = (&self.resource_class, &self.operation) else {
            return Ok(Value::Null);
        };

        let context = ResolverContext::new(OperationKind::Subscription, source, args, info);
        let span = tracing::info_span!(
            "subscription",
            operation = op.name(),
            field = info.field_name()
        );
        self.run(class, op, context).instrument(span).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::init_logging;
    use crate::graphql::{
        backend::mock::{map, Backend, Hubs},
        config::ResolverConfig,
        error::ErrorKind,
        operation::Mercure,
        type_system::Item,
        value,
    };
    use url::Url;

    fn factory(backend: &Backend) -> ItemSubscriptionResolverFactory {
        let collaborators = backend.collaborators();
        ItemSubscriptionResolverFactory::new(
            Stages::new(&ResolverConfig::default(), &collaborators),
            collaborators.subscription_manager.clone(),
            collaborators.url_generator.clone(),
        )
    }

    fn hub() -> Url {
        Url::parse("https://hub.example.com/.well-known/mercure").unwrap()
    }

    fn args() -> Map {
        map(value!({ "input": { "id": "/dummies/1", "clientSubscriptionId": "s1" } }))
    }

    fn op() -> Operation {
        Operation::new(OperationKind::Subscription, "update_subscription", "Dummy")
    }

    async fn resolve(backend: &Backend, op: &Operation) -> Result<Value, Error> {
        backend
            .store
            .insert(Item::new("Dummy").with_iri("/dummies/1"));
        factory(backend)
            .create(Some("Dummy"), None, Some(op))
            .resolve(None, &args(), &FieldInfo::new("updateDummySubscribe"))
            .await
    }

    #[async_std::test]
    async fn test_without_mercure() {
        let backend = Backend::new();
        let value = resolve(&backend, &op()).await.unwrap();
        assert_eq!(
            value,
            value!({ "dummy": { "id": "/dummies/1" }, "clientSubscriptionId": "s1" })
        );
        assert_eq!(backend.journal.entries(), ["provide", "normalize"]);
    }

    #[async_std::test]
    async fn test_mercure_url() {
        init_logging();
        let backend = Backend::new()
            .with_subscriptions(Some("abc"))
            .with_hubs(hub());
        let value = resolve(&backend, &op().with_mercure(Mercure::default()))
            .await
            .unwrap();
        let Value::Object(payload) = value else {
            panic!("expected an object")
        };
        let Value::String(url) = &payload[MERCURE_URL] else {
            panic!("expected a URL")
        };
        let url = Url::parse(url).unwrap();
        assert_eq!(url.host_str(), Some("hub.example.com"));
        assert_eq!(
            url.query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect::<Vec<_>>(),
            [(
                "topic".to_string(),
                "http://localhost/subscriptions/abc".to_string()
            )]
        );
        assert_eq!(payload["clientSubscriptionId"], Value::from("s1"));
    }

    #[async_std::test]
    async fn test_no_subscription_id() {
        let backend = Backend::new().with_subscriptions(None);
        let value = resolve(&backend, &op().with_mercure(Mercure::default()))
            .await
            .unwrap();
        assert_eq!(
            value,
            value!({ "dummy": { "id": "/dummies/1" }, "clientSubscriptionId": "s1" })
        );
        assert!(backend.journal.contains("subscription_id"));
        assert!(!backend.journal.contains("generate_url"));
    }

    #[async_std::test]
    async fn test_missing_url_generator() {
        let backend = Backend::new().with_subscriptions(Some("abc"));
        let err = resolve(&backend, &op().with_mercure(Mercure::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[async_std::test]
    async fn test_missing_subscription_manager() {
        let backend = Backend::new().with_hubs(hub());
        let err = resolve(&backend, &op().with_mercure(Mercure::default()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[async_std::test]
    async fn test_named_hub() {
        let mut backend = Backend::new().with_subscriptions(Some("abc"));
        backend.hubs = Some(
            Hubs::new(backend.journal.clone(), hub()).with_hub(
                "managed",
                Url::parse("https://managed.example.com/mercure").unwrap(),
            ),
        );
        let op = op().with_mercure(Mercure {
            hub: Some("managed".into()),
        });
        let Value::Object(payload) = resolve(&backend, &op).await.unwrap() else {
            panic!("expected an object")
        };
        assert!(matches!(
            &payload[MERCURE_URL],
            Value::String(url) if url.starts_with("https://managed.example.com/mercure?topic=")
        ));
    }

    #[async_std::test]
    async fn test_disabled_stages_are_idempotent() {
        let backend = Backend::new();
        let info = FieldInfo::new("updateDummySubscribe");

        let once = resolve(&backend, &op().with_read(false)).await.unwrap();
        let twice = resolve(&backend, &op().with_read(false)).await.unwrap();
        assert_eq!(once, value!({ "dummy": null, "clientSubscriptionId": "s1" }));
        assert_eq!(once, twice);
        assert!(!backend.journal.contains("provide"));

        let resolver =
            factory(&backend).create(Some("Dummy"), None, Some(&op().with_serialize(false)));
        let once = resolver.resolve(None, &args(), &info).await.unwrap();
        let twice = resolver.resolve(None, &args(), &info).await.unwrap();
        assert_eq!(once, value!({ "clientSubscriptionId": null }));
        assert_eq!(once, twice);
        assert!(!backend.journal.contains("normalize"));
    }

    #[async_std::test]
    async fn test_not_found() {
        let backend = Backend::new();
        let err = factory(&backend)
            .create(Some("Dummy"), None, Some(&op()))
            .resolve(None, &args(), &FieldInfo::new("updateDummySubscribe"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
