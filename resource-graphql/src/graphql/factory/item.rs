//! Item query resolvers.

use super::{
    custom_item, default_operation, expect_item, substitute, FieldResolver, ResolverFactory,
};
use crate::graphql::{
    context::{ExtraVariables, FieldInfo, OperationKind, ResolverContext, Source},
    error::Error,
    operation::Operation,
    resolver::ResolverLocator,
    stage::Stages,
    type_system::{short_name_of, Data, Item},
    Map, Value,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

/// Builder of item query resolvers.
#[derive(Clone)]
pub struct ItemResolverFactory {
    stages: Stages,
    locator: Arc<dyn ResolverLocator>,
}

impl ItemResolverFactory {
    pub fn new(stages: Stages, locator: Arc<dyn ResolverLocator>) -> Self {
        Self { stages, locator }
    }
}

impl ResolverFactory for ItemResolverFactory {
    fn create(
        &self,
        resource_class: Option<&str>,
        _root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver> {
        Arc::new(ItemResolver {
            stages: self.stages.clone(),
            locator: self.locator.clone(),
            resource_class: resource_class.map(String::from),
            operation: operation
                .cloned()
                .unwrap_or_else(|| default_operation(OperationKind::ItemQuery, resource_class)),
        })
    }
}

struct ItemResolver {
    stages: Stages,
    locator: Arc<dyn ResolverLocator>,
    resource_class: Option<String>,
    operation: Operation,
}

impl ItemResolver {
    /// The class of the resolved item, checked against the declared resource class.
    fn resource_class(&self, item: Option<&Item>) -> Result<String, Error> {
        match (item, &self.resource_class) {
            (None, None) => Err(Error::unexpected("Resource class cannot be determined.")),
            (None, Some(class)) => Ok(class.clone()),
            (Some(item), None) => Ok(item.class().to_string()),
            (Some(item), Some(class)) if item.is_a(class) => Ok(class.clone()),
            (Some(item), Some(class)) => Err(Error::unexpected(format!(
                "Resolver only handles items of class {} but retrieved item is of class {}.",
                short_name_of(class),
                item.short_name()
            ))),
        }
    }

    async fn run(&self, mut context: ResolverContext) -> Result<Value, Error> {
        let op = &self.operation;
        let data = self
            .stages
            .read
            .read(self.resource_class.as_deref(), None, op, &context)
            .await?;
        let mut item = expect_item(data)?;
        let mut class = self.resource_class(item.as_ref())?;

        if let Some(id) = op.resolver() {
            let data = substitute(&*self.locator, id, item.map(Data::Item), &context).await?;
            item = custom_item(data, "query", id, &class)?;
            if let Some(item) = &item {
                class = item.class().to_string();
            }
        }

        let Some(item) = item else {
            return self.stages.serialize.serialize(None, &class, op, &context);
        };
        let data = Data::Item(item);

        context.set_extra_variables(ExtraVariables::object(Some(data.clone())));
        self.stages.security.check(&class, op, &context)?;
        context.set_extra_variables(ExtraVariables::with_previous(
            Some(data.clone()),
            Some(data.clone()),
        ));
        self.stages
            .security_post_denormalize
            .check(&class, op, &context)?;

        self.stages
            .serialize
            .serialize(Some(&data), &class, op, &context)
    }
}

#[async_trait]
impl FieldResolver for ItemResolver {
    async fn resolve(
        &self,
        source: Option<&Source>,
        args: &Map,
        info: &FieldInfo,
    ) -> Result<Value, Error> {
        // Data already fetched and normalized with the parent.
        if let Some(value) = source.and_then(|source| source.embedded(info.field_name())) {
            return Ok(value.clone());
        }

        let context = ResolverContext::new(OperationKind::ItemQuery, source, args, info);
        let span = tracing::info_span!(
            "item_query",
            operation = self.operation.name(),
            field = info.field_name()
        );
        self.run(context).instrument(span).await
    }
}
