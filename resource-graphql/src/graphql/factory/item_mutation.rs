//! Item mutation resolvers, including deletes.

use super::{custom_item, expect_item, substitute, FieldResolver, ResolverFactory};
use crate::graphql::{
    context::{ExtraVariables, FieldInfo, OperationKind, ResolverContext, Source},
    error::Error,
    operation::Operation,
    resolver::ResolverLocator,
    stage::Stages,
    type_system::Data,
    Map, Value,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::Instrument;

/// Builder of item mutation resolvers.
#[derive(Clone)]
pub struct ItemMutationResolverFactory {
    stages: Stages,
    locator: Arc<dyn ResolverLocator>,
}

impl ItemMutationResolverFactory {
    pub fn new(stages: Stages, locator: Arc<dyn ResolverLocator>) -> Self {
        Self { stages, locator }
    }
}

impl ResolverFactory for ItemMutationResolverFactory {
    fn create(
        &self,
        resource_class: Option<&str>,
        _root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver> {
        Arc::new(ItemMutationResolver {
            stages: self.stages.clone(),
            locator: self.locator.clone(),
            resource_class: resource_class.map(String::from),
            operation: operation.cloned(),
        })
    }
}

struct ItemMutationResolver {
    stages: Stages,
    locator: Arc<dyn ResolverLocator>,
    resource_class: Option<String>,
    operation: Option<Operation>,
}

impl ItemMutationResolver {
    async fn run(
        &self,
        class: &str,
        op: &Operation,
        mut context: ResolverContext,
    ) -> Result<Value, Error> {
        let stages = &self.stages;
        let item = expect_item(stages.read.read(Some(class), None, op, &context).await?)?;
        let previous = item.clone().map(Data::Item);

        context.set_extra_variables(ExtraVariables::object(previous.clone()));
        stages.security.check(class, op, &context)?;

        if op.is_delete() {
            let item = stages.write.write(item, class, op, &context).await?;
            return stages
                .serialize
                .serialize(item.map(Data::Item).as_ref(), class, op, &context);
        }

        let mut item = stages.deserialize.deserialize(item, class, op, &context)?;
        context.set_extra_variables(ExtraVariables::with_previous(
            item.clone().map(Data::Item),
            previous.clone(),
        ));
        stages.security_post_denormalize.check(class, op, &context)?;

        if let Some(id) = op.resolver() {
            let data = substitute(&*self.locator, id, item.map(Data::Item), &context).await?;
            item = custom_item(data, "mutation", id, class)?;
        }

        let Some(item) = item else {
            return stages.serialize.serialize(None, class, op, &context);
        };
        stages.validate.validate(&item, class, op, &context)?;
        context.set_extra_variables(ExtraVariables::with_previous(
            Some(Data::Item(item.clone())),
            previous,
        ));
        stages.security_post_validation.check(class, op, &context)?;

        let item = stages.write.write(Some(item), class, op, &context).await?;
        stages
            .serialize
            .serialize(item.map(Data::Item).as_ref(), class, op, &context)
    }
}

#[async_trait]
impl FieldResolver for ItemMutationResolver {
    async fn resolve(
        &self,
        source: Option<&Source>,
        args: &Map,
        info: &FieldInfo,
    ) -> Result<Value, Error> {
        let (Some(class), Some(op)) = (&self.resource_class, &self.operation) else {
            return Ok(Value::Null);
        };

        let context = ResolverContext::new(OperationKind::Mutation, source, args, info);
        let span = tracing::info_span!(
            "mutation",
            operation = op.name(),
            field = info.field_name()
        );
        self.run(class, op, context).instrument(span).await
    }
}
