//! Resolvers for the provider/processor model.
//!
//! Instead of composing the stages itself, a resolver built by [`GenericResolverFactory`] asks a
//! [`Provider`] for the data of an operation and hands it to a [`Processor`], which decides what
//! to do with it and produces the field value. [`PipelineProcessor`] is a processor running the
//! stages that follow read.

use super::{default_operation, FieldResolver, ResolverFactory};
use crate::graphql::{
    backend::{Identifiers, Processor, Provider, SerializerContext, SerializerContextBuilder},
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

/// A processor producing field values.
pub type ValueProcessor = dyn Processor<Output = Value>;

/// Builder of provider/processor resolvers.
#[derive(Clone)]
pub struct GenericResolverFactory {
    provider: Arc<dyn Provider>,
    processor: Arc<ValueProcessor>,
    context_builder: Arc<dyn SerializerContextBuilder>,
}

impl GenericResolverFactory {
    pub fn new(
        provider: Arc<dyn Provider>,
        processor: Arc<ValueProcessor>,
        context_builder: Arc<dyn SerializerContextBuilder>,
    ) -> Self {
        Self {
            provider,
            processor,
            context_builder,
        }
    }
}

impl ResolverFactory for GenericResolverFactory {
    fn create(
        &self,
        resource_class: Option<&str>,
        _root_class: Option<&str>,
        operation: Option<&Operation>,
    ) -> Arc<dyn FieldResolver> {
        Arc::new(GenericResolver {
            factory: self.clone(),
            resource_class: resource_class.map(String::from),
            operation: operation
                .cloned()
                .unwrap_or_else(|| default_operation(OperationKind::ItemQuery, resource_class)),
        })
    }
}

struct GenericResolver {
    factory: GenericResolverFactory,
    resource_class: Option<String>,
    operation: Operation,
}

impl GenericResolver {
    async fn run(&self, context: ResolverContext) -> Result<Value, Error> {
        let mutation = self.operation.kind().is_mutation();
        let class = self
            .resource_class
            .as_deref()
            .unwrap_or(self.operation.class());

        let operation = self
            .operation
            .clone()
            .with_validate(mutation && self.operation.stages().validate);
        let serializer_context = self
            .factory
            .context_builder
            .create(class, &operation, &context, true);
        let identifiers: Identifiers = context
            .identifier()
            .map(|id| [(Name::new("id"), Value::from(id))].into_iter().collect())
            .unwrap_or_default();
        let body = self
            .factory
            .provider
            .provide(&operation, &identifiers, &serializer_context)
            .await?;

        let write = mutation && body.is_some() && operation.stages().write;
        let operation = operation.with_write(write);
        self.factory
            .processor
            .process(body, &operation, &identifiers, &serializer_context)
            .await
    }
}

#[async_trait]
impl FieldResolver for GenericResolver {
    async fn resolve(
        &self,
        source: Option<&Source>,
        args: &Map,
        info: &FieldInfo,
    ) -> Result<Value, Error> {
        if let Some(value) = source.and_then(|source| source.embedded(info.field_name())) {
            if !matches!(value, Value::Null) || self.resource_class.is_none() {
                return Ok(value.clone());
            }
        }

        let context = ResolverContext::new(self.operation.kind(), source, args, info);
        let span = tracing::info_span!(
            "resolve",
            operation = self.operation.name(),
            field = info.field_name()
        );
        self.run(context).instrument(span).await
    }
}

/// A [`Processor`] running the security, validate, write and serialize stages on provided data.
pub struct PipelineProcessor {
    stages: Stages,
}

impl PipelineProcessor {
    pub fn new(stages: Stages) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl Processor for PipelineProcessor {
    type Output = Value;

    async fn process(
        &self,
        data: Option<Data>,
        operation: &Operation,
        _identifiers: &Identifiers,
        context: &SerializerContext,
    ) -> Result<Value, Error> {
        let class = context.resource_class.as_str();
        let mut resolver = context.resolver.clone();
        resolver.set_extra_variables(ExtraVariables::object(data.clone()));
        self.stages.security.check(class, operation, &resolver)?;

        let data = match data {
            Some(Data::Item(item)) if resolver.is_mutation() => {
                self.stages
                    .validate
                    .validate(&item, class, operation, &resolver)?;
                resolver.set_extra_variables(ExtraVariables::with_previous(
                    Some(Data::Item(item.clone())),
                    Some(Data::Item(item.clone())),
                ));
                self.stages
                    .security_post_validation
                    .check(class, operation, &resolver)?;
                self.stages
                    .write
                    .write(Some(item), class, operation, &resolver)
                    .await?
                    .map(Data::Item)
            }
            data => data,
        };

        self.stages
            .serialize
            .serialize(data.as_ref(), class, operation, &resolver)
    }
}
