//! Persisting the item produced by a mutation.

use super::WriteStage;
use crate::graphql::{
    backend::{Identifiers, ItemProcessor, SerializerContextBuilder},
    context::ResolverContext,
    error::Error,
    operation::Operation,
    type_system::{Data, Item},
};
use async_trait::async_trait;
use std::sync::Arc;

/// The default [`WriteStage`], persisting items with a [`Processor`](crate::graphql::backend::Processor).
pub struct Writer {
    processor: Arc<ItemProcessor>,
    context_builder: Arc<dyn SerializerContextBuilder>,
}

impl Writer {
    pub fn new(
        processor: Arc<ItemProcessor>,
        context_builder: Arc<dyn SerializerContextBuilder>,
    ) -> Self {
        Self {
            processor,
            context_builder,
        }
    }
}

#[async_trait]
impl WriteStage for Writer {
    async fn write(
        &self,
        item: Option<Item>,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Option<Item>, Error> {
        let Some(item) = item else {
            return Ok(None);
        };
        if !operation.stages().write {
            return Ok(Some(item));
        }
        tracing::debug!("write {resource_class} {:?}", item.iri());
        let serializer_context = self
            .context_builder
            .create(resource_class, operation, context, false);
        self.processor
            .process(
                Some(Data::Item(item)),
                operation,
                &Identifiers::new(),
                &serializer_context,
            )
            .await
    }
}
