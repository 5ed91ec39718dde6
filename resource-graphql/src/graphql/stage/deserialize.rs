//! Deserialization of mutation input into items.

use super::DeserializeStage;
use crate::graphql::{
    backend::{Denormalizer, SerializerContextBuilder, FORMAT},
    context::ResolverContext,
    error::Error,
    operation::Operation,
    type_system::Item,
    Value,
};
use std::sync::Arc;

/// The default [`DeserializeStage`], denormalizing `args.input` with a [`Denormalizer`].
///
/// The item read before deserialization, if any, is passed as the object to populate, so that
/// partial updates are merged onto it rather than creating a new item.
pub struct Deserializer {
    denormalizer: Arc<dyn Denormalizer>,
    context_builder: Arc<dyn SerializerContextBuilder>,
}

impl Deserializer {
    pub fn new(
        denormalizer: Arc<dyn Denormalizer>,
        context_builder: Arc<dyn SerializerContextBuilder>,
    ) -> Self {
        Self {
            denormalizer,
            context_builder,
        }
    }
}

impl DeserializeStage for Deserializer {
    fn deserialize(
        &self,
        item: Option<Item>,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Option<Item>, Error> {
        if !operation.stages().deserialize {
            return Ok(item);
        }

        let mut denormalization_context =
            self.context_builder
                .create(resource_class, operation, context, false);
        denormalization_context.object_to_populate = item;

        let input = context
            .input()
            .cloned()
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(Default::default()));
        tracing::debug!("deserialize {resource_class}");
        self.denormalizer
            .denormalize(&input, resource_class, FORMAT, &denormalization_context)
            .map(Some)
    }
}
