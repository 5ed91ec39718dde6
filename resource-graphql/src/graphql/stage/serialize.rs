//! Serialization of results into the values returned to clients.
//!
//! The shape of the result depends on the operation kind:
//! * item queries return the normalized item, or `null`;
//! * collection queries return a list of normalized items, or a page envelope (see
//!   [`pagination`](crate::graphql::pagination)) if pagination is enabled;
//! * mutations return `{ <shortName>: item, clientMutationId }`, where a deleted item is
//!   represented by its `id` only;
//! * subscriptions return `{ <shortName>: item, clientSubscriptionId }`.
//!
//! A disabled serialize stage still returns a value of the right shape, with no data in it.

use super::SerializeStage;
use crate::graphql::{
    backend::{Normalizer, SerializerContext, SerializerContextBuilder, FORMAT},
    context::{OperationKind, ResolverContext},
    error::Error,
    lcfirst, object,
    operation::{Operation, Pagination, PaginationType},
    pagination::{cursor_page, empty_page, page_based},
    type_system::{Collection, Data, Item},
    Map, Name, Value,
};
use std::sync::Arc;

/// The default [`SerializeStage`], normalizing items with a [`Normalizer`].
pub struct Serializer {
    normalizer: Arc<dyn Normalizer>,
    context_builder: Arc<dyn SerializerContextBuilder>,
    pagination: Pagination,
}

impl Serializer {
    /// A serializer applying `pagination` to collection operations which do not configure their
    /// own.
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        context_builder: Arc<dyn SerializerContextBuilder>,
        pagination: Pagination,
    ) -> Self {
        Self {
            normalizer,
            context_builder,
            pagination,
        }
    }

    fn normalize(&self, item: &Item, context: &SerializerContext) -> Result<Value, Error> {
        match self.normalizer.normalize(item, FORMAT, context)? {
            value @ (Value::Object(_) | Value::Null) => Ok(value),
            _ => Err(Error::contract("Expected serialized data to be a nullable array.")),
        }
    }

    fn normalize_item(
        &self,
        data: Option<&Data>,
        context: &SerializerContext,
    ) -> Result<Value, Error> {
        match data {
            None => Ok(Value::Null),
            Some(Data::Item(item)) => self.normalize(item, context),
            Some(Data::Collection(_)) => Err(Error::contract(
                "Item to serialize should be a nullable object.",
            )),
        }
    }

    fn normalize_collection(
        &self,
        data: Option<&Data>,
        pagination: Pagination,
        context: &SerializerContext,
    ) -> Result<Value, Error> {
        let empty = Collection::default();
        let collection = match data {
            Some(Data::Collection(collection)) => collection,
            None => &empty,
            Some(Data::Item(_)) => {
                return Err(Error::contract("Collection to serialize should be iterable."))
            }
        };
        let nodes = collection
            .into_iter()
            .map(|item| self.normalize(item, context))
            .collect::<Result<Vec<_>, _>>()?;
        if !pagination.enabled {
            return Ok(Value::List(nodes));
        }

        let Some(page) = collection.page() else {
            return Err(Error::contract(
                "Collection returned by the collection data provider must implement a paginator.",
            ));
        };
        match pagination.kind {
            PaginationType::Cursor => cursor_page(nodes, page, context.resolver.args()),
            PaginationType::Page => page_based(nodes, page),
        }
    }

    fn pagination(&self, operation: &Operation) -> Pagination {
        operation.pagination().unwrap_or(self.pagination)
    }

    /// The value of a disabled serialize stage.
    fn empty(&self, operation: &Operation, context: &ResolverContext) -> Value {
        match context.kind() {
            OperationKind::ItemQuery => Value::Null,
            OperationKind::CollectionQuery => {
                let pagination = self.pagination(operation);
                if pagination.enabled {
                    empty_page(pagination.kind)
                } else {
                    Value::List(vec![])
                }
            }
            OperationKind::Mutation => object([("clientMutationId", Value::Null)]),
            OperationKind::Subscription => object([("clientSubscriptionId", Value::Null)]),
        }
    }
}

impl SerializeStage for Serializer {
    fn serialize(
        &self,
        data: Option<&Data>,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Value, Error> {
        if !operation.stages().serialize {
            return Ok(self.empty(operation, context));
        }
        tracing::debug!("serialize {resource_class} ({})", context.kind());

        let normalization_context =
            self.context_builder
                .create(resource_class, operation, context, true);
        let (body, client_id) = match context.kind() {
            OperationKind::ItemQuery => return self.normalize_item(data, &normalization_context),
            OperationKind::CollectionQuery => {
                return self.normalize_collection(
                    data,
                    self.pagination(operation),
                    &normalization_context,
                )
            }
            OperationKind::Mutation if operation.is_delete() => {
                let id = context.identifier().map(Value::from).unwrap_or(Value::Null);
                (
                    object([("id", id)]),
                    ("clientMutationId", context.client_mutation_id()),
                )
            }
            OperationKind::Mutation => (
                self.normalize_item(data, &normalization_context)?,
                ("clientMutationId", context.client_mutation_id()),
            ),
            OperationKind::Subscription => (
                self.normalize_item(data, &normalization_context)?,
                ("clientSubscriptionId", context.client_subscription_id()),
            ),
        };

        let mut payload = Map::new();
        payload.insert(Name::new(lcfirst(operation.short_name())), body);
        payload.insert(Name::new(client_id.0), client_id.1);
        Ok(Value::Object(payload))
    }
}
