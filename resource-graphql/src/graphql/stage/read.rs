//! Loading the data an operation works on.

use super::ReadStage;
use crate::graphql::{
    backend::{Identifiers, Link, Provider, SerializerContextBuilder},
    context::ResolverContext,
    error::Error,
    operation::Operation,
    type_system::{Collection, Data},
    Map, Name, Value,
};
use async_trait::async_trait;
use std::sync::Arc;

/// The default [`ReadStage`], loading data through a [`Provider`].
pub struct Reader {
    provider: Arc<dyn Provider>,
    context_builder: Arc<dyn SerializerContextBuilder>,
    nesting_separator: String,
}

impl Reader {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: Arc<dyn SerializerContextBuilder>,
        nesting_separator: &str,
    ) -> Self {
        Self {
            provider,
            context_builder,
            nesting_separator: nesting_separator.to_string(),
        }
    }
}

#[async_trait]
impl ReadStage for Reader {
    async fn read(
        &self,
        resource_class: Option<&str>,
        root_class: Option<&str>,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Option<Data>, Error> {
        if !operation.stages().read {
            return Ok(context
                .is_collection()
                .then(|| Collection::default().into()));
        }

        let class = resource_class.unwrap_or(operation.class());
        let mut serializer_context = self.context_builder.create(class, operation, context, true);

        if !context.is_collection() {
            let Some(id) = context.identifier() else {
                return Ok(None);
            };
            tracing::debug!("read {class} {id}");
            let identifiers: Identifiers = [(Name::new("id"), Value::from(id.as_str()))]
                .into_iter()
                .collect();
            let item = match self
                .provider
                .provide(operation, &identifiers, &serializer_context)
                .await?
            {
                Some(Data::Item(item)) => Some(item),
                Some(Data::Collection(_)) => {
                    return Err(Error::contract(
                        "Item from read stage should be a nullable object.",
                    ))
                }
                None => None,
            };

            if context.is_mutation() || context.is_subscription() {
                let Some(item) = &item else {
                    return Err(Error::not_found(format!("Item \"{id}\" not found.")));
                };
                if resource_class.map_or(false, |class| !item.is_a(class)) {
                    return Err(Error::unexpected(format!(
                        "Item \"{id}\" did not match expected type \"{}\".",
                        operation.short_name()
                    )));
                }
            }
            return Ok(item.map(Data::Item));
        }

        if root_class.is_none() {
            return Ok(Some(Collection::default().into()));
        }

        serializer_context.filters = Some(normalize_filters(
            context.args(),
            &self.nesting_separator,
        ));
        let mut identifiers = Identifiers::new();
        if let Some(source) = context.source() {
            if let Some(parent) = source.resource_class() {
                identifiers = source.identifiers().clone();
                serializer_context.link = Some(Link {
                    class: parent.to_string(),
                    property: context.info().field_name().to_string(),
                });
            }
        }
        tracing::debug!("read collection {class} link={:?}", serializer_context.link);
        Ok(Some(
            self.provider
                .provide(operation, &identifiers, &serializer_context)
                .await?
                .unwrap_or_else(|| Collection::default().into()),
        ))
    }
}

/// Normalize collection arguments into the filters passed to the provider.
///
/// GraphQL cannot express repeated keys, so filters which need them (e.g. ordering by several
/// properties) are passed as a list of objects. Such a list is merged into a single object, in
/// which the first occurrence of a key wins. A `_list` suffix on the name of a list argument is
/// dropped. Argument names containing `separator` also get an alias with the separator replaced
/// by `.`, naming a nested property.
pub fn normalize_filters(args: &Map, separator: &str) -> Map {
    let mut filters = Map::new();
    for (name, value) in args {
        let mut name = name.as_str();
        let value = match value {
            Value::List(list) => {
                name = name.strip_suffix("_list").unwrap_or(name);
                match merge_objects(list) {
                    Some(merged) => Value::Object(normalize_filters(&merged, separator)),
                    None => Value::List(list.clone()),
                }
            }
            Value::Object(object) => Value::Object(normalize_filters(object, separator)),
            value => value.clone(),
        };

        let nested = !separator.is_empty() && matches!(name.find(separator), Some(i) if i > 0);
        if nested {
            filters.insert(Name::new(name), value.clone());
            filters
                .entry(Name::new(name.replace(separator, ".")))
                .or_insert(value);
        } else {
            filters.insert(Name::new(name), value);
        }
    }
    filters
}

/// Merge a non-empty list of objects into one, keeping the first value of each key.
fn merge_objects(list: &[Value]) -> Option<Map> {
    if list.is_empty() {
        return None;
    }
    let mut merged = Map::new();
    for value in list {
        let Value::Object(object) = value else {
            return None;
        };
        for (key, value) in object {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    Some(merged)
}
