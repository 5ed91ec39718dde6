//! Immutable descriptors of the GraphQL operations exposed on a resource.

use super::{
    context::OperationKind,
    resolver::ResolverId,
    type_system::{short_name_of, Resource},
};
use std::sync::Arc;

/// Which stages of the pipeline run for an operation.
///
/// Every stage reads exactly one of these flags. A disabled stage is a pure pass-through (or, for
/// serialization, produces the empty shape of the operation kind).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageToggles {
    pub read: bool,
    pub deserialize: bool,
    pub validate: bool,
    pub write: bool,
    pub serialize: bool,
}

impl Default for StageToggles {
    fn default() -> Self {
        Self {
            read: true,
            deserialize: true,
            validate: true,
            write: true,
            serialize: true,
        }
    }
}

/// The shape of a paginated collection envelope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PaginationType {
    /// Relay-style `edges`/`pageInfo` envelope addressed by opaque cursors.
    #[default]
    Cursor,
    /// `collection`/`paginationInfo` envelope addressed by page numbers.
    Page,
}

/// How a collection query paginates its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pagination {
    pub enabled: bool,
    pub kind: PaginationType,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: PaginationType::Cursor,
        }
    }
}

impl Pagination {
    /// Collections are returned as plain lists.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Live updates for a subscription, pushed through a Mercure hub.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mercure {
    /// The named hub to publish through. The default hub is used if this is [`None`].
    pub hub: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct OperationData {
    kind: OperationKind,
    name: String,
    class: String,
    short_name: String,
    resolver: Option<ResolverId>,
    stages: StageToggles,
    security: Option<String>,
    security_post_denormalize: Option<String>,
    security_post_validation: Option<String>,
    mercure: Option<Mercure>,
    delete: bool,
    pagination: Option<Pagination>,
    validation_groups: Option<Vec<String>>,
    normalization_groups: Option<Vec<String>>,
    denormalization_groups: Option<Vec<String>>,
}

/// An operation exposed on a resource.
///
/// Operations are built once from resource metadata, when the schema is built, and never change
/// afterwards. Every `with_` method returns a new operation and leaves the original untouched;
/// clones share their data until one of them is modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation(Arc<OperationData>);

impl Operation {
    /// An operation of kind `kind` named `name` on the resource class `class`.
    ///
    /// The short name defaults to the last path segment of `class`.
    pub fn new(kind: OperationKind, name: impl Into<String>, class: impl Into<String>) -> Self {
        let class = class.into();
        Self(Arc::new(OperationData {
            kind,
            name: name.into(),
            short_name: short_name_of(&class).to_string(),
            class,
            resolver: None,
            stages: Default::default(),
            security: None,
            security_post_denormalize: None,
            security_post_validation: None,
            mercure: None,
            delete: false,
            pagination: None,
            validation_groups: None,
            normalization_groups: None,
            denormalization_groups: None,
        }))
    }

    /// An operation on the resource `R`.
    pub fn for_resource<R: Resource>(kind: OperationKind, name: impl Into<String>) -> Self {
        Self::new(kind, name, R::CLASS).with_short_name(R::SHORT_NAME)
    }

    /// A delete mutation on the resource class `class`.
    pub fn delete(class: impl Into<String>) -> Self {
        Self::new(OperationKind::Mutation, "delete", class).with_delete(true)
    }

    fn update(mut self, f: impl FnOnce(&mut OperationData)) -> Self {
        f(Arc::make_mut(&mut self.0));
        self
    }

    pub fn with_short_name(self, short_name: impl Into<String>) -> Self {
        let short_name = short_name.into();
        self.update(|op| op.short_name = short_name)
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.update(|op| op.name = name)
    }

    /// Substitute the custom resolver `resolver` into the pipeline.
    pub fn with_resolver(self, resolver: impl Into<ResolverId>) -> Self {
        let resolver = resolver.into();
        self.update(|op| op.resolver = Some(resolver))
    }

    pub fn with_stages(self, stages: StageToggles) -> Self {
        self.update(|op| op.stages = stages)
    }

    pub fn with_read(self, read: bool) -> Self {
        self.update(|op| op.stages.read = read)
    }

    pub fn with_deserialize(self, deserialize: bool) -> Self {
        self.update(|op| op.stages.deserialize = deserialize)
    }

    pub fn with_validate(self, validate: bool) -> Self {
        self.update(|op| op.stages.validate = validate)
    }

    pub fn with_write(self, write: bool) -> Self {
        self.update(|op| op.stages.write = write)
    }

    pub fn with_serialize(self, serialize: bool) -> Self {
        self.update(|op| op.stages.serialize = serialize)
    }

    pub fn with_security(self, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        self.update(|op| op.security = Some(expression))
    }

    pub fn with_security_post_denormalize(self, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        self.update(|op| op.security_post_denormalize = Some(expression))
    }

    pub fn with_security_post_validation(self, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        self.update(|op| op.security_post_validation = Some(expression))
    }

    pub fn with_mercure(self, mercure: Mercure) -> Self {
        self.update(|op| op.mercure = Some(mercure))
    }

    pub fn with_delete(self, delete: bool) -> Self {
        self.update(|op| op.delete = delete)
    }

    pub fn with_pagination(self, pagination: Pagination) -> Self {
        self.update(|op| op.pagination = Some(pagination))
    }

    pub fn with_validation_groups<I>(self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let groups = groups.into_iter().map(Into::into).collect();
        self.update(|op| op.validation_groups = Some(groups))
    }

    pub fn with_normalization_groups<I>(self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let groups = groups.into_iter().map(Into::into).collect();
        self.update(|op| op.normalization_groups = Some(groups))
    }

    pub fn with_denormalization_groups<I>(self, groups: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let groups = groups.into_iter().map(Into::into).collect();
        self.update(|op| op.denormalization_groups = Some(groups))
    }

    pub fn kind(&self) -> OperationKind {
        self.0.kind
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn class(&self) -> &str {
        &self.0.class
    }

    pub fn short_name(&self) -> &str {
        &self.0.short_name
    }

    pub fn resolver(&self) -> Option<&ResolverId> {
        self.0.resolver.as_ref()
    }

    pub fn stages(&self) -> StageToggles {
        self.0.stages
    }

    pub fn security(&self) -> Option<&str> {
        self.0.security.as_deref()
    }

    pub fn security_post_denormalize(&self) -> Option<&str> {
        self.0.security_post_denormalize.as_deref()
    }

    pub fn security_post_validation(&self) -> Option<&str> {
        self.0.security_post_validation.as_deref()
    }

    pub fn mercure(&self) -> Option<&Mercure> {
        self.0.mercure.as_ref()
    }

    pub fn is_delete(&self) -> bool {
        self.0.delete
    }

    /// The pagination configured on this operation, if it overrides the global default.
    pub fn pagination(&self) -> Option<Pagination> {
        self.0.pagination
    }

    pub fn validation_groups(&self) -> Option<&[String]> {
        self.0.validation_groups.as_deref()
    }

    pub fn normalization_groups(&self) -> Option<&[String]> {
        self.0.normalization_groups.as_deref()
    }

    pub fn denormalization_groups(&self) -> Option<&[String]> {
        self.0.denormalization_groups.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_with_returns_new_value() {
        let op = Operation::new(OperationKind::ItemQuery, "item_query", "app::Dummy");
        let secured = op.clone().with_security("is_granted('ROLE_ADMIN')");

        assert_eq!(op.security(), None);
        assert_eq!(secured.security(), Some("is_granted('ROLE_ADMIN')"));
        assert_eq!(op.short_name(), "Dummy");
        assert_eq!(secured.name(), "item_query");
    }

    #[test]
    fn test_stage_toggles() {
        let op = Operation::new(OperationKind::Mutation, "create", "Dummy");
        assert_eq!(op.stages(), StageToggles::default());

        let op = op.with_validate(false).with_write(false);
        assert!(op.stages().read);
        assert!(op.stages().deserialize);
        assert!(!op.stages().validate);
        assert!(!op.stages().write);
        assert!(op.stages().serialize);
    }

    #[test]
    fn test_delete() {
        let op = Operation::delete("app::Dummy");
        assert!(op.is_delete());
        assert_eq!(op.kind(), OperationKind::Mutation);
        assert_eq!(op.name(), "delete");
    }
}
