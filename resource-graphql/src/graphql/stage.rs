//! The stages of the resolution pipeline.
//!
//! Each stage is a single-purpose unit with one input/output contract and one failure mode. The
//! [factories](super::factory) compose them per operation kind, in this order:
//!
//! ```text
//! read → [custom resolver] → security → deserialize → security (post denormalize)
//!      → validate → security (post validation) → write → serialize
//! ```
//!
//! Stages are trait objects bundled in [`Stages`], so any of them can be replaced, for instance by
//! a fake in tests. The default implementations in the submodules delegate to the
//! [collaborators](super::backend).

use super::{
    backend::Collaborators,
    config::ResolverConfig,
    context::ResolverContext,
    error::Error,
    operation::Operation,
    type_system::{Data, Item},
    Value,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod deserialize;
pub mod read;
pub mod security;
pub mod serialize;
pub mod validate;
pub mod write;

pub use deserialize::Deserializer;
pub use read::{normalize_filters, Reader};
pub use security::{Checkpoint, Security};
pub use serialize::Serializer;
pub use validate::Validation;
pub use write::Writer;

/// Load the item or collection an operation targets.
#[async_trait]
pub trait ReadStage: Send + Sync {
    /// Returns [`None`] for an item operation without identifier. Collection operations always
    /// return a collection.
    async fn read(
        &self,
        resource_class: Option<&str>,
        root_class: Option<&str>,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Option<Data>, Error>;
}

/// Evaluate one of the security expressions of an operation.
pub trait SecurityStage: Send + Sync {
    /// Fails with [`Error::AccessDenied`] if the expression does not hold for the extra variables
    /// currently set on `context`.
    fn check(
        &self,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<(), Error>;
}

/// Turn the `input` argument of a mutation into an item.
pub trait DeserializeStage: Send + Sync {
    fn deserialize(
        &self,
        item: Option<Item>,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Option<Item>, Error>;
}

/// Check an item against its constraints.
pub trait ValidateStage: Send + Sync {
    fn validate(
        &self,
        item: &Item,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<(), Error>;
}

/// Persist the item produced by a mutation.
#[async_trait]
pub trait WriteStage: Send + Sync {
    async fn write(
        &self,
        item: Option<Item>,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Option<Item>, Error>;
}

/// Produce the value returned to the client.
pub trait SerializeStage: Send + Sync {
    fn serialize(
        &self,
        data: Option<&Data>,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<Value, Error>;
}

/// The full set of stages the factories compose.
#[derive(Clone)]
pub struct Stages {
    pub read: Arc<dyn ReadStage>,
    pub security: Arc<dyn SecurityStage>,
    pub security_post_denormalize: Arc<dyn SecurityStage>,
    pub security_post_validation: Arc<dyn SecurityStage>,
    pub deserialize: Arc<dyn DeserializeStage>,
    pub validate: Arc<dyn ValidateStage>,
    pub write: Arc<dyn WriteStage>,
    pub serialize: Arc<dyn SerializeStage>,
}

impl Stages {
    /// The default stages, delegating to `collaborators`.
    pub fn new(config: &ResolverConfig, collaborators: &Collaborators) -> Self {
        let security = |checkpoint| -> Arc<dyn SecurityStage> {
            Arc::new(Security::new(
                checkpoint,
                collaborators.access_checker.clone(),
            ))
        };
        Self {
            read: Arc::new(Reader::new(
                collaborators.provider.clone(),
                collaborators.context_builder.clone(),
                &config.nesting_separator,
            )),
            security: security(Checkpoint::Security),
            security_post_denormalize: security(Checkpoint::PostDenormalize),
            security_post_validation: security(Checkpoint::PostValidation),
            deserialize: Arc::new(Deserializer::new(
                collaborators.denormalizer.clone(),
                collaborators.context_builder.clone(),
            )),
            validate: Arc::new(Validation::new(collaborators.validator.clone())),
            write: Arc::new(Writer::new(
                collaborators.processor.clone(),
                collaborators.context_builder.clone(),
            )),
            serialize: Arc::new(Serializer::new(
                collaborators.normalizer.clone(),
                collaborators.context_builder.clone(),
                config.pagination,
            )),
        }
    }

    pub fn with_read(mut self, read: Arc<dyn ReadStage>) -> Self {
        self.read = read;
        self
    }

    pub fn with_deserialize(mut self, deserialize: Arc<dyn DeserializeStage>) -> Self {
        self.deserialize = deserialize;
        self
    }

    pub fn with_validate(mut self, validate: Arc<dyn ValidateStage>) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_write(mut self, write: Arc<dyn WriteStage>) -> Self {
        self.write = write;
        self
    }

    pub fn with_serialize(mut self, serialize: Arc<dyn SerializeStage>) -> Self {
        self.serialize = serialize;
        self
    }
}
