//! Interfaces provided by the collaborators the pipeline consumes.
//!
//! The pipeline itself knows nothing about storage, serialization formats, validation rules or
//! access control. It reaches all of them through the traits in this module, bundled in a
//! [`Collaborators`] value from which the [`Stages`](super::stage::Stages) are built. Applications
//! implement these traits for their own persistence layer; the [`mock`] module provides in-memory
//! implementations, which are useful for testing.
//!
//! All collaborators are shared between concurrent resolutions, so they must be [`Send`] and
//! [`Sync`]. Collaborators that perform I/O ([`Provider`], [`Processor`] and
//! [`SubscriptionManager`]) are asynchronous.

use super::{
    context::{ExtraVariables, ResolverContext},
    error::Error,
    object,
    operation::Operation,
    type_system::{Data, Item},
    Map, Value,
};
use async_trait::async_trait;
use derive_more::{Deref, From, IntoIterator};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use url::Url;

pub mod mock;

/// The format name passed to normalizers and denormalizers.
pub const FORMAT: &str = "graphql";

/// Identifiers of the item (or of the parent of the collection) an operation targets.
pub type Identifiers = Map;

/// A property linking a nested collection to its parent item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// The class of the parent item.
    pub class: String,
    /// The parent's property holding the collection.
    pub property: String,
}

/// The context passed to serializers, providers and processors.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializerContext {
    pub resource_class: String,
    pub operation_name: String,
    /// Is this context used to normalize (rather than denormalize) data?
    pub normalization: bool,
    /// Serialization groups restricting the exposed fields.
    pub groups: Option<Vec<String>>,
    /// The sub-fields requested by the client.
    pub attributes: Vec<String>,
    /// An existing item which denormalization should update rather than create anew.
    pub object_to_populate: Option<Item>,
    /// Collection filters derived from the field arguments.
    pub filters: Option<Map>,
    /// The parent item of a nested collection.
    pub link: Option<Link>,
    /// The state of the field resolution this context was built for.
    pub resolver: ResolverContext,
}

/// Builder of [`SerializerContext`]s.
pub trait SerializerContextBuilder: Send + Sync {
    fn create(
        &self,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
        normalization: bool,
    ) -> SerializerContext;
}

/// The default [`SerializerContextBuilder`].
///
/// Takes serialization groups from the operation and attributes from the field selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContextBuilder;

impl SerializerContextBuilder for ContextBuilder {
    fn create(
        &self,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
        normalization: bool,
    ) -> SerializerContext {
        let groups = if normalization {
            operation.normalization_groups()
        } else {
            operation.denormalization_groups()
        };
        SerializerContext {
            resource_class: resource_class.to_string(),
            operation_name: operation.name().to_string(),
            normalization,
            groups: groups.map(<[String]>::to_vec),
            attributes: context.info().selection().to_vec(),
            object_to_populate: None,
            filters: None,
            link: None,
            resolver: context.clone(),
        }
    }
}

/// A source of items and collections.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn provide(
        &self,
        operation: &Operation,
        identifiers: &Identifiers,
        context: &SerializerContext,
    ) -> Result<Option<Data>, Error>;
}

/// A sink which persists (or otherwise handles) the data produced by an operation.
#[async_trait]
pub trait Processor: Send + Sync {
    type Output: Send;

    async fn process(
        &self,
        data: Option<Data>,
        operation: &Operation,
        identifiers: &Identifiers,
        context: &SerializerContext,
    ) -> Result<Self::Output, Error>;
}

/// A processor which persists items, as used by the write stage.
///
/// Deleting processors return [`None`].
pub type ItemProcessor = dyn Processor<Output = Option<Item>>;

/// Conversion of items into serialized values.
pub trait Normalizer: Send + Sync {
    /// Normalize `item`. The result must be an object or `null`.
    fn normalize(
        &self,
        item: &Item,
        format: &str,
        context: &SerializerContext,
    ) -> Result<Value, Error>;
}

/// Conversion of raw input into items.
pub trait Denormalizer: Send + Sync {
    /// Denormalize `input` into an item of class `class`.
    ///
    /// If the context carries an [`object_to_populate`](SerializerContext::object_to_populate),
    /// the input is merged onto it instead of constructing a new item.
    fn denormalize(
        &self,
        input: &Value,
        class: &str,
        format: &str,
        context: &SerializerContext,
    ) -> Result<Item, Error>;
}

/// A single failed constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub property_path: String,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }

    /// The serialized form reported to clients.
    pub fn to_value(&self) -> Value {
        object([
            ("path", Value::from(self.property_path.as_str())),
            ("message", Value::from(self.message.as_str())),
        ])
    }
}

impl Display for ConstraintViolation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.property_path, self.message)
    }
}

/// All the constraints an item failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deref, From, IntoIterator)]
pub struct ConstraintViolationList(Vec<ConstraintViolation>);

impl Display for ConstraintViolationList {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// Options for a validation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// The validation groups to apply, or [`None`] for the default group.
    pub groups: Option<Vec<String>>,
}

/// Validation of items against their constraints.
pub trait Validator: Send + Sync {
    /// Validate `item`, reporting every violated constraint at once.
    fn validate(
        &self,
        item: &Item,
        context: &ValidationContext,
    ) -> Result<(), ConstraintViolationList>;
}

/// Evaluation of security expressions.
pub trait AccessChecker: Send + Sync {
    fn is_granted(
        &self,
        resource_class: &str,
        expression: &str,
        extra_variables: &ExtraVariables,
    ) -> Result<bool, Error>;
}

/// Registration of clients subscribing to live updates.
#[async_trait]
pub trait SubscriptionManager: Send + Sync {
    /// The identifier of the subscription described by `context`, if updates should be pushed.
    async fn retrieve_subscription_id(
        &self,
        context: &ResolverContext,
        result: &Value,
    ) -> Result<Option<String>, Error>;
}

/// Generation of the URL a client listens on for live updates.
pub trait SubscriptionUrlGenerator: Send + Sync {
    /// The URL for the subscription `subscription_id`, published through `hub` (or the default
    /// hub).
    fn generate_url(&self, subscription_id: &str, hub: Option<&str>) -> Result<Url, Error>;
}

/// Every collaborator the stages and factories need.
///
/// The access checker, subscription manager and URL generator are optional. Their absence is only
/// an error for operations which need them.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn Provider>,
    pub processor: Arc<ItemProcessor>,
    pub normalizer: Arc<dyn Normalizer>,
    pub denormalizer: Arc<dyn Denormalizer>,
    pub validator: Arc<dyn Validator>,
    pub context_builder: Arc<dyn SerializerContextBuilder>,
    pub access_checker: Option<Arc<dyn AccessChecker>>,
    pub subscription_manager: Option<Arc<dyn SubscriptionManager>>,
    pub url_generator: Option<Arc<dyn SubscriptionUrlGenerator>>,
}

impl Collaborators {
    /// The required collaborators, with the default context builder and no optional ones.
    pub fn new(
        provider: Arc<dyn Provider>,
        processor: Arc<ItemProcessor>,
        normalizer: Arc<dyn Normalizer>,
        denormalizer: Arc<dyn Denormalizer>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            provider,
            processor,
            normalizer,
            denormalizer,
            validator,
            context_builder: Arc::new(ContextBuilder),
            access_checker: None,
            subscription_manager: None,
            url_generator: None,
        }
    }

    pub fn with_context_builder(mut self, builder: Arc<dyn SerializerContextBuilder>) -> Self {
        self.context_builder = builder;
        self
    }

    pub fn with_access_checker(mut self, checker: Arc<dyn AccessChecker>) -> Self {
        self.access_checker = Some(checker);
        self
    }

    pub fn with_subscription_manager(mut self, manager: Arc<dyn SubscriptionManager>) -> Self {
        self.subscription_manager = Some(manager);
        self
    }

    pub fn with_url_generator(mut self, generator: Arc<dyn SubscriptionUrlGenerator>) -> Self {
        self.url_generator = Some(generator);
        self
    }
}
