//! Per-request state threaded through every stage of a resolution.

use super::{type_system::Data, Map, Value};
use derive_more::Display;

/// The kind of operation a field resolution performs.
///
/// The kind determines which factory applies and which stages run, so the three flags exposed by
/// [`ResolverContext`] (`is_collection`, `is_mutation`, `is_subscription`) are derived from it
/// rather than set independently.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ItemQuery,
    CollectionQuery,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn is_collection(self) -> bool {
        self == Self::CollectionQuery
    }

    pub fn is_mutation(self) -> bool {
        self == Self::Mutation
    }

    pub fn is_subscription(self) -> bool {
        self == Self::Subscription
    }
}

/// The already-resolved value of the parent field.
///
/// The parent's data has been normalized already, so a field which is present in
/// [`fields`](Self::fields) is returned as is instead of being resolved again. A parent which is an
/// item of some resource also records its class and identifiers, which allows a nested collection
/// field to load the collection linked to it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Source {
    fields: Map,
    resource_class: Option<String>,
    identifiers: Map,
}

impl Source {
    /// A parent value with the given normalized fields.
    pub fn new(fields: Map) -> Self {
        Self {
            fields,
            resource_class: None,
            identifiers: Map::new(),
        }
    }

    /// Record that this parent is an item of `resource_class` identified by `identifiers`.
    pub fn with_resource(mut self, resource_class: impl Into<String>, identifiers: Map) -> Self {
        self.resource_class = Some(resource_class.into());
        self.identifiers = identifiers;
        self
    }

    /// The value already embedded for `field`, if any.
    ///
    /// An embedded `null` is still an embedded value.
    pub fn embedded(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map {
        &self.fields
    }

    /// The class of the parent item, if the parent is a resource item.
    pub fn resource_class(&self) -> Option<&str> {
        self.resource_class.as_deref()
    }

    pub fn identifiers(&self) -> &Map {
        &self.identifiers
    }
}

/// Metadata about the field being resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldInfo {
    field_name: String,
    return_type: Option<String>,
    selection: Vec<String>,
}

impl FieldInfo {
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            ..Default::default()
        }
    }

    /// Name the GraphQL type this field returns.
    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Record the sub-fields requested on this field.
    pub fn with_selection<I>(mut self, selection: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.selection = selection.into_iter().map(Into::into).collect();
        self
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }
}

/// The values exposed to a security expression.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtraVariables {
    /// The object the expression is evaluated against.
    pub object: Option<Data>,
    /// The object as it was before deserialization, for post-denormalize and post-validation
    /// checks.
    pub previous_object: Option<Data>,
}

impl ExtraVariables {
    /// Variables exposing only `object`.
    pub fn object(object: Option<Data>) -> Self {
        Self {
            object,
            previous_object: None,
        }
    }

    /// Variables exposing `object` and `previous_object`.
    pub fn with_previous(object: Option<Data>, previous_object: Option<Data>) -> Self {
        Self {
            object,
            previous_object,
        }
    }
}

/// The state of a single field resolution.
///
/// A context is created fresh for every field call and owned by that call. Stages read from it;
/// the only part that changes while the pipeline runs is the set of [`ExtraVariables`], which the
/// resolver updates before each security checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolverContext {
    kind: OperationKind,
    source: Option<Source>,
    args: Map,
    info: FieldInfo,
    extra_variables: ExtraVariables,
}

impl ResolverContext {
    pub fn new(kind: OperationKind, source: Option<&Source>, args: &Map, info: &FieldInfo) -> Self {
        Self {
            kind,
            source: source.cloned(),
            args: args.clone(),
            info: info.clone(),
            extra_variables: Default::default(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn is_collection(&self) -> bool {
        self.kind.is_collection()
    }

    pub fn is_mutation(&self) -> bool {
        self.kind.is_mutation()
    }

    pub fn is_subscription(&self) -> bool {
        self.kind.is_subscription()
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn args(&self) -> &Map {
        &self.args
    }

    pub fn info(&self) -> &FieldInfo {
        &self.info
    }

    pub fn extra_variables(&self) -> &ExtraVariables {
        &self.extra_variables
    }

    pub fn set_extra_variables(&mut self, extra_variables: ExtraVariables) {
        self.extra_variables = extra_variables;
    }

    /// The nested `input` argument of a mutation or subscription.
    pub fn input(&self) -> Option<&Map> {
        match self.args.get("input") {
            Some(Value::Object(input)) => Some(input),
            _ => None,
        }
    }

    /// The identifier of the item this resolution targets.
    ///
    /// Queries take it from `args.id`, mutations and subscriptions from `args.input.id`.
    pub fn identifier(&self) -> Option<String> {
        let id = if self.is_mutation() || self.is_subscription() {
            self.input()?.get("id")?
        } else {
            self.args.get("id")?
        };
        match id {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// The `clientMutationId` echoed back in a mutation payload.
    pub fn client_mutation_id(&self) -> Value {
        self.input_field("clientMutationId")
    }

    /// The `clientSubscriptionId` echoed back in a subscription payload.
    pub fn client_subscription_id(&self) -> Value {
        self.input_field("clientSubscriptionId")
    }

    fn input_field(&self, name: &str) -> Value {
        self.input()
            .and_then(|input| input.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}
