//! Common items that you will always want in scope when using GraphQL.

pub use crate::graphql::{
    async_graphql::{self, value},
    backend::{Collaborators, Identifiers, Processor, Provider},
    config::ResolverConfig,
    context::{FieldInfo, OperationKind, ResolverContext, Source},
    error::{Error, ErrorKind},
    factory::{
        FieldResolver, GenericResolverFactory, PipelineProcessor, ResolverFactories,
        ResolverFactory,
    },
    operation::{Mercure, Operation, Pagination, PaginationType, StageToggles},
    resolver::{ResolverId, ResolverLocator, ResolverRegistry},
    stage::Stages,
    type_system::{Collection, Data, Item, PageState, Resource},
    Map, Name, Value,
};

// The derive macro lives in the macro namespace, next to the trait of the same name.
pub use crate::graphql::Resource;
