//! Validation of mutated items.

use super::ValidateStage;
use crate::graphql::{
    backend::{ValidationContext, Validator},
    context::ResolverContext,
    error::Error,
    operation::Operation,
    type_system::Item,
};
use std::sync::Arc;

/// The default [`ValidateStage`], checking items with a [`Validator`] in the operation's
/// validation groups.
pub struct Validation {
    validator: Arc<dyn Validator>,
}

impl Validation {
    pub fn new(validator: Arc<dyn Validator>) -> Self {
        Self { validator }
    }
}

impl ValidateStage for Validation {
    fn validate(
        &self,
        item: &Item,
        resource_class: &str,
        operation: &Operation,
        _context: &ResolverContext,
    ) -> Result<(), Error> {
        if !operation.stages().validate {
            return Ok(());
        }
        tracing::debug!("validate {resource_class}");
        let context = ValidationContext {
            groups: operation.validation_groups().map(<[String]>::to_vec),
        };
        self.validator
            .validate(item, &context)
            .map_err(|violations| Error::Validation { violations })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphql::{
        backend::mock::Backend,
        context::{FieldInfo, OperationKind},
        error::ErrorKind,
        Map,
    };

    fn context() -> ResolverContext {
        ResolverContext::new(
            OperationKind::Mutation,
            None,
            &Map::new(),
            &FieldInfo::new("createDummy"),
        )
    }

    #[test]
    fn test_all_violations_reported() {
        let backend = Backend::new().require("name").require("description");
        let op = Operation::new(OperationKind::Mutation, "create", "Dummy");
        let err = Validation::new(Arc::new(backend.validator.clone()))
            .validate(&Item::new("Dummy"), "Dummy", &op, &context())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let Error::Validation { violations } = err else {
            panic!("expected a validation error")
        };
        assert_eq!(
            violations
                .iter()
                .map(|v| v.property_path.as_str())
                .collect::<Vec<_>>(),
            ["name", "description"]
        );
    }

    #[test]
    fn test_groups() {
        let backend = Backend::new();
        let op = Operation::new(OperationKind::Mutation, "create", "Dummy")
            .with_validation_groups(["a", "b"]);
        Validation::new(Arc::new(backend.validator.clone()))
            .validate(&Item::new("Dummy"), "Dummy", &op, &context())
            .unwrap();
        assert_eq!(backend.journal.entries(), ["validate:a,b"]);
    }

    #[test]
    fn test_disabled() {
        let backend = Backend::new().require("name");
        let op = Operation::new(OperationKind::Mutation, "create", "Dummy").with_validate(false);
        Validation::new(Arc::new(backend.validator.clone()))
            .validate(&Item::new("Dummy"), "Dummy", &op, &context())
            .unwrap();
        assert!(backend.journal.entries().is_empty());
    }
}
