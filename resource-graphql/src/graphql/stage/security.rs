//! Security checkpoints.

use super::SecurityStage;
use crate::graphql::{
    backend::AccessChecker, context::ResolverContext, error::Error, operation::Operation,
};
use derive_more::Display;
use std::sync::Arc;

/// The point in the pipeline at which a security expression is evaluated.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// After read (or the custom resolver substituted for it), with `object` set to the data read.
    #[display(fmt = "security")]
    Security,
    /// After deserialization, with `object` set to the deserialized item and `previous_object` to
    /// the item read.
    #[display(fmt = "security_post_denormalize")]
    PostDenormalize,
    /// After validation, with the same variables as [`PostDenormalize`](Self::PostDenormalize).
    #[display(fmt = "security_post_validation")]
    PostValidation,
}

impl Checkpoint {
    /// The expression `operation` declares for this checkpoint.
    pub fn expression(self, operation: &Operation) -> Option<&str> {
        match self {
            Self::Security => operation.security(),
            Self::PostDenormalize => operation.security_post_denormalize(),
            Self::PostValidation => operation.security_post_validation(),
        }
    }
}

/// The default [`SecurityStage`], evaluating expressions with an [`AccessChecker`].
pub struct Security {
    checkpoint: Checkpoint,
    access_checker: Option<Arc<dyn AccessChecker>>,
}

impl Security {
    pub fn new(checkpoint: Checkpoint, access_checker: Option<Arc<dyn AccessChecker>>) -> Self {
        Self {
            checkpoint,
            access_checker,
        }
    }
}

impl SecurityStage for Security {
    fn check(
        &self,
        resource_class: &str,
        operation: &Operation,
        context: &ResolverContext,
    ) -> Result<(), Error> {
        let Some(expression) = self.checkpoint.expression(operation) else {
            return Ok(());
        };
        let Some(checker) = &self.access_checker else {
            return Err(Error::configuration(
                "Cannot check security expression when no access checker is installed",
            ));
        };
        if checker.is_granted(resource_class, expression, context.extra_variables())? {
            Ok(())
        } else {
            tracing::warn!(
                "{} denied on {} {resource_class}: {expression}",
                self.checkpoint,
                operation.name()
            );
            Err(Error::AccessDenied)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphql::{
        backend::mock::Backend,
        context::{ExtraVariables, FieldInfo, OperationKind},
        error::ErrorKind,
        type_system::Item,
        Map,
    };

    fn context() -> ResolverContext {
        ResolverContext::new(
            OperationKind::ItemQuery,
            None,
            &Map::new(),
            &FieldInfo::new("dummy"),
        )
    }

    fn stage(backend: &Backend, checkpoint: Checkpoint) -> Security {
        let collaborators = backend.collaborators();
        Security::new(checkpoint, collaborators.access_checker)
    }

    #[test]
    fn test_no_expression_is_noop() {
        // No access checker either: the checker is only required when there is something to check.
        let backend = Backend::new();
        let op = Operation::new(OperationKind::ItemQuery, "item_query", "Dummy");
        for checkpoint in [
            Checkpoint::Security,
            Checkpoint::PostDenormalize,
            Checkpoint::PostValidation,
        ] {
            stage(&backend, checkpoint)
                .check("Dummy", &op, &context())
                .unwrap();
        }
    }

    #[test]
    fn test_missing_checker() {
        let backend = Backend::new();
        let op = Operation::new(OperationKind::ItemQuery, "item_query", "Dummy")
            .with_security("is_granted('ROLE_ADMIN')");
        let err = stage(&backend, Checkpoint::Security)
            .check("Dummy", &op, &context())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_denied() {
        let backend = Backend::new().with_access_checker(|checker| checker.deny("nope"));
        let op = Operation::new(OperationKind::ItemQuery, "item_query", "Dummy")
            .with_security("nope");
        let err = stage(&backend, Checkpoint::Security)
            .check("Dummy", &op, &context())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
        assert_eq!(err.to_string(), "Access Denied.");
    }

    #[test]
    fn test_checkpoint_selects_expression() {
        let backend = Backend::new().with_access_checker(|checker| {
            checker
                .deny("pre")
                .rule("post", |vars| vars.previous_object.is_some())
        });
        let op = Operation::new(OperationKind::Mutation, "update", "Dummy")
            .with_security_post_denormalize("post");

        // The pre-deserialization check has no expression, so "pre" is never consulted.
        stage(&backend, Checkpoint::Security)
            .check("Dummy", &op, &context())
            .unwrap();

        let mut ctx = context();
        ctx.set_extra_variables(ExtraVariables::with_previous(
            Some(Item::new("Dummy").into()),
            Some(Item::new("Dummy").into()),
        ));
        stage(&backend, Checkpoint::PostDenormalize)
            .check("Dummy", &op, &ctx)
            .unwrap();
        assert_eq!(backend.journal.entries(), ["is_granted:post"]);
    }
}
