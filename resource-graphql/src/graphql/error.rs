//! Errors raised while resolving a field.
//!
//! Every error is terminal for the field resolution it occurs in, and never for sibling fields.
//! Errors fall into a few kinds (see [`ErrorKind`]): errors in the way the pipeline was wired up
//! (configuration errors and contract violations), which indicate a bug in the application rather
//! than a bad request, and errors caused by the caller (bad identifiers, bad cursors, denied
//! access, invalid input), which are reported back to the client.

use super::{backend::ConstraintViolationList, resolver::ResolverId, ErrorExtensions, Value};
use derive_more::Display;
use snafu::Snafu;
use std::fmt::Display;

/// Errors encountered when resolving a GraphQL field.
#[derive(Debug, Snafu)]
pub enum Error {
    /// A collaborator required by the operation is not installed.
    #[snafu(display("{message}"))]
    Configuration { message: String },

    /// A stage, provider or custom resolver returned a value of the wrong shape or type.
    #[snafu(display("{message}"))]
    ContractViolation { message: String },

    /// The caller's input does not determine a valid resolution.
    #[snafu(display("{message}"))]
    UnexpectedValue { message: String },

    #[snafu(display("{message}"))]
    NotFound { message: String },

    #[snafu(display("Access Denied."))]
    AccessDenied,

    #[snafu(display("{violations}"))]
    Validation { violations: ConstraintViolationList },

    #[snafu(display("Cursor \"{cursor}\" is invalid."))]
    InvalidCursor { cursor: String },

    #[snafu(display("custom resolver \"{id}\" is not registered"))]
    ResolverNotFound { id: ResolverId },

    /// An error reported by a backend collaborator.
    #[snafu(display("{message}"))]
    Backend { message: String },
}

impl Error {
    pub fn configuration(message: impl Display) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    pub fn contract(message: impl Display) -> Self {
        Self::ContractViolation {
            message: message.to_string(),
        }
    }

    pub fn unexpected(message: impl Display) -> Self {
        Self::UnexpectedValue {
            message: message.to_string(),
        }
    }

    pub fn not_found(message: impl Display) -> Self {
        Self::NotFound {
            message: message.to_string(),
        }
    }

    /// An error in a backend collaborator.
    pub fn backend(message: impl Display) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } | Self::ResolverNotFound { .. } => ErrorKind::Configuration,
            Self::ContractViolation { .. } => ErrorKind::Contract,
            Self::UnexpectedValue { .. } | Self::InvalidCursor { .. } => ErrorKind::Caller,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AccessDenied => ErrorKind::AccessDenied,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Backend { .. } => ErrorKind::Backend,
        }
    }
}

/// The broad category of an [`Error`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[display(fmt = "CONFIGURATION_ERROR")]
    Configuration,
    #[display(fmt = "CONTRACT_VIOLATION")]
    Contract,
    #[display(fmt = "BAD_USER_INPUT")]
    Caller,
    #[display(fmt = "NOT_FOUND")]
    NotFound,
    #[display(fmt = "FORBIDDEN")]
    AccessDenied,
    #[display(fmt = "VALIDATION_FAILED")]
    Validation,
    #[display(fmt = "BACKEND_ERROR")]
    Backend,
}

impl ErrorKind {
    /// Is this error caused by the client rather than by the application?
    pub fn is_user_facing(self) -> bool {
        !matches!(self, Self::Configuration | Self::Contract | Self::Backend)
    }

    /// The HTTP status equivalent of this kind of error.
    pub fn status(self) -> u16 {
        match self {
            Self::Caller => 400,
            Self::AccessDenied => 403,
            Self::NotFound => 404,
            Self::Validation => 422,
            Self::Configuration | Self::Contract | Self::Backend => 500,
        }
    }
}

impl ErrorExtensions for Error {
    fn extend(&self) -> async_graphql::Error {
        let kind = self.kind();
        async_graphql::Error::new(self.to_string()).extend_with(|_, ext| {
            ext.set("code", kind.to_string());
            ext.set("status", kind.status());
            if let Self::Validation { violations } = self {
                ext.set(
                    "violations",
                    Value::List(violations.iter().map(|v| v.to_value()).collect()),
                );
            }
        })
    }
}
