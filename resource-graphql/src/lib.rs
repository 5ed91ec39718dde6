//! Resource GraphQL turns declarative resource descriptions into GraphQL field resolvers. It
//! consists of two sections:
//!
//! * A [type system](graphql::type_system), which describes resources, the
//!   [operations](graphql::operation) exposed on them and the items and collections that flow
//!   through a resolution. Most users will describe their resources with the
//!   [`Resource`](macro@prelude::Resource) derive macro and build
//!   [`Operation`](graphql::operation::Operation) values from them once, when the schema is built.
//! * A [resolution pipeline](graphql::factory), which turns a single field resolution (a query, a
//!   paginated collection query, a mutation or a subscription) into a response value by running it
//!   through an ordered sequence of independently replaceable [stages](graphql::stage). Each stage
//!   talks to the outside world exclusively through the [backend](graphql::backend) traits, so
//!   applications plug in their own persistence, serialization, validation and access control.
//!
//! The pipeline never encodes anything on the wire itself. It produces
//! [`Value`](graphql::Value)s which the surrounding GraphQL execution engine serializes.

// Lets the derive macros refer to this crate by name from within its own tests.
extern crate self as resource_graphql;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub mod graphql;
pub mod prelude;

/// Initialize tracing.
pub fn init_logging() {
    static ONCE: Once = Once::new();

    ONCE.call_once(|| {
        color_eyre::install().unwrap();
        tracing_subscriber::fmt()
            .with_ansi(true)
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    });
}
