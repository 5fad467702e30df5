#![deny(missing_docs)]
//! Typed actions a model can issue against a sandbox.
//!
//! An [`Action`] is a serde + schemars struct with a unique kind tag. The
//! [`ActionRegistry`] maps kind tags to type-erased [`ActionKind`] descriptors,
//! which derive the callable-tool schema once and parse model arguments into
//! [`AnyAction`] values. Executing an action yields an [`Observation`].

pub mod action;
pub mod builtin;
pub mod error;
pub mod observation;
pub mod registry;
pub mod schema;

pub use action::{Action, ActionContext, AnyAction, BoxFuture};
pub use error::ActionError;
pub use observation::{
    DEFAULT_MAX_LENGTH, ERROR_CONTENT, ErrorObservation, Observation, truncate, truncate_str,
};
pub use registry::{
    ActionKind, ActionRegistry, lookup, observation_type_for, register, register_kind, registered,
};
pub use schema::FunctionSchema;
