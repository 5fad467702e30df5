//! The [`Sandbox`] trait.

use std::future::Future;

use toolsmith_action::{AnyAction, Observation};

use crate::error::SandboxError;
use crate::records::{FunctionCall, FunctionCallResult};

/// A session with one isolated execution environment.
///
/// Requests are processed one at a time on the sandbox side; callers issue
/// them sequentially.
pub trait Sandbox: Send + Sync {
    /// Execute `action` and return its observation.
    ///
    /// Expected failures inside the sandbox come back as an error observation,
    /// not as `Err`. `Err` means the request itself failed.
    fn execute(
        &self,
        action: &dyn AnyAction,
    ) -> impl Future<Output = Result<Observation, SandboxError>> + Send;

    /// Run a generated function.
    fn run_function(
        &self,
        call: &FunctionCall,
    ) -> impl Future<Output = Result<FunctionCallResult, SandboxError>> + Send;

    /// End the session and release its resources.
    fn stop(&self) -> impl Future<Output = Result<(), SandboxError>> + Send;
}
