#![deny(missing_docs)]
//! Tool synthesis.
//!
//! Given a [`ToolDefinition`], the pipeline installs the repository
//! ([`install_repository`]), explores it and plans ([`make_plan`]), writes a
//! first implementation ([`implement_function`]) and then repairs it against
//! a fresh sandbox until it passes assessment ([`make_tool`]). [`run_tool`]
//! runs a finished tool.

pub mod assess;
pub mod code;
pub mod config;
pub mod definition;
pub mod diagnose;
pub mod error;
pub mod install;
pub mod make_tool;
pub mod plan;
pub mod prompts;
pub mod run_tool;

pub use assess::{Assessment, assess_execution};
pub use code::{implement_function, rewrite_function, strip_code_fences};
pub use config::{DEFAULT_INSTALL_STEPS, DEFAULT_MAX_ITERATIONS, PipelineConfig};
pub use definition::{
    ArgumentDefinition, Repository, ReturnDefinition, ToolDefinition, ToolInvocation,
};
pub use diagnose::{Diagnosis, diagnose, summarize_problem};
pub use error::PipelineError;
pub use install::{InstalledRepository, install_repository};
pub use make_tool::make_tool;
pub use plan::{explore_repository, make_plan};
pub use run_tool::run_tool;
