//! The specification compilation pipeline.
//!
//! - [`completion`]: the `CompletionService` capability every LLM-backed
//!   stage runs against, plus [`provider`], its HTTP implementation.
//! - [`prompt`]: versioned, mode-keyed prompt templates.
//! - [`stages`]: planner, asker, suggester, compiler and validator.
//! - [`orchestrator`]: runs a stage with its token budget and timeout.
//! - [`schema`]: JSON Schema check of compiled documents.
//! - [`hydrate`]: issue drafts → persisted issues.
//! - [`service`]: the workflows that tie ledger, stages and store together.

pub mod completion;
pub mod error;
pub mod hydrate;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod seed;
pub mod service;
pub mod stages;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use completion::{CompletionError, CompletionService};
pub use error::{Error, Result, StageError};
pub use orchestrator::{CompilerSettings, Orchestrator};
pub use service::SpecService;
