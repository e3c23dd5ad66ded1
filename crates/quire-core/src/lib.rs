//! Core types and trait definitions for Quire.
//!
//! Quire turns an evolving set of question/answer pairs into a versioned,
//! traceable specification document. This crate holds the domain model, the
//! repository contract, and the pure diff/impact engine. It is deliberately
//! free of HTTP, database and LLM dependencies.

// We intentionally use native `async fn` in traits.
#![allow(async_fn_in_trait)]

pub mod answer;
pub mod bundle;
pub mod diff;
pub mod error;
pub mod impact;
pub mod issue;
pub mod path;
pub mod project;
pub mod question;
pub mod snapshot;
pub mod store;
pub mod trace;

pub use error::{Error, Result};
