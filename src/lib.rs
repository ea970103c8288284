//! Language-agnostic declaration outlines.
//!
//! Source text goes through a tree-sitter front end, a lazy declaration
//! walker, table-driven modifier resolution and a normalizer that produces an
//! [`Outline`]: one tree of functions, methods, classes and modules per file,
//! with the same shape whichever language it came from.

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::Config;
pub use crate::core::{
    Declaration, DeclarationKind, Engine, GoldenOutline, Harness, Language, Outline, OutlineParser, Qualifier,
};
pub use crate::error::{OutlineError, Result, StructuralError};
