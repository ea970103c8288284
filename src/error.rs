use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ConformanceMismatch, Position};

/// Main error type for outline extraction
#[derive(Error, Debug)]
pub enum OutlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Grammar error: {0}")]
    Language(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Golden outline error: {0}")]
    Golden(String),

    #[error("File {path} is {size} bytes, above the {limit} byte limit")]
    FileTooLarge {
        path: PathBuf,
        size: usize,
        limit: usize,
    },

    #[error(transparent)]
    Conformance(#[from] Box<ConformanceMismatch>),

    #[error("Worker task failed: {0}")]
    Task(String),
}

/// The syntax tree could not be used past `location`.
///
/// Fatal for the file being outlined: no partial outline accompanies it.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Structural error at {location}: {message}")]
pub struct StructuralError {
    /// Where parsing could no longer continue.
    pub location: Position,

    /// Byte offset of `location` in the source text.
    pub byte: usize,

    pub message: String,
}

impl StructuralError {
    pub fn new(location: Position, byte: usize, message: impl Into<String>) -> Self {
        Self {
            location,
            byte,
            message: message.into(),
        }
    }

    /// Error anchored at the start of a tree-sitter node.
    pub fn at_node(node: tree_sitter::Node<'_>, message: impl Into<String>) -> Self {
        Self::new(node.start_position().into(), node.start_byte(), message)
    }
}

pub type Result<T> = std::result::Result<T, OutlineError>;
