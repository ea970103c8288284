//! Language front ends.
//!
//! Each language gets its own module implementing [`DeclarationSyntax`]: it
//! recognizes declaration nodes in its tree-sitter grammar and lifts them into
//! [`RawDeclaration`]s, and it owns the modifier table for its vocabulary.

pub mod csharp;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use super::modifiers::BuiltinRule;
use super::walker::RawDeclaration;
use crate::error::{OutlineError, StructuralError};

pub use csharp::CSharpSyntax;
pub use java::JavaSyntax;
pub use javascript::JavaScriptSyntax;
pub use python::PythonSyntax;
pub use rust::RustSyntax;
pub use typescript::TypeScriptSyntax;

/// Language tag selecting a front end and its modifier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Java,
    Rust,
    CSharp,
    TypeScript,
    Tsx,
}

impl Language {
    pub const ALL: [Language; 7] = [
        Language::Python,
        Language::JavaScript,
        Language::Java,
        Language::Rust,
        Language::CSharp,
        Language::TypeScript,
        Language::Tsx,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Rust => "rust",
            Self::CSharp => "csharp",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
        }
    }

    pub fn file_extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py", "pyi"],
            Self::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Self::Java => &["java"],
            Self::Rust => &["rs"],
            Self::CSharp => &["cs"],
            Self::TypeScript => &["ts", "mts", "cts"],
            Self::Tsx => &["tsx"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|language| language.file_extensions().contains(&ext.as_str()))
    }

    pub fn syntax(&self) -> Box<dyn DeclarationSyntax> {
        match self {
            Self::Python => Box::new(PythonSyntax::new()),
            Self::JavaScript => Box::new(JavaScriptSyntax::new()),
            Self::Java => Box::new(JavaSyntax::new()),
            Self::Rust => Box::new(RustSyntax::new()),
            Self::CSharp => Box::new(CSharpSyntax::new()),
            Self::TypeScript => Box::new(TypeScriptSyntax::new()),
            Self::Tsx => Box::new(TypeScriptSyntax::tsx()),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = OutlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Self::Python),
            "javascript" | "js" => Ok(Self::JavaScript),
            "java" => Ok(Self::Java),
            "rust" | "rs" => Ok(Self::Rust),
            "csharp" | "c#" | "cs" => Ok(Self::CSharp),
            "typescript" | "ts" => Ok(Self::TypeScript),
            "tsx" => Ok(Self::Tsx),
            other => Err(OutlineError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// Trait that all language front ends must implement
pub trait DeclarationSyntax: Send + Sync {
    fn language(&self) -> Language;

    /// Grammar handed to the tree-sitter parser.
    fn grammar(&self) -> tree_sitter::Language;

    /// Modifier vocabulary of the language.
    fn modifier_rules(&self) -> &'static [BuiltinRule];

    /// Lift `node` into a raw declaration if it declares something.
    ///
    /// Returns an error when the node is structurally unusable even though
    /// tree-sitter accepted it.
    fn declaration<'t>(
        &self,
        node: Node<'t>,
        source: &'t str,
    ) -> Result<Option<RawDeclaration<'t>>, StructuralError>;

    /// Whether declarations may hide below a node that is not one itself.
    fn descend(&self, _node: Node<'_>) -> bool {
        true
    }
}

/// Source text covered by a node.
pub(crate) fn node_text(node: Node<'_>, source: &str) -> String {
    source[node.byte_range()].to_string()
}

pub(crate) fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field).map(|child| node_text(child, source))
}

/// Unnamed keyword children such as `async` or `static`, in source order.
pub(crate) fn keyword_children(node: Node<'_>, keywords: &[&str]) -> Vec<String> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| !child.is_named() && keywords.contains(&child.kind()))
        .map(|child| child.kind().to_string())
        .collect()
}

pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Comment siblings directly above `node`, nearest last, skipping nodes of
/// the `transparent` kinds (attributes, annotations) in between.
pub(crate) fn leading_comments<'t>(
    node: Node<'t>,
    comment_kinds: &[&str],
    transparent: &[&str],
    source: &str,
) -> Vec<String> {
    let mut comments = Vec::new();
    let mut sibling = node.prev_named_sibling();
    let mut line = node.start_position().row;

    while let Some(candidate) = sibling {
        let kind = candidate.kind();
        // a blank line detaches a comment from the declaration
        if candidate.end_position().row + 1 < line {
            break;
        }
        if comment_kinds.contains(&kind) {
            comments.push(node_text(candidate, source));
        } else if !transparent.contains(&kind) {
            break;
        }
        line = candidate.start_position().row;
        sibling = candidate.prev_named_sibling();
    }

    comments.reverse();
    comments
}

/// Join `///` style lines or unwrap a single `/** ... */` block.
pub(crate) fn clean_doc_comments(comments: &[String], line_prefix: &str) -> Option<String> {
    let mut lines = Vec::new();

    for comment in comments {
        let comment = comment.trim();
        if let Some(block) = comment.strip_prefix("/**") {
            let block = block.strip_suffix("*/").unwrap_or(block);
            lines.clear();
            for line in block.lines() {
                let line = line.trim();
                let line = line.strip_prefix('*').unwrap_or(line).trim();
                lines.push(line.to_string());
            }
        } else if let Some(line) = comment.strip_prefix(line_prefix) {
            if line.starts_with('/') {
                continue;
            }
            lines.push(line.trim().to_string());
        }
    }

    let text = lines.join("\n").trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("mjs"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("cs"), Some(Language::CSharp));
        assert_eq!(Language::from_extension("mts"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("xyz"), None);
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!("Python".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("c#".parse::<Language>().unwrap(), Language::CSharp);
        assert_eq!("ts".parse::<Language>().unwrap(), Language::TypeScript);
        assert!(matches!(
            "cobol".parse::<Language>(),
            Err(OutlineError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_every_language_has_a_front_end() {
        for language in Language::ALL {
            assert_eq!(language.syntax().language(), language);
            assert!(!language.syntax().modifier_rules().is_empty());
        }
    }

    #[test]
    fn test_clean_doc_comments() {
        let lines = vec!["/// Adds two numbers.".to_string(), "/// Returns the sum.".to_string()];
        assert_eq!(
            clean_doc_comments(&lines, "///").as_deref(),
            Some("Adds two numbers.\nReturns the sum.")
        );

        let block = vec!["/**\n * Greets a user.\n */".to_string()];
        assert_eq!(clean_doc_comments(&block, "///").as_deref(), Some("Greets a user."));

        let plain = vec!["// not a doc".to_string()];
        assert_eq!(clean_doc_comments(&plain, "///"), None);
    }
}
