//! Concrete front end: tree-sitter parsing plus rejection of broken trees.

use tree_sitter::{Node, Parser, Tree};

use super::languages::DeclarationSyntax;
use crate::error::{OutlineError, Result, StructuralError};

/// A syntax tree known to be free of ERROR and MISSING nodes.
pub struct ConcreteTree<'s> {
    tree: Tree,
    source: &'s str,
}

impl<'s> ConcreteTree<'s> {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &'s str {
        self.source
    }
}

pub struct FrontEnd {
    parser: Parser,
}

impl FrontEnd {
    pub fn new(syntax: &dyn DeclarationSyntax) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&syntax.grammar()).map_err(|e| {
            OutlineError::Language(format!("Failed to set {} language: {}", syntax.language(), e))
        })?;

        Ok(Self { parser })
    }

    pub fn parse<'s>(&mut self, source: &'s str) -> std::result::Result<ConcreteTree<'s>, StructuralError> {
        let tree = self.parser.parse(source, None).ok_or_else(|| {
            StructuralError::new(Default::default(), 0, "parser produced no tree")
        })?;

        let root = tree.root_node();
        if root.has_error() {
            if let Some(node) = first_error(root) {
                let message = if node.is_missing() {
                    format!("missing `{}`", node.kind())
                } else {
                    "syntax error".to_string()
                };
                return Err(StructuralError::at_node(node, message));
            }
        }

        Ok(ConcreteTree { tree, source })
    }
}

/// First ERROR or MISSING node in document order.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
