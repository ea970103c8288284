//! Lazy, depth-first declaration walk over a concrete syntax tree.
//!
//! The walker never recurses: it keeps an explicit stack of frames, one per
//! node whose children are still pending. A frame opened for a declaration
//! body emits [`WalkEvent::Leave`] when it is exhausted, so consumers see
//! balanced `Enter`/`Leave` pairs in source order.

use std::vec;

use tree_sitter::Node;

use super::frontend::ConcreteTree;
use super::languages::DeclarationSyntax;
use super::model::Span;
use super::modifiers::RawModifier;
use crate::error::StructuralError;

/// What kind of scope a raw declaration opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeRole {
    /// Functions, methods, constructors, arrow functions bound to a name.
    Callable,
    /// Classes, interfaces, structs, enums, traits, records.
    Type,
    /// Adds members to a type declared elsewhere (Rust `impl`).
    Extension,
    /// Inline modules and namespaces.
    Namespace,
}

/// Language keyword that introduced the declaration plus its scope role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindHint {
    pub token: &'static str,
    pub role: ScopeRole,
}

impl KindHint {
    pub const fn new(token: &'static str, role: ScopeRole) -> Self {
        Self { token, role }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParameter {
    pub name: String,
    pub type_annotation: Option<String>,
    pub default_value: Option<String>,
}

impl RawParameter {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            default_value: None,
        }
    }
}

/// One declaration as the language front end sees it, before normalization.
#[derive(Debug, Clone)]
pub struct RawDeclaration<'t> {
    pub kind_hint: KindHint,
    pub name: String,
    pub span: Span,
    pub parameters: Vec<RawParameter>,
    pub return_type: Option<String>,
    pub modifiers: Vec<RawModifier>,
    pub bases: Vec<String>,
    pub doc_comment: Option<String>,
    /// Node holding the nested scope, descended into by the walker.
    pub body: Option<Node<'t>>,
}

impl<'t> RawDeclaration<'t> {
    pub fn new(kind_hint: KindHint, name: impl Into<String>, node: Node<'t>) -> Self {
        Self {
            kind_hint,
            name: name.into(),
            span: Span::of(node),
            parameters: Vec::new(),
            return_type: None,
            modifiers: Vec::new(),
            bases: Vec::new(),
            doc_comment: None,
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WalkEvent<'t> {
    Enter(RawDeclaration<'t>),
    Leave,
}

struct Frame<'t> {
    pending: vec::IntoIter<Node<'t>>,
    closes_scope: bool,
}

impl<'t> Frame<'t> {
    fn over(node: Node<'t>, closes_scope: bool) -> Self {
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        Self {
            pending: children.into_iter(),
            closes_scope,
        }
    }
}

pub struct DeclarationWalker<'t> {
    syntax: &'t dyn DeclarationSyntax,
    source: &'t str,
    stack: Vec<Frame<'t>>,
    failed: bool,
}

impl<'t> DeclarationWalker<'t> {
    pub fn new(syntax: &'t dyn DeclarationSyntax, tree: &'t ConcreteTree<'_>) -> Self {
        Self {
            syntax,
            source: tree.source(),
            stack: vec![Frame::over(tree.root(), false)],
            failed: false,
        }
    }

    fn fail(&mut self, error: StructuralError) -> Option<Result<WalkEvent<'t>, StructuralError>> {
        self.failed = true;
        self.stack.clear();
        Some(Err(error))
    }
}

impl<'t> Iterator for DeclarationWalker<'t> {
    type Item = Result<WalkEvent<'t>, StructuralError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(node) = frame.pending.next() else {
                let closed = self.stack.pop().is_some_and(|frame| frame.closes_scope);
                if closed {
                    return Some(Ok(WalkEvent::Leave));
                }
                continue;
            };

            if node.is_error() || node.is_missing() {
                return self.fail(StructuralError::at_node(
                    node,
                    format!("unparseable `{}` in source", node.kind()),
                ));
            }
            if !node.is_named() {
                continue;
            }

            match self.syntax.declaration(node, self.source) {
                Err(error) => return self.fail(error),
                Ok(Some(declaration)) => {
                    let frame = match declaration.body {
                        Some(body) => Frame::over(body, true),
                        None => Frame {
                            pending: Vec::new().into_iter(),
                            closes_scope: true,
                        },
                    };
                    self.stack.push(frame);
                    return Some(Ok(WalkEvent::Enter(declaration)));
                }
                Ok(None) => {
                    if node.child_count() > 0 && self.syntax.descend(node) {
                        self.stack.push(Frame::over(node, false));
                    }
                }
            }
        }
    }
}
