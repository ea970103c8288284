//! Normalized, language-agnostic declaration model.
//!
//! An [`Outline`] is one file's declarations stored in an arena. Element 0 is
//! always the module root; every other declaration points back at its parent
//! by [`DeclarationId`] and owns its children through the same ids.
//!
//! Positions are 0-based lines and 0-based byte columns, the same convention
//! tree-sitter uses for its points.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::languages::Language;

/// A point in the source text. Both fields are 0-based; `column` counts bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl From<tree_sitter::Point> for Position {
    fn from(point: tree_sitter::Point) -> Self {
        Self::new(point.row, point.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source range of a declaration, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    pub fn of(node: tree_sitter::Node<'_>) -> Self {
        Self {
            start: node.start_position().into(),
            end: node.end_position().into(),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
        }
    }

    /// The covered text, if the span is valid for `source`.
    pub fn slice<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.start_byte..self.end_byte)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Index of a declaration inside its [`Outline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclarationId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Method,
    Class,
    Module,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Method => write!(f, "method"),
            Self::Class => write!(f, "class"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// Normalized replacement for language-specific modifier syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualifier {
    Async,
    Static,
    ClassLevel,
    Abstract,
    Decorated,
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => write!(f, "async"),
            Self::Static => write!(f, "static"),
            Self::ClassLevel => write!(f, "class_level"),
            Self::Abstract => write!(f, "abstract"),
            Self::Decorated => write!(f, "decorated"),
        }
    }
}

/// Explicit access keyword, when the language has one and the source uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    Internal,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
            Self::Private => write!(f, "private"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
    pub default_value_present: bool,
}

/// One declaration in an [`Outline`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclarationId,
    pub kind: DeclarationKind,
    pub name: String,
    /// Enclosing scope names plus own name; empty for the module root.
    pub qualified_path: Vec<String>,
    pub location: Span,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub qualifiers: BTreeSet<Qualifier>,
    /// Raw decorator expressions backing [`Qualifier::Decorated`], in source order.
    pub decorators: Vec<String>,
    pub doc_comment: Option<String>,
    /// Base names as written. Only ever non-empty for classes.
    pub bases: Vec<String>,
    pub visibility: Option<Visibility>,
    pub parent: Option<DeclarationId>,
    pub children: Vec<DeclarationId>,
}

impl Declaration {
    pub fn has(&self, qualifier: Qualifier) -> bool {
        self.qualifiers.contains(&qualifier)
    }

    /// Dotted form of `qualified_path`.
    pub fn path(&self) -> String {
        self.qualified_path.join(".")
    }
}

/// The declaration tree of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OutlineArena")]
pub struct Outline {
    language: Language,
    declarations: Vec<Declaration>,
}

/// Wire form of an [`Outline`], checked before it becomes one.
#[derive(Deserialize)]
struct OutlineArena {
    language: Language,
    declarations: Vec<Declaration>,
}

impl TryFrom<OutlineArena> for Outline {
    type Error = String;

    fn try_from(arena: OutlineArena) -> Result<Self, Self::Error> {
        let declarations = arena.declarations;
        match declarations.first() {
            Some(root) if root.kind == DeclarationKind::Module && root.parent.is_none() => {}
            _ => return Err("outline has no module root at index 0".to_string()),
        }

        for (index, decl) in declarations.iter().enumerate() {
            if decl.id != DeclarationId(index) {
                return Err(format!("declaration {} carries id {}", index, decl.id.0));
            }
            match decl.parent {
                None if index == 0 => {}
                Some(parent) if parent.0 < index => {}
                _ => return Err(format!("declaration {} has an invalid parent", index)),
            }
            for child in &decl.children {
                let points_back = declarations
                    .get(child.0)
                    .is_some_and(|c| c.parent == Some(decl.id));
                if !points_back {
                    return Err(format!("declaration {} lists a foreign child {}", index, child.0));
                }
            }
        }

        Ok(Self {
            language: arena.language,
            declarations,
        })
    }
}

impl Outline {
    /// Only the normalizer assembles outlines; it guarantees a root at index 0.
    pub(crate) fn from_arena(language: Language, declarations: Vec<Declaration>) -> Self {
        debug_assert!(declarations
            .first()
            .is_some_and(|root| root.kind == DeclarationKind::Module && root.parent.is_none()));
        Self {
            language,
            declarations,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn root(&self) -> &Declaration {
        &self.declarations[0]
    }

    pub fn get(&self, id: DeclarationId) -> Option<&Declaration> {
        self.declarations.get(id.0)
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Number of declarations, module root included.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.len() <= 1
    }

    pub fn children<'a>(&'a self, id: DeclarationId) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.get(id)
            .into_iter()
            .flat_map(|decl| decl.children.iter())
            .filter_map(|child| self.get(*child))
    }

    pub fn parent(&self, id: DeclarationId) -> Option<&Declaration> {
        self.get(id)?.parent.and_then(|parent| self.get(parent))
    }

    /// Pre-order traversal from the root.
    pub fn iter(&self) -> Preorder<'_> {
        Preorder {
            outline: self,
            stack: vec![DeclarationId(0)],
        }
    }

    /// Look a declaration up by dotted path, e.g. `"ChildClass.child_method"`.
    pub fn find(&self, path: &str) -> Option<&Declaration> {
        self.declarations
            .iter()
            .skip(1)
            .find(|decl| decl.path() == path)
    }

    /// Rebuild a declaration's path by walking `parent` links to the root.
    pub fn derive_path(&self, id: DeclarationId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(decl) = self.get(current) {
            let Some(parent) = decl.parent else { break };
            segments.push(self.path_segment(parent, current));
            current = parent;
        }
        segments.reverse();
        segments
    }

    /// Segment naming `child` within `parent`: the bare name, or `name#n` for
    /// the n-th sibling repeating it.
    pub(crate) fn path_segment(&self, parent: DeclarationId, child: DeclarationId) -> String {
        let Some(decl) = self.get(child) else {
            return String::new();
        };
        let siblings = self.get(parent).map(|p| p.children.as_slice()).unwrap_or_default();
        segment_for(
            &decl.name,
            siblings
                .iter()
                .take_while(|sibling| **sibling != child)
                .filter_map(|sibling| self.get(*sibling))
                .map(|sibling| sibling.name.as_str()),
        )
    }
}

/// Path segment for `name` given the names of the siblings declared before it.
pub(crate) fn segment_for<'a>(name: &str, earlier: impl Iterator<Item = &'a str>) -> String {
    let repeats = earlier.filter(|earlier| *earlier == name).count();
    if repeats == 0 {
        name.to_string()
    } else {
        format!("{}#{}", name, repeats + 1)
    }
}

pub struct Preorder<'a> {
    outline: &'a Outline,
    stack: Vec<DeclarationId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a Declaration;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let decl = self.outline.get(id)?;
        self.stack.extend(decl.children.iter().rev().copied());
        Some(decl)
    }
}
