mod conformance;
mod engine;
mod frontend;
mod model;
mod modifiers;
mod normalizer;
mod parser;
mod walker;

// Language front ends stay public so callers can plug their own syntax in
pub mod languages;

pub use conformance::{ConformanceMismatch, Divergence, GoldenOutline, Harness};
pub use engine::{Engine, FileOutline};
pub use frontend::{ConcreteTree, FrontEnd};
pub use languages::{DeclarationSyntax, Language};
pub use model::{
    Declaration, DeclarationId, DeclarationKind, Outline, Parameter, Position, Preorder, Qualifier, Span,
    Visibility,
};
pub use modifiers::{BuiltinRule, ModifierSource, ModifierTable, RawModifier, Resolution, ResolvedModifiers};
pub use normalizer::Normalizer;
pub use parser::OutlineParser;
pub use walker::{DeclarationWalker, KindHint, RawDeclaration, RawParameter, ScopeRole, WalkEvent};
