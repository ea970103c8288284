//! Golden-outline conformance checks.
//!
//! A golden file describes the declarations a sample must produce. Fields
//! left out of a golden entry are not compared; `children`, when present, must
//! match exactly and in order. The first divergence found in pre-order is
//! reported.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::model::{Declaration, DeclarationId, DeclarationKind, Outline, Position, Qualifier};
use super::parser::OutlineParser;
use crate::config::ParsingConfig;
use crate::error::{OutlineError, Result};

/// Expected shape of one declaration and, optionally, its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenOutline {
    #[serde(default = "module_kind")]
    pub kind: DeclarationKind,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifiers: Option<BTreeSet<Qualifier>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decorators: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bases: Option<Vec<String>>,

    /// Parameter names in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<GoldenOutline>>,
}

fn module_kind() -> DeclarationKind {
    DeclarationKind::Module
}

impl GoldenOutline {
    /// Read a golden file; `.toml` and `.json` are accepted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| OutlineError::Golden(format!("{}: {}", path.display(), e))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| OutlineError::Golden(format!("{}: {}", path.display(), e))),
            _ => Err(OutlineError::Golden(format!(
                "{}: golden outlines must be .toml or .json",
                path.display()
            ))),
        }
    }

    fn summary(&self) -> String {
        let mut text = format!("{} `{}`", self.kind, self.name);
        if let Some(children) = &self.children {
            let names: Vec<_> = children.iter().map(|child| child.name.as_str()).collect();
            text.push_str(&format!(" {{{}}}", names.join(", ")));
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    MissingDeclaration,
    UnexpectedDeclaration,
    WrongNesting,
    WrongKind,
    WrongQualifiers,
    WrongDecorators,
    WrongBases,
    WrongParameters,
    WrongReturnType,
    WrongDoc,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingDeclaration => "missing declaration",
            Self::UnexpectedDeclaration => "unexpected declaration",
            Self::WrongNesting => "wrong nesting",
            Self::WrongKind => "wrong kind",
            Self::WrongQualifiers => "wrong qualifiers",
            Self::WrongDecorators => "wrong decorators",
            Self::WrongBases => "wrong bases",
            Self::WrongParameters => "wrong parameters",
            Self::WrongReturnType => "wrong return type",
            Self::WrongDoc => "wrong doc comment",
        };
        f.write_str(text)
    }
}

/// First point where an outline departs from its golden file.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{divergence} at `{path}`: expected {expected}, found {actual}")]
pub struct ConformanceMismatch {
    /// Dotted path of the declaration (or scope) that diverged.
    pub path: String,
    /// Where the offending declaration starts, when one exists.
    pub location: Option<Position>,
    pub divergence: Divergence,
    pub expected: String,
    pub actual: String,
}

/// Runs samples through the pipeline and compares them to golden outlines.
pub struct Harness {
    parser: OutlineParser,
}

impl Harness {
    pub fn new(parser: OutlineParser) -> Self {
        Self { parser }
    }

    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(OutlineParser::new(&ParsingConfig::default())?))
    }

    /// Compare a whole outline, starting at its module root.
    pub fn check(outline: &Outline, golden: &GoldenOutline) -> std::result::Result<(), ConformanceMismatch> {
        Checker { outline }.compare(outline.root(), golden)
    }

    /// Parse `sample` (language from its extension) and check it against `golden`.
    pub fn check_fixture<P: AsRef<Path>, Q: AsRef<Path>>(&self, sample: P, golden: Q) -> Result<Outline> {
        Self::check_with(&self.parser, sample, golden)
    }

    /// [`check_fixture`](Self::check_fixture) with a borrowed parser.
    pub fn check_with<P: AsRef<Path>, Q: AsRef<Path>>(
        parser: &OutlineParser,
        sample: P,
        golden: Q,
    ) -> Result<Outline> {
        let golden_outline = GoldenOutline::load(golden.as_ref())?;
        let outline = parser.parse_path(sample.as_ref())?;

        Self::check(&outline, &golden_outline).map_err(Box::new)?;
        debug!(
            "✅ {} conforms to {}",
            sample.as_ref().display(),
            golden.as_ref().display()
        );
        Ok(outline)
    }
}

struct Checker<'a> {
    outline: &'a Outline,
}

impl<'a> Checker<'a> {
    fn compare(&self, actual: &Declaration, golden: &GoldenOutline) -> std::result::Result<(), ConformanceMismatch> {
        let is_root = actual.parent.is_none();

        if actual.kind != golden.kind {
            return Err(self.mismatch(actual, Divergence::WrongKind, golden.kind, actual.kind));
        }
        // the root is named after the file, so only compare it when asked to
        if !(is_root && golden.name.is_empty()) && actual.name != golden.name {
            return Err(self.mismatch(actual, Divergence::MissingDeclaration, golden.summary(), self.summary(actual)));
        }
        if let Some(qualifiers) = &golden.qualifiers {
            if *qualifiers != actual.qualifiers {
                return Err(self.mismatch(actual, Divergence::WrongQualifiers, list(qualifiers), list(&actual.qualifiers)));
            }
        }
        if let Some(decorators) = &golden.decorators {
            if *decorators != actual.decorators {
                return Err(self.mismatch(actual, Divergence::WrongDecorators, list(decorators), list(&actual.decorators)));
            }
        }
        if let Some(bases) = &golden.bases {
            if *bases != actual.bases {
                return Err(self.mismatch(actual, Divergence::WrongBases, list(bases), list(&actual.bases)));
            }
        }
        if let Some(parameters) = &golden.parameters {
            let names: Vec<_> = actual.parameters.iter().map(|p| p.name.clone()).collect();
            if *parameters != names {
                return Err(self.mismatch(actual, Divergence::WrongParameters, list(parameters), list(&names)));
            }
        }
        if let Some(return_type) = &golden.return_type {
            if Some(return_type.trim()) != actual.return_type.as_deref().map(str::trim) {
                return Err(self.mismatch(
                    actual,
                    Divergence::WrongReturnType,
                    return_type,
                    actual.return_type.as_deref().unwrap_or("none"),
                ));
            }
        }
        if let Some(doc) = &golden.doc {
            if Some(doc.trim()) != actual.doc_comment.as_deref().map(str::trim) {
                return Err(self.mismatch(
                    actual,
                    Divergence::WrongDoc,
                    format!("{:?}", doc),
                    format!("{:?}", actual.doc_comment),
                ));
            }
        }

        match &golden.children {
            Some(expected) => self.compare_children(actual, expected),
            None => Ok(()),
        }
    }

    fn compare_children(
        &self,
        parent: &Declaration,
        expected: &[GoldenOutline],
    ) -> std::result::Result<(), ConformanceMismatch> {
        let actual: Vec<&Declaration> = self.outline.children(parent.id).collect();

        for (index, golden) in expected.iter().enumerate() {
            let Some(found) = actual.get(index) else {
                return Err(self.missing(parent, golden));
            };
            if found.name != golden.name {
                return Err(self.missing(parent, golden));
            }
            self.compare(found, golden)?;
        }

        if let Some(extra) = actual.get(expected.len()) {
            return Err(self.mismatch(extra, Divergence::UnexpectedDeclaration, "nothing", self.summary(extra)));
        }
        Ok(())
    }

    /// `golden` is absent under `parent`: either misplaced or missing outright.
    fn missing(&self, parent: &Declaration, golden: &GoldenOutline) -> ConformanceMismatch {
        let misplaced = self
            .outline
            .iter()
            .find(|decl| decl.name == golden.name && decl.kind == golden.kind && decl.parent != Some(parent.id));

        match misplaced {
            Some(decl) => {
                let under = self
                    .outline
                    .parent(decl.id)
                    .map(|p| self.summary(p))
                    .unwrap_or_default();
                self.mismatch(
                    decl,
                    Divergence::WrongNesting,
                    format!("{} under {}", golden.summary(), self.summary(parent)),
                    format!("{} under {}", self.summary(decl), under),
                )
            }
            None => ConformanceMismatch {
                path: join_path(parent, &golden.name),
                location: None,
                divergence: Divergence::MissingDeclaration,
                expected: golden.summary(),
                actual: format!("children {}", self.child_names(parent.id)),
            },
        }
    }

    fn mismatch(
        &self,
        decl: &Declaration,
        divergence: Divergence,
        expected: impl ToString,
        actual: impl ToString,
    ) -> ConformanceMismatch {
        ConformanceMismatch {
            path: decl.path(),
            location: Some(decl.location.start),
            divergence,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    fn summary(&self, decl: &Declaration) -> String {
        format!("{} `{}` {{{}}}", decl.kind, decl.name, self.child_names(decl.id))
    }

    fn child_names(&self, id: DeclarationId) -> String {
        let names: Vec<_> = self.outline.children(id).map(|child| child.name.as_str()).collect();
        format!("[{}]", names.join(", "))
    }
}

fn join_path(parent: &Declaration, name: &str) -> String {
    if parent.qualified_path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent.path(), name)
    }
}

fn list<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    let items: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::languages::Language;

    const SOURCE: &str = "class Base:\n    pass\n\nclass Child(Base):\n    @staticmethod\n    def make():\n        pass\n";

    fn outline() -> Outline {
        OutlineParser::new(&ParsingConfig::default())
            .unwrap()
            .parse(Language::Python, SOURCE)
            .unwrap()
    }

    fn golden(toml_text: &str) -> GoldenOutline {
        toml::from_str(toml_text).unwrap()
    }

    const GOLDEN: &str = r#"
[[children]]
kind = "class"
name = "Base"
bases = []

[[children]]
kind = "class"
name = "Child"
bases = ["Base"]

[[children.children]]
kind = "method"
name = "make"
qualifiers = ["static"]
parameters = []
"#;

    #[test]
    fn test_matching_outline_passes() {
        assert_eq!(Harness::check(&outline(), &golden(GOLDEN)), Ok(()));
    }

    #[test]
    fn test_wrong_qualifier_is_reported_with_location() {
        let text = GOLDEN.replace("qualifiers = [\"static\"]", "qualifiers = [\"class_level\"]");
        let mismatch = Harness::check(&outline(), &golden(&text)).unwrap_err();
        assert_eq!(mismatch.divergence, Divergence::WrongQualifiers);
        assert_eq!(mismatch.path, "Child.make");
        assert_eq!(mismatch.location, Some(Position::new(4, 4)));
        assert_eq!(mismatch.expected, "[class_level]");
        assert_eq!(mismatch.actual, "[static]");
    }

    #[test]
    fn test_wrong_bases_is_reported() {
        let text = GOLDEN.replace("bases = [\"Base\"]", "bases = [\"object\"]");
        let mismatch = Harness::check(&outline(), &golden(&text)).unwrap_err();
        assert_eq!(mismatch.divergence, Divergence::WrongBases);
        assert_eq!(mismatch.path, "Child");
    }

    #[test]
    fn test_missing_and_unexpected_declarations() {
        let missing = format!("{}\n[[children]]\nkind = \"function\"\nname = \"ghost\"\n", GOLDEN);
        let mismatch = Harness::check(&outline(), &golden(&missing)).unwrap_err();
        assert_eq!(mismatch.divergence, Divergence::MissingDeclaration);
        assert_eq!(mismatch.path, "ghost");
        assert!(mismatch.location.is_none());

        let unexpected = "[[children]]\nkind = \"class\"\nname = \"Base\"\n";
        let mismatch = Harness::check(&outline(), &golden(unexpected)).unwrap_err();
        assert_eq!(mismatch.divergence, Divergence::UnexpectedDeclaration);
        assert_eq!(mismatch.path, "Child");
    }

    #[test]
    fn test_misplaced_declaration_is_wrong_nesting() {
        let text = r#"
[[children]]
kind = "class"
name = "Base"

[[children.children]]
kind = "method"
name = "make"
"#;
        let mismatch = Harness::check(&outline(), &golden(text)).unwrap_err();
        assert_eq!(mismatch.divergence, Divergence::WrongNesting);
        assert_eq!(mismatch.path, "Child.make");
    }

    #[test]
    fn test_wrong_kind() {
        let text = "[[children]]\nkind = \"function\"\nname = \"Base\"\n";
        let mismatch = Harness::check(&outline(), &golden(text)).unwrap_err();
        assert_eq!(mismatch.divergence, Divergence::WrongKind);
        assert_eq!(mismatch.expected, "function");
        assert_eq!(mismatch.actual, "class");
    }

    #[test]
    fn test_golden_file_extension_is_checked() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("expected.yaml");
        std::fs::write(&path, "kind: module\n").unwrap();
        assert!(matches!(GoldenOutline::load(&path), Err(OutlineError::Golden(_))));

        let path = temp_dir.path().join("expected.json");
        std::fs::write(&path, r#"{"children": [{"kind": "class", "name": "Base"}]}"#).unwrap();
        let loaded = GoldenOutline::load(&path).unwrap();
        assert_eq!(loaded.kind, DeclarationKind::Module);
        assert_eq!(loaded.children.map(|c| c.len()), Some(1));
    }
}
