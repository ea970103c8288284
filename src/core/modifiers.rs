//! Table-driven mapping from raw modifier tokens to normalized qualifiers.
//!
//! Every language contributes a list of [`BuiltinRule`]s; configuration may
//! prepend more. A modifier no rule claims is kept verbatim as a decorator,
//! so resolution never fails and never drops text.

use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::model::{Qualifier, Visibility};
use crate::config::ModifierRuleConfig;
use crate::error::{OutlineError, Result};

/// Where a raw modifier came from in the concrete syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierSource {
    /// Leading keyword: `async`, `static`, `pub`, `abstract`.
    Keyword,
    /// Python / JavaScript `@expr`.
    Decorator,
    /// Java `@Annotation`.
    Annotation,
    /// Rust `#[attr]`, C# `[Attr]`.
    Attribute,
    /// Implied by structure rather than spelled out, e.g. a Rust associated
    /// function without a receiver.
    Implicit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModifier {
    pub source: ModifierSource,
    pub text: String,
}

impl RawModifier {
    pub fn new(source: ModifierSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }

    pub fn keyword(text: impl Into<String>) -> Self {
        Self::new(ModifierSource::Keyword, text)
    }

    pub fn decorator(text: impl Into<String>) -> Self {
        Self::new(ModifierSource::Decorator, text)
    }

    pub fn annotation(text: impl Into<String>) -> Self {
        Self::new(ModifierSource::Annotation, text)
    }

    pub fn attribute(text: impl Into<String>) -> Self {
        Self::new(ModifierSource::Attribute, text)
    }

    pub fn implicit(text: impl Into<String>) -> Self {
        Self::new(ModifierSource::Implicit, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Qualifier(Qualifier),
    Visibility(Visibility),
}

impl Resolution {
    /// Parse the `resolves_to` spelling used in configuration files.
    pub fn parse(name: &str) -> Option<Self> {
        let resolution = match name.trim().to_ascii_lowercase().as_str() {
            "async" => Self::Qualifier(Qualifier::Async),
            "static" => Self::Qualifier(Qualifier::Static),
            "class_level" | "classlevel" => Self::Qualifier(Qualifier::ClassLevel),
            "abstract" => Self::Qualifier(Qualifier::Abstract),
            "decorated" => Self::Qualifier(Qualifier::Decorated),
            "public" => Self::Visibility(Visibility::Public),
            "protected" => Self::Visibility(Visibility::Protected),
            "private" => Self::Visibility(Visibility::Private),
            "internal" => Self::Visibility(Visibility::Internal),
            _ => return None,
        };
        Some(resolution)
    }
}

/// A rule as written in a language's static table.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRule {
    pub source: ModifierSource,
    pub pattern: &'static str,
    pub resolution: Resolution,
}

impl BuiltinRule {
    pub const fn qualifier(source: ModifierSource, pattern: &'static str, qualifier: Qualifier) -> Self {
        Self {
            source,
            pattern,
            resolution: Resolution::Qualifier(qualifier),
        }
    }

    pub const fn visibility(pattern: &'static str, visibility: Visibility) -> Self {
        Self {
            source: ModifierSource::Keyword,
            pattern,
            resolution: Resolution::Visibility(visibility),
        }
    }
}

#[derive(Debug, Clone)]
struct ModifierRule {
    source: ModifierSource,
    pattern: Regex,
    resolution: Resolution,
}

impl ModifierRule {
    /// Patterns always match the whole modifier text.
    fn compile(source: ModifierSource, pattern: &str, resolution: Resolution) -> Result<Self> {
        let pattern = Regex::new(&format!("^(?:{})$", pattern))
            .map_err(|e| OutlineError::Config(format!("Invalid modifier pattern `{}`: {}", pattern, e)))?;
        Ok(Self {
            source,
            pattern,
            resolution,
        })
    }

    fn matches(&self, modifier: &RawModifier) -> bool {
        self.source == modifier.source && self.pattern.is_match(modifier.text.trim())
    }
}

/// Qualifiers, decorators and visibility for one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedModifiers {
    pub qualifiers: BTreeSet<Qualifier>,
    pub decorators: Vec<String>,
    pub visibility: Option<Visibility>,
}

impl ResolvedModifiers {
    fn decorate(&mut self, text: &str) {
        self.qualifiers.insert(Qualifier::Decorated);
        self.decorators.push(text.trim().to_string());
    }

    /// Static and ClassLevel exclude each other; the first one seen wins.
    fn admit(&mut self, qualifier: Qualifier) -> bool {
        let conflict = match qualifier {
            Qualifier::Static => Some(Qualifier::ClassLevel),
            Qualifier::ClassLevel => Some(Qualifier::Static),
            _ => None,
        };
        if conflict.is_some_and(|other| self.qualifiers.contains(&other)) {
            return false;
        }
        self.qualifiers.insert(qualifier);
        true
    }
}

/// Ordered modifier rules for one language.
#[derive(Debug, Clone)]
pub struct ModifierTable {
    rules: Vec<ModifierRule>,
}

impl ModifierTable {
    pub fn new(builtin: &[BuiltinRule]) -> Result<Self> {
        let rules = builtin
            .iter()
            .map(|rule| ModifierRule::compile(rule.source, rule.pattern, rule.resolution))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Builtin rules with configured ones taking precedence.
    pub fn with_overrides(builtin: &[BuiltinRule], overrides: &[ModifierRuleConfig]) -> Result<Self> {
        let mut rules = Vec::with_capacity(builtin.len() + overrides.len());
        for rule in overrides {
            let resolution = Resolution::parse(&rule.resolves_to).ok_or_else(|| {
                OutlineError::Config(format!("Unknown modifier resolution `{}`", rule.resolves_to))
            })?;
            rules.push(ModifierRule::compile(rule.source, &rule.pattern, resolution)?);
        }
        rules.extend(Self::new(builtin)?.rules);
        Ok(Self { rules })
    }

    pub fn resolve(&self, modifiers: &[RawModifier]) -> ResolvedModifiers {
        let mut resolved = ResolvedModifiers::default();

        for modifier in modifiers {
            let resolution = self
                .rules
                .iter()
                .find(|rule| rule.matches(modifier))
                .map(|rule| rule.resolution);

            match resolution {
                Some(Resolution::Qualifier(Qualifier::Decorated)) => resolved.decorate(&modifier.text),
                Some(Resolution::Qualifier(qualifier)) => {
                    if !resolved.admit(qualifier) {
                        trace!("Conflicting modifier `{}` kept as decorator", modifier.text);
                        resolved.decorate(&modifier.text);
                    }
                }
                Some(Resolution::Visibility(visibility)) => {
                    if resolved.visibility.is_none() {
                        resolved.visibility = Some(visibility);
                    } else {
                        resolved.decorate(&modifier.text);
                    }
                }
                None => {
                    trace!("Unrecognized {:?} modifier `{}` kept as decorator", modifier.source, modifier.text);
                    resolved.decorate(&modifier.text);
                }
            }
        }

        resolved
    }
}
