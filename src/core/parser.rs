use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::frontend::FrontEnd;
use super::languages::{DeclarationSyntax, Language};
use super::model::Outline;
use super::modifiers::ModifierTable;
use super::normalizer::Normalizer;
use crate::config::{Config, ModifierRuleConfig, ParsingConfig};
use crate::error::{OutlineError, Result};

/// A language front end paired with its compiled modifier table.
struct LanguageSupport {
    syntax: Box<dyn DeclarationSyntax>,
    modifiers: ModifierTable,
}

/// Multi-language outline parser that delegates to language front ends.
///
/// Holds no parser state between calls: every parse builds a fresh
/// tree-sitter parser, so one `OutlineParser` can be shared across threads.
pub struct OutlineParser {
    config: ParsingConfig,
    languages: HashMap<Language, LanguageSupport>,
}

impl OutlineParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        Self::build(config, |_: Language| -> &'static [ModifierRuleConfig] { &[] })
    }

    /// Parser honouring both the parsing section and configured modifier rules.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(&config.parsing, |language| config.modifier_rules(language))
    }

    fn build<'c>(
        config: &ParsingConfig,
        overrides: impl Fn(Language) -> &'c [ModifierRuleConfig],
    ) -> Result<Self> {
        let mut languages = HashMap::new();

        // Initialize language front ends based on configuration
        for &language in &config.languages {
            let syntax = language.syntax();
            let modifiers = ModifierTable::with_overrides(syntax.modifier_rules(), overrides(language))?;
            // fail early on a grammar the linked tree-sitter cannot load
            FrontEnd::new(syntax.as_ref())?;
            languages.insert(language, LanguageSupport { syntax, modifiers });
        }

        Ok(Self {
            config: config.clone(),
            languages,
        })
    }

    pub fn supports(&self, language: Language) -> bool {
        self.languages.contains_key(&language)
    }

    /// Enabled languages in a stable order.
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<_> = self.languages.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Language for a file, from configured extension overrides first.
    pub fn detect_language(&self, path: &Path) -> Result<Language> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| OutlineError::UnsupportedLanguage(path.display().to_string()))?;

        let language = self
            .config
            .file_extensions
            .get(extension)
            .copied()
            .or_else(|| Language::from_extension(extension))
            .ok_or_else(|| OutlineError::UnsupportedLanguage(format!(".{} ({})", extension, path.display())))?;

        if !self.supports(language) {
            return Err(OutlineError::UnsupportedLanguage(format!("{} is disabled", language)));
        }
        Ok(language)
    }

    /// Outline of an anonymous module.
    pub fn parse(&self, language: Language, source: &str) -> Result<Outline> {
        self.parse_named(language, "", source)
    }

    pub fn parse_named(&self, language: Language, module_name: &str, source: &str) -> Result<Outline> {
        let support = self
            .languages
            .get(&language)
            .ok_or_else(|| OutlineError::UnsupportedLanguage(language.to_string()))?;

        let mut front_end = FrontEnd::new(support.syntax.as_ref())?;
        let tree = front_end.parse(source)?;
        let outline = Normalizer::new(&support.modifiers).normalize(support.syntax.as_ref(), module_name, &tree)?;

        debug!("Parsed {} module `{}` into {} declarations", language, module_name, outline.len() - 1);
        Ok(outline)
    }

    /// Read, size-check and outline a single source file.
    pub fn parse_path<P: AsRef<Path>>(&self, file_path: P) -> Result<Outline> {
        let path = file_path.as_ref();
        let language = self.detect_language(path)?;
        self.parse_path_as(path, language)
    }

    /// Like [`parse_path`](Self::parse_path) with the language given explicitly.
    pub fn parse_path_as<P: AsRef<Path>>(&self, file_path: P, language: Language) -> Result<Outline> {
        let path = file_path.as_ref();

        // Check file size before reading
        let size = std::fs::metadata(path)?.len() as usize;
        if size > self.config.max_file_size {
            return Err(OutlineError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.config.max_file_size,
            });
        }

        let source = std::fs::read_to_string(path)?;
        let module_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();

        self.parse_named(language, &module_name, &source)
    }
}
