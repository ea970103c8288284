use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::core::{Language, ModifierSource};
use crate::error::{OutlineError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Extra modifier rules per language name, tried before the builtin ones
    pub modifiers: HashMap<String, Vec<ModifierRuleConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Languages to support
    pub languages: Vec<Language>,

    /// Extra file extensions mapped to a language, e.g. `pyw = "python"`
    pub file_extensions: HashMap<String, Language>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    pub pretty: bool,
}

/// One user-supplied modifier rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierRuleConfig {
    /// Which kind of modifier the rule applies to
    pub source: ModifierSource,

    /// Regex matched against the whole modifier text
    pub pattern: String,

    /// `async`, `static`, `class_level`, `abstract`, `decorated` or a visibility
    pub resolves_to: String,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            languages: Language::ALL.to_vec(),
            file_extensions: HashMap::new(),
            max_file_size: 1024 * 1024, // 1MB
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| OutlineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| OutlineError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                let candidates = ["Outline.toml", "outline.toml", ".outline.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Modifier rules configured for `language`, under its name or an alias.
    pub fn modifier_rules(&self, language: Language) -> &[ModifierRuleConfig] {
        self.modifiers
            .iter()
            .find(|(name, _)| name.parse::<Language>().ok() == Some(language))
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<()> {
        for name in self.modifiers.keys() {
            name.parse::<Language>()
                .map_err(|_| OutlineError::Config(format!("Modifier rules for unknown language `{}`", name)))?;
        }
        if self.parsing.max_file_size == 0 {
            return Err(OutlineError::Config("max_file_size must be positive".to_string()));
        }
        Ok(())
    }
}
