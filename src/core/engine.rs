use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::conformance::Harness;
use super::languages::Language;
use super::model::Outline;
use super::parser::OutlineParser;
use crate::config::Config;
use crate::error::{OutlineError, Result};

/// Outcome for one input file; failures stay local to their file.
#[derive(Debug)]
pub struct FileOutline {
    pub path: PathBuf,
    pub result: Result<Outline>,
}

impl FileOutline {
    /// JSON report entry: the outline, or the error message.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let value = match &self.result {
            Ok(outline) => json!({
                "path": self.path,
                "outline": serde_json::to_value(outline)?,
            }),
            Err(error) => json!({
                "path": self.path,
                "error": error.to_string(),
            }),
        };
        Ok(value)
    }
}

/// Main orchestration engine: fans explicit file lists out to blocking workers.
pub struct Engine {
    config: Config,
    parser: Arc<OutlineParser>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        debug!("Loaded configuration: {:?}", config);
        let parser = OutlineParser::from_config(&config)?;

        Ok(Self {
            config,
            parser: Arc::new(parser),
        })
    }

    /// Create an engine from a config file, or the defaults when none is found.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::new(Config::load_or_default(config_path)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn parser(&self) -> &OutlineParser {
        &self.parser
    }

    pub fn languages(&self) -> Vec<Language> {
        self.parser.languages()
    }

    /// Outline every file concurrently, one blocking task per file.
    ///
    /// Results come back in input order. `language` forces a front end
    /// instead of detecting one from each extension.
    pub async fn outline_files(&self, paths: Vec<PathBuf>, language: Option<Language>) -> Vec<FileOutline> {
        info!("🔍 Outlining {} file(s)", paths.len());

        let mut tasks = JoinSet::new();
        for (index, path) in paths.iter().cloned().enumerate() {
            let parser = Arc::clone(&self.parser);
            tasks.spawn_blocking(move || {
                let result = match language {
                    Some(language) => parser.parse_path_as(&path, language),
                    None => parser.parse_path(&path),
                };
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<Outline>>> = paths.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!("⚠️ Outline worker failed: {}", e),
            }
        }

        let outlines: Vec<FileOutline> = paths
            .into_iter()
            .zip(results)
            .map(|(path, result)| {
                let result = result.unwrap_or_else(|| {
                    Err(OutlineError::Task(format!("no result for {}", path.display())))
                });
                if let Err(e) = &result {
                    warn!("⚠️ Failed to outline {}: {}", path.display(), e);
                }
                FileOutline { path, result }
            })
            .collect();

        let succeeded = outlines.iter().filter(|file| file.result.is_ok()).count();
        info!("✅ Outlined {}/{} file(s)", succeeded, outlines.len());
        outlines
    }

    /// Check a sample against its golden outline off the async runtime.
    pub async fn conform(&self, sample: PathBuf, golden: PathBuf) -> Result<Outline> {
        info!("🧪 Checking {} against {}", sample.display(), golden.display());
        let parser = Arc::clone(&self.parser);

        tokio::task::spawn_blocking(move || Harness::check_with(&parser, &sample, &golden))
            .await
            .map_err(|e| OutlineError::Task(e.to_string()))?
    }
}
