use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use syntax_outline::core::{Engine, Language};
use syntax_outline::OutlineError;

#[derive(Parser)]
#[command(name = "syntax-outline")]
#[command(about = "Language-agnostic declaration outlines for source files")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the outline of each file as JSON
    Outline {
        /// Source files to outline
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Force a language instead of detecting it from the extension
        #[arg(short, long)]
        language: Option<Language>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check a sample file against its golden outline
    Conform {
        /// Source file to outline
        sample: PathBuf,

        /// Golden outline (.toml or .json)
        golden: PathBuf,
    },

    /// List enabled languages and their file extensions
    Languages,
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Outline { files, language, pretty } => {
                let pretty = pretty || engine.config().output.pretty;
                outline(&engine, files, language, pretty).await
            }
            Commands::Conform { sample, golden } => conform(&engine, sample, golden).await,
            Commands::Languages => {
                for language in engine.languages() {
                    println!("{:<12} {}", language.name(), language.file_extensions().join(", "));
                }
                Ok(())
            }
        }
    }
}

async fn outline(engine: &Engine, files: Vec<PathBuf>, language: Option<Language>, pretty: bool) -> Result<()> {
    let results = engine.outline_files(files, language).await;

    let report = results
        .iter()
        .map(|file| file.to_json())
        .collect::<syntax_outline::Result<Vec<_>>>()?;
    let report = serde_json::Value::Array(report);

    let text = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", text);

    let failed = results.iter().filter(|file| file.result.is_err()).count();
    if failed > 0 {
        bail!("{} of {} file(s) could not be outlined", failed, results.len());
    }
    Ok(())
}

async fn conform(engine: &Engine, sample: PathBuf, golden: PathBuf) -> Result<()> {
    match engine.conform(sample.clone(), golden.clone()).await {
        Ok(outline) => {
            info!("✅ {} declarations checked", outline.len() - 1);
            println!("{} conforms to {}", sample.display(), golden.display());
            Ok(())
        }
        Err(OutlineError::Conformance(mismatch)) => {
            let location = mismatch
                .location
                .map(|position| position.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("❌ {} ({})", mismatch, location);
            bail!("{} does not conform to {}", sample.display(), golden.display())
        }
        Err(e) => Err(e.into()),
    }
}
