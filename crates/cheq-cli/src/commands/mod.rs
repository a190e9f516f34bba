//! Subcommands and the helpers they share.

pub mod config;
pub mod inspect;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;
use tracing::debug;

use cheq_core::{ChequeConfig, TokenLayout};

/// Where the token layout comes from.
#[derive(Args)]
pub struct InputArgs {
    /// Token layout JSON file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Read the input as a PaddleOCR result (rec_texts, rec_scores, rec_polys)
    #[arg(long, requires_all = ["width", "height"])]
    pub paddle: bool,

    /// Image width in pixels (PaddleOCR input)
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels (PaddleOCR input)
    #[arg(long)]
    pub height: Option<u32>,
}

#[derive(Deserialize)]
struct PaddleResult {
    rec_texts: Vec<String>,
    #[serde(default)]
    rec_scores: Vec<f32>,
    rec_polys: Vec<[[f32; 2]; 4]>,
}

impl InputArgs {
    /// Load and parse the layout file.
    pub fn load_layout(&self) -> anyhow::Result<TokenLayout> {
        if !self.input.exists() {
            anyhow::bail!("Input file not found: {}", self.input.display());
        }
        let content = fs::read_to_string(&self.input)?;

        if !self.paddle {
            return Ok(serde_json::from_str(&content)?);
        }

        // PaddleOCR writes the arrays either at the top level or under "res".
        let mut value: serde_json::Value = serde_json::from_str(&content)?;
        if let Some(res) = value.get_mut("res") {
            value = res.take();
        }
        let result: PaddleResult = serde_json::from_value(value)?;
        if result.rec_texts.len() != result.rec_polys.len() {
            anyhow::bail!(
                "PaddleOCR result has {} texts but {} polygons",
                result.rec_texts.len(),
                result.rec_polys.len()
            );
        }

        let (width, height) = (self.width.unwrap_or(0), self.height.unwrap_or(0));
        debug!("Read {} PaddleOCR texts", result.rec_texts.len());
        Ok(TokenLayout::from_paddle(
            &result.rec_texts,
            &result.rec_scores,
            &result.rec_polys,
            width,
            height,
        ))
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cheq")
        .join("config.json")
}

/// Load the configuration from `path`, or the default location when it
/// exists, then apply `CHEQ_*` environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ChequeConfig> {
    let mut config = match path {
        Some(path) => ChequeConfig::from_file(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                ChequeConfig::from_file(&default_path)?
            } else {
                ChequeConfig::default()
            }
        }
    };

    let applied = config.apply_env_overrides()?;
    if applied > 0 {
        debug!("Applied {} environment overrides", applied);
    }
    config.validate()?;
    Ok(config)
}
