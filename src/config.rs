//! Generator configuration from TOML, with environment overrides.
//!
//! See `GeneratorConfig` for the expected schema. Every section and field is
//! optional; missing values fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::ConfigError;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 8;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GeneratorConfig {
  #[serde(default)]
  pub pipeline: PipelineConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub explanations: Explanations,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Generate/verify cycles per item before it is discarded.
  pub max_attempts: u32,
  /// Options per question, correct one included.
  pub option_count: usize,
  /// How many times the assembler may widen distractor ranges after a shortfall.
  pub max_widen: u32,
  /// Worker threads for a batch; 0 lets rayon decide.
  pub workers: usize,
  /// Batch seed used when a request carries none; absent means OS entropy.
  pub seed: Option<u64>,
  /// Retries for transient storage failures, same candidate id each time.
  pub store_retries: u32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self { max_attempts: 10, option_count: 5, max_widen: 2, workers: 0, seed: None, store_retries: 3 }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
  /// JSON-lines file for accepted questions; in-memory storage when absent.
  pub path: Option<PathBuf>,
}

/// Explanation templates, one per pattern family. `{key}` placeholders are
/// filled from the generation parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Explanations {
  pub numeric_arithmetic: String,
  pub numeric_quadratic: String,
  pub letter_sequence: String,
  pub cipher_code: String,
  pub visual_rotation: String,
  pub visual_size: String,
  pub visual_progression: String,
  pub visual_analogy: String,
}

impl Default for Explanations {
  fn default() -> Self {
    Self {
      numeric_arithmetic: "Each term {trend} by {step}, so the next term is {last} {op} {next_diff} = {answer}.".into(),
      numeric_quadratic: "The differences ({diffs}) {growth_trend} by {growth} each time, so the next difference is {op}{next_diff} and the next term is {last} {op} {next_diff} = {answer}.".into(),
      letter_sequence: "The first letter {first_move} and the second letter {second_move} each time, so after {last} comes {answer}.".into(),
      cipher_code: "The shift is {shift} letters: each letter moves {direction} {places} ({example} becomes {coded}). Applying the same shift to {target} ({mapping}) gives {answer}.".into(),
      visual_rotation: "The {shape} turns {step}° {direction} each step ({total}° over {frames} steps), so the next frame is a {answer}.{fill_note}".into(),
      visual_size: "The {shape} {direction} in size by {step} each step, so the next size is {answer_size}.{fill_note}".into(),
      visual_progression: "Each shape {direction} {step} side(s) ({sides}), so the next shape is a {answer_shape}.{fill_note}".into(),
      visual_analogy: "A becomes B when the {first_shape} {change}. Doing the same to the {second_shape} gives a {answer}.".into(),
    }
  }
}

impl Explanations {
  pub fn template(&self, key: &str) -> Option<&str> {
    let tpl = match key {
      "numeric_arithmetic" => &self.numeric_arithmetic,
      "numeric_quadratic" => &self.numeric_quadratic,
      "letter_sequence" => &self.letter_sequence,
      "cipher_code" => &self.cipher_code,
      "visual_rotation" => &self.visual_rotation,
      "visual_size" => &self.visual_size,
      "visual_progression" => &self.visual_progression,
      "visual_analogy" => &self.visual_analogy,
      _ => return None,
    };
    Some(tpl.as_str())
  }
}

impl GeneratorConfig {
  pub fn from_toml_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
    let mut cfg: GeneratorConfig =
      toml::from_str(s).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    cfg.normalize();
    Ok(cfg)
  }

  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    Self::from_toml_str(&s, path)
  }

  /// Clamp values the pipeline cannot work with.
  fn normalize(&mut self) {
    let p = &mut self.pipeline;
    let clamped = p.option_count.clamp(MIN_OPTIONS, MAX_OPTIONS);
    if clamped != p.option_count {
      warn!(target: "qgen", requested = p.option_count, used = clamped, "option_count out of range; clamped");
      p.option_count = clamped;
    }
    if p.max_attempts == 0 {
      warn!(target: "qgen", "max_attempts = 0 would discard everything; using 1");
      p.max_attempts = 1;
    }
  }

  /// `QGEN_STORE_PATH`, `QGEN_SEED` and `QGEN_WORKERS` win over the file.
  pub fn apply_env_overrides(&mut self) {
    if let Ok(path) = std::env::var("QGEN_STORE_PATH") {
      if !path.is_empty() {
        self.storage.path = Some(PathBuf::from(path));
      }
    }
    if let Some(seed) = env_parse::<u64>("QGEN_SEED") {
      self.pipeline.seed = Some(seed);
    }
    if let Some(workers) = env_parse::<usize>("QGEN_WORKERS") {
      self.pipeline.workers = workers;
    }
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  let raw = std::env::var(key).ok()?;
  match raw.parse() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!(target: "qgen", %key, value = %raw, "Ignoring unparsable environment override");
      None
    }
  }
}

/// Load from QGEN_CONFIG_PATH if set. On any IO/parse error, log and use defaults.
/// Environment overrides are applied either way.
pub fn load_config_from_env() -> GeneratorConfig {
  let mut cfg = match std::env::var("QGEN_CONFIG_PATH") {
    Ok(path) => match GeneratorConfig::load(Path::new(&path)) {
      Ok(cfg) => {
        info!(target: "qgen", %path, "Loaded generator config (TOML)");
        cfg
      }
      Err(e) => {
        error!(target: "qgen", %path, error = %e, "Failed to load config; using defaults");
        GeneratorConfig::default()
      }
    },
    Err(_) => GeneratorConfig::default(),
  };
  cfg.apply_env_overrides();
  cfg
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_file_keeps_defaults() {
    let cfg = GeneratorConfig::from_toml_str(
      "[pipeline]\nmax_attempts = 4\nseed = 99\n\n[explanations]\ncipher_code = \"shift {shift}\"\n",
      Path::new("inline.toml"),
    )
    .unwrap();
    assert_eq!(cfg.pipeline.max_attempts, 4);
    assert_eq!(cfg.pipeline.seed, Some(99));
    assert_eq!(cfg.pipeline.option_count, 5);
    assert_eq!(cfg.explanations.template("cipher_code"), Some("shift {shift}"));
    assert!(cfg.explanations.letter_sequence.contains("{answer}"));
    assert!(cfg.storage.path.is_none());
  }

  #[test]
  fn option_count_is_clamped() {
    let cfg = GeneratorConfig::from_toml_str("[pipeline]\noption_count = 40\n", Path::new("x.toml")).unwrap();
    assert_eq!(cfg.pipeline.option_count, MAX_OPTIONS);
  }

  #[test]
  fn bad_toml_is_a_parse_error() {
    let err = GeneratorConfig::from_toml_str("[pipeline\n", Path::new("broken.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("broken.toml"));
  }

  #[test]
  fn missing_file_is_a_read_error() {
    let err = GeneratorConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
  }

  #[test]
  fn every_pattern_key_has_a_template() {
    let e = Explanations::default();
    for key in [
      "numeric_arithmetic",
      "numeric_quadratic",
      "letter_sequence",
      "cipher_code",
      "visual_rotation",
      "visual_size",
      "visual_progression",
      "visual_analogy",
    ] {
      assert!(e.template(key).is_some(), "{key}");
    }
    assert!(e.template("nope").is_none());
  }
}
