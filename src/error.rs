//! Error types for the generation core.
//!
//! Each subsystem owns a small enum. Recoverable-by-retry failures (`PatternError`,
//! `DistractorError`, `AssemblyError`) never leave the pipeline controller;
//! `GenerateError` is what callers of `generate_batch` can observe.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::domain::Domain;

/// Forward generation refused its own random draw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
  #[error("degenerate {domain} parameters: {reason}")]
  Degenerate { domain: Domain, reason: String },
}

impl PatternError {
  pub fn degenerate(domain: Domain, reason: impl Into<String>) -> Self {
    PatternError::Degenerate { domain, reason: reason.into() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistractorError {
  #[error("only {produced} distinct distractors available, {wanted} required")]
  Insufficient { wanted: usize, produced: usize },
}

/// Reason tag carried by `AssemblyError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
  DegeneratePattern,
  InsufficientDistractors,
}

impl fmt::Display for FailureReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      FailureReason::DegeneratePattern => "degenerate_pattern",
      FailureReason::InsufficientDistractors => "insufficient_distractors",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("assembly failed ({reason}): {detail}")]
pub struct AssemblyError {
  pub reason: FailureReason,
  pub detail: String,
}

impl From<PatternError> for AssemblyError {
  fn from(e: PatternError) -> Self {
    AssemblyError { reason: FailureReason::DegeneratePattern, detail: e.to_string() }
  }
}

impl From<DistractorError> for AssemblyError {
  fn from(e: DistractorError) -> Self {
    AssemblyError { reason: FailureReason::InsufficientDistractors, detail: e.to_string() }
  }
}

/// Storage collaborator failures. Transient ones are retried with the same id.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("transient storage failure: {0}")]
  Transient(String),

  #[error("permanent storage failure: {0}")]
  Permanent(String),

  #[error("storage I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("storage encoding error: {0}")]
  Encoding(#[from] serde_json::Error),
}

/// Serializable classification of a `StoreError`, reported per failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
  Transient,
  Permanent,
  Io,
  Encoding,
}

impl StoreError {
  pub fn kind(&self) -> StoreErrorKind {
    match self {
      StoreError::Transient(_) => StoreErrorKind::Transient,
      StoreError::Permanent(_) => StoreErrorKind::Permanent,
      StoreError::Io(_) => StoreErrorKind::Io,
      StoreError::Encoding(_) => StoreErrorKind::Encoding,
    }
  }

  pub fn is_transient(&self) -> bool {
    match self {
      StoreError::Transient(_) => true,
      StoreError::Io(e) => matches!(
        e.kind(),
        std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
      ),
      StoreError::Permanent(_) | StoreError::Encoding(_) => false,
    }
  }
}

/// Fatal failures surfaced to callers of the batch interface.
#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("unknown domain tag '{0}' (expected numeric_sequence, letter_sequence, cipher_code or visual_pattern)")]
  UnknownDomain(String),

  #[error("difficulty {0} is outside 1..=5")]
  InvalidDifficulty(u8),

  #[error("storage rejected question {id}: {source}")]
  Storage {
    id: String,
    #[source]
    source: StoreError,
  },

  #[error("could not start worker pool: {0}")]
  WorkerPool(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}
