//! Pattern library: one forward generator and one independent inverse per domain.
//!
//! Forward generators draw parameters from an explicit rng, refuse degenerate draws,
//! and render the prompt a student would read. Inverses get nothing but that prompt
//! and re-derive the expected answer from it; they never call back into the forward
//! code path, which is what gives verification its bug-catching power.
//!
//! Each inverse is split into a text scanner (`parse_prompt`) and a rule inference
//! step (`infer_next`) so prompt formatting and pattern math can be tested apart.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{AnswerValue, Confidence, Difficulty, Domain};
use crate::error::PatternError;

pub mod cipher;
pub mod letters;
pub mod numeric;
pub mod visual;

pub use cipher::CipherParams;
pub use letters::LetterParams;
pub use numeric::NumericParams;
pub use visual::{AnalogyParams, VisualParams};

/// Instruction line shared by the sequence domains.
pub const NEXT_PROMPT: &str = "What comes next in the sequence?";
/// Placeholder for the missing term.
pub const BLANK: &str = "___";

/// Strongly-typed generation parameters, one variant per domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "params", rename_all = "snake_case")]
pub enum Pattern {
  NumericSequence(NumericParams),
  LetterSequence(LetterParams),
  CipherCode(CipherParams),
  VisualPattern(VisualParams),
  /// Also in the visual domain: "A is to B as C is to ?".
  VisualAnalogy(AnalogyParams),
}

impl Pattern {
  pub fn domain(&self) -> Domain {
    match self {
      Pattern::NumericSequence(_) => Domain::NumericSequence,
      Pattern::LetterSequence(_) => Domain::LetterSequence,
      Pattern::CipherCode(_) => Domain::CipherCode,
      Pattern::VisualPattern(_) | Pattern::VisualAnalogy(_) => Domain::VisualPattern,
    }
  }

  /// Which explanation template describes this pattern.
  pub fn explanation_key(&self) -> &'static str {
    match self {
      Pattern::NumericSequence(p) => p.explanation_key(),
      Pattern::LetterSequence(_) => "letter_sequence",
      Pattern::CipherCode(_) => "cipher_code",
      Pattern::VisualPattern(p) => p.explanation_key(),
      Pattern::VisualAnalogy(_) => "visual_analogy",
    }
  }

  /// Placeholder values for the explanation template, derived from the parameters.
  pub fn explanation_vars(&self) -> Vec<(&'static str, String)> {
    match self {
      Pattern::NumericSequence(p) => p.explanation_vars(),
      Pattern::LetterSequence(p) => p.explanation_vars(),
      Pattern::CipherCode(p) => p.explanation_vars(),
      Pattern::VisualPattern(p) => p.explanation_vars(),
      Pattern::VisualAnalogy(p) => p.explanation_vars(),
    }
  }
}

/// One draw from the pattern library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternSample {
  pub difficulty: Difficulty,
  pub pattern: Pattern,
  pub rendered_prompt: String,
  pub correct_value: AnswerValue,
}

impl PatternSample {
  pub fn domain(&self) -> Domain {
    self.pattern.domain()
  }
}

/// Draw a fresh sample for `domain`. Degenerate draws are rejected, never emitted.
pub fn sample<R: Rng + ?Sized>(
  domain: Domain,
  difficulty: Difficulty,
  rng: &mut R,
) -> Result<PatternSample, PatternError> {
  match domain {
    Domain::NumericSequence => numeric::generate(difficulty, rng),
    Domain::LetterSequence => letters::generate(difficulty, rng),
    Domain::CipherCode => cipher::generate(difficulty, rng),
    Domain::VisualPattern => visual::generate(difficulty, rng),
  }
}

/// What an inverse could re-derive from prompt text alone.
#[derive(Clone, Debug, PartialEq)]
pub enum Recovery {
  Derived { value: AnswerValue, rule: String },
  Ambiguous(String),
}

/// Re-derives a domain's expected answer from the rendered prompt.
pub trait PatternInverse: Send + Sync {
  fn domain(&self) -> Domain;

  fn recover(&self, prompt: &str) -> Recovery;

  /// Extra context for a mismatch, e.g. which rule the claimed answer would follow.
  fn explain_mismatch(&self, _prompt: &str, _claimed: &AnswerValue) -> Option<String> {
    None
  }

  /// Highest confidence a confirmation in this domain may carry.
  fn confidence_cap(&self) -> Confidence {
    Confidence::High
  }
}

pub fn inverse_for(domain: Domain) -> &'static dyn PatternInverse {
  match domain {
    Domain::NumericSequence => &numeric::NumericInverse,
    Domain::LetterSequence => &letters::LetterInverse,
    Domain::CipherCode => &cipher::CipherInverse,
    Domain::VisualPattern => &visual::VisualInverse,
  }
}

/// Prompt text before the blank, where the shown terms live.
pub(crate) fn before_blank(prompt: &str) -> &str {
  prompt.split(BLANK).next().unwrap_or(prompt)
}
