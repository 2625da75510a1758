//! Domain models shared by generation, verification and storage: content domains,
//! answer values, candidates, verdicts and accepted questions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;
use crate::patterns::visual::ShapeDescriptor;
use crate::patterns::Pattern;

/// Which generative content family a question belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
  NumericSequence,
  LetterSequence,
  CipherCode,
  VisualPattern,
}

impl Domain {
  pub const ALL: [Domain; 4] = [
    Domain::NumericSequence,
    Domain::LetterSequence,
    Domain::CipherCode,
    Domain::VisualPattern,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Domain::NumericSequence => "numeric_sequence",
      Domain::LetterSequence => "letter_sequence",
      Domain::CipherCode => "cipher_code",
      Domain::VisualPattern => "visual_pattern",
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Domain {
  type Err = GenerateError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "numeric_sequence" | "numeric" | "sequences" => Ok(Domain::NumericSequence),
      "letter_sequence" | "letters" | "letter_sequences" => Ok(Domain::LetterSequence),
      "cipher_code" | "cipher" | "code_words" => Ok(Domain::CipherCode),
      "visual_pattern" | "visual" | "nvr_sequences" => Ok(Domain::VisualPattern),
      _ => Err(GenerateError::UnknownDomain(s.to_string())),
    }
  }
}

/// Ordinal difficulty, 1 (foundation) to 5 (challenge).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(level: u8) -> Result<Self, GenerateError> {
    if (Self::MIN..=Self::MAX).contains(&level) {
      Ok(Difficulty(level))
    } else {
      Err(GenerateError::InvalidDifficulty(level))
    }
  }

  pub fn level(self) -> u8 {
    self.0
  }
}

impl Default for Difficulty {
  fn default() -> Self {
    Difficulty(2)
  }
}

impl TryFrom<u8> for Difficulty {
  type Error = GenerateError;
  fn try_from(level: u8) -> Result<Self, Self::Error> {
    Difficulty::new(level)
  }
}

impl From<Difficulty> for u8 {
  fn from(d: Difficulty) -> u8 {
    d.0
  }
}

/// The value of one multiple-choice option, in the domain's native representation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
  Number(i64),
  Letters(String),
  Word(String),
  Shape(ShapeDescriptor),
}

impl AnswerValue {
  /// Domain-aware equality: integers by value, letter strings case-insensitively,
  /// shapes attribute by attribute (rotation modulo the shape's symmetry).
  pub fn matches(&self, other: &AnswerValue) -> bool {
    match (self, other) {
      (AnswerValue::Number(a), AnswerValue::Number(b)) => a == b,
      (AnswerValue::Letters(a), AnswerValue::Letters(b))
      | (AnswerValue::Word(a), AnswerValue::Word(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
      (AnswerValue::Shape(a), AnswerValue::Shape(b)) => a.same_picture(b),
      _ => false,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      AnswerValue::Letters(s) | AnswerValue::Word(s) => Some(s),
      _ => None,
    }
  }
}

impl fmt::Display for AnswerValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AnswerValue::Number(n) => write!(f, "{n}"),
      AnswerValue::Letters(s) | AnswerValue::Word(s) => f.write_str(s),
      AnswerValue::Shape(shape) => write!(f, "{shape}"),
    }
  }
}

/// True when no two values in the slice match under domain equality.
pub fn all_distinct(values: &[&AnswerValue]) -> bool {
  values
    .iter()
    .enumerate()
    .all(|(i, a)| values[i + 1..].iter().all(|b| !a.matches(b)))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
  pub value: AnswerValue,
  pub is_correct: bool,
}

/// Assembly-time artifacts. Kept for provenance; the verifier never reads them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationTrace {
  pub parameters: Pattern,
  pub correct_value: AnswerValue,
}

/// A fully assembled question waiting for verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionCandidate {
  pub id: String,
  pub domain: Domain,
  pub difficulty: Difficulty,
  pub rendered_prompt: String,
  pub options: Vec<AnswerOption>,
  pub correct_index: usize,
  pub explanation: String,
  pub generation: GenerationTrace,
}

impl QuestionCandidate {
  /// The value the candidate claims is correct, if `correct_index` is in range.
  pub fn claimed_answer(&self) -> Option<&AnswerValue> {
    self.options.get(self.correct_index).map(|o| &o.value)
  }

  pub fn option_values(&self) -> Vec<&AnswerValue> {
    self.options.iter().map(|o| &o.value).collect()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Confirmed,
  Contradicted,
  Indeterminate,
}

/// Declared low to high so `min` caps a confidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
  Low,
  Medium,
  High,
}

impl Confidence {
  pub fn capped_at(self, cap: Confidence) -> Confidence {
    self.min(cap)
  }
}

/// The verifier's independent judgement on one candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
  pub outcome: Outcome,
  pub confidence: Confidence,
  pub notes: Vec<String>,
}

impl Verdict {
  pub fn confirmed(confidence: Confidence) -> Self {
    Verdict { outcome: Outcome::Confirmed, confidence, notes: vec![] }
  }

  pub fn contradicted(notes: Vec<String>) -> Self {
    Verdict { outcome: Outcome::Contradicted, confidence: Confidence::High, notes }
  }

  pub fn indeterminate(note: impl Into<String>) -> Self {
    Verdict { outcome: Outcome::Indeterminate, confidence: Confidence::Low, notes: vec![note.into()] }
  }

  pub fn is_confirmed(&self) -> bool {
    self.outcome == Outcome::Confirmed
  }
}

/// A verified candidate handed to storage. Immutable once persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcceptedQuestion {
  pub candidate: QuestionCandidate,
  pub outcome: Outcome,
  pub confidence: Confidence,
  pub notes: Vec<String>,
  pub needs_review: bool,
  pub attempts: u32,
}

impl AcceptedQuestion {
  /// Confirmed verdicts are accepted clean; indeterminate ones are flagged.
  pub fn from_verdict(candidate: QuestionCandidate, verdict: Verdict, attempts: u32) -> Self {
    let needs_review = verdict.outcome != Outcome::Confirmed;
    AcceptedQuestion {
      candidate,
      outcome: verdict.outcome,
      confidence: verdict.confidence,
      notes: verdict.notes,
      needs_review,
      attempts,
    }
  }

  pub fn id(&self) -> &str {
    &self.candidate.id
  }

  /// Manual flag for human review, e.g. raised by an operator.
  pub fn flag_for_review(&mut self, note: impl Into<String>) {
    self.needs_review = true;
    self.notes.push(note.into());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::patterns::visual::{Fill, ShapeKind};

  #[test]
  fn domain_tags_parse_with_aliases() {
    assert_eq!("numeric_sequence".parse::<Domain>().unwrap(), Domain::NumericSequence);
    assert_eq!("Cipher".parse::<Domain>().unwrap(), Domain::CipherCode);
    assert_eq!("code_words".parse::<Domain>().unwrap(), Domain::CipherCode);
    assert!(matches!("geometry".parse::<Domain>(), Err(GenerateError::UnknownDomain(_))));
  }

  #[test]
  fn difficulty_bounds() {
    assert!(Difficulty::new(0).is_err());
    assert!(Difficulty::new(6).is_err());
    assert_eq!(Difficulty::new(5).unwrap().level(), 5);
    let parsed: Result<Difficulty, _> = serde_json::from_str("9");
    assert!(parsed.is_err());
  }

  #[test]
  fn text_values_compare_case_insensitively() {
    let a = AnswerValue::Word("FQI".into());
    let b = AnswerValue::Word("fqi".into());
    assert!(a.matches(&b));
    assert!(!a.matches(&AnswerValue::Letters("FQI".into())));
    assert!(!AnswerValue::Number(16).matches(&AnswerValue::Number(17)));
  }

  #[test]
  fn square_quarter_turns_are_the_same_picture() {
    let a = AnswerValue::Shape(ShapeDescriptor::new(ShapeKind::Square, Fill::Blue, 0, 24));
    let b = AnswerValue::Shape(ShapeDescriptor::new(ShapeKind::Square, Fill::Blue, 90, 24));
    let c = AnswerValue::Shape(ShapeDescriptor::new(ShapeKind::Square, Fill::Blue, 45, 24));
    assert!(a.matches(&b));
    assert!(!a.matches(&c));
    assert!(!all_distinct(&[&a, &c, &b]));
  }

  #[test]
  fn confidence_cap() {
    assert_eq!(Confidence::High.capped_at(Confidence::Medium), Confidence::Medium);
    assert_eq!(Confidence::Low.capped_at(Confidence::Medium), Confidence::Low);
  }
}
