//! Cipher codes: one alphabetic shift applied letter by letter. The prompt shows
//! an example word with its code and asks for the code of a target word.

use std::sync::LazyLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Pattern, PatternInverse, PatternSample, Recovery};
use crate::alphabet::{distance, index_of, letter_at, shift_char, signed_shift};
use crate::domain::{AnswerValue, Difficulty, Domain};
use crate::error::PatternError;
use crate::seeds::CIPHER_WORDS;
use crate::util::plural;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherParams {
  pub shift: i64,
  pub example: String,
  pub target: String,
}

impl CipherParams {
  pub fn new(shift: i64, example: &str, target: &str) -> Self {
    CipherParams { shift, example: example.to_ascii_uppercase(), target: target.to_ascii_uppercase() }
  }

  pub fn coded_example(&self) -> String {
    encode(&self.example, self.shift)
  }

  pub fn coded_target(&self) -> String {
    encode(&self.target, self.shift)
  }

  pub(crate) fn explanation_vars(&self) -> Vec<(&'static str, String)> {
    let answer = self.coded_target();
    let mapping: Vec<String> = self
      .target
      .chars()
      .zip(answer.chars())
      .filter(|(a, _)| a.is_ascii_alphabetic())
      .map(|(a, b)| format!("{a}->{b}"))
      .collect();
    vec![
      ("direction", if self.shift > 0 { "forward" } else { "backward" }.into()),
      ("places", plural(self.shift.abs(), "place")),
      ("shift", format!("{:+}", self.shift)),
      ("example", self.example.clone()),
      ("coded", self.coded_example()),
      ("target", self.target.clone()),
      ("mapping", mapping.join(", ")),
      ("answer", answer),
    ]
  }
}

/// Shift every letter by `shift` (mod 26); other characters pass through.
pub fn encode(word: &str, shift: i64) -> String {
  word.chars().map(|c| shift_char(c.to_ascii_uppercase(), shift)).collect()
}

fn max_shift(difficulty: Difficulty) -> i64 {
  match difficulty.level() {
    1 => 2,
    2 => 3,
    3 => 5,
    _ => 9,
  }
}

pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Result<PatternSample, PatternError> {
  let magnitude = rng.gen_range(1..=max_shift(difficulty));
  let shift = if rng.gen_bool(0.5) { magnitude } else { -magnitude };

  let example = CIPHER_WORDS
    .choose(rng)
    .ok_or_else(|| PatternError::degenerate(Domain::CipherCode, "empty word bank"))?;
  let partners: Vec<&&str> = CIPHER_WORDS
    .iter()
    .filter(|w| w.len() == example.len() && *w != example)
    .collect();
  let target = partners
    .choose(rng)
    .ok_or_else(|| PatternError::degenerate(Domain::CipherCode, format!("no partner word for {example}")))?;

  build(CipherParams::new(shift, example, target), difficulty)
}

pub fn build(params: CipherParams, difficulty: Difficulty) -> Result<PatternSample, PatternError> {
  if signed_shift(params.shift) == 0 {
    return Err(PatternError::degenerate(Domain::CipherCode, "shift of zero leaves words unchanged"));
  }
  for word in [&params.example, &params.target] {
    if !word.chars().any(|c| c.is_ascii_alphabetic()) {
      return Err(PatternError::degenerate(Domain::CipherCode, format!("'{word}' has no letters to shift")));
    }
    if word.chars().any(char::is_whitespace) {
      return Err(PatternError::degenerate(Domain::CipherCode, format!("'{word}' is not a single word")));
    }
  }
  if params.example == params.target {
    return Err(PatternError::degenerate(Domain::CipherCode, "example and target are the same word"));
  }

  let rendered_prompt = format!(
    "If {} is coded as {}, what is the code for {}?",
    params.example,
    params.coded_example(),
    params.target
  );
  let correct_value = AnswerValue::Word(params.coded_target());
  Ok(PatternSample { difficulty, pattern: Pattern::CipherCode(params), rendered_prompt, correct_value })
}

// ---------------------------------------------------------------------------
// Inverse
// ---------------------------------------------------------------------------

static RE_CODED: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\bif\s+([A-Z'\-]+)\s+is\s+coded\s+as\s+([A-Z'\-]+),?\s+what\s+is\s+the\s+code\s+for\s+([A-Z'\-]+)")
    .unwrap()
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherPrompt {
  pub example: String,
  pub coded: String,
  pub target: String,
}

pub fn parse_prompt(prompt: &str) -> Result<CipherPrompt, String> {
  let caps = RE_CODED
    .captures(prompt)
    .ok_or_else(|| "prompt does not read 'If X is coded as Y, what is the code for Z?'".to_string())?;
  Ok(CipherPrompt {
    example: caps[1].to_ascii_uppercase(),
    coded: caps[2].to_ascii_uppercase(),
    target: caps[3].to_ascii_uppercase(),
  })
}

/// The single shift (in `0..26`) taking `plain` to `coded`, position by position.
pub fn infer_shift(plain: &str, coded: &str) -> Result<i64, String> {
  let plain: Vec<char> = plain.chars().collect();
  let coded: Vec<char> = coded.chars().collect();
  if plain.len() != coded.len() {
    return Err(format!("{} letters coded as {} letters", plain.len(), coded.len()));
  }
  let mut shifts = Vec::with_capacity(plain.len());
  for (p, c) in plain.iter().zip(&coded) {
    match distance(*p, *c) {
      Some(s) => shifts.push(s),
      None if p == c => {}
      None => return Err(format!("'{p}' cannot be coded as '{c}'")),
    }
  }
  match shifts.first() {
    None => Err("no letters to compare".into()),
    Some(&first) if shifts.iter().all(|s| *s == first) => Ok(first),
    Some(_) => {
      let signed: Vec<String> = shifts.iter().map(|s| format!("{:+}", signed_shift(*s))).collect();
      Err(format!("letters are shifted by different amounts ({})", signed.join(", ")))
    }
  }
}

fn apply_shift(word: &str, shift: i64) -> String {
  word
    .chars()
    .map(|c| match index_of(c) {
      Some(i) => letter_at(i + shift),
      None => c,
    })
    .collect()
}

pub fn infer_answer(parsed: &CipherPrompt) -> Recovery {
  match infer_shift(&parsed.example, &parsed.coded) {
    Ok(0) => Recovery::Ambiguous(format!("{} is coded as itself; no shift to apply", parsed.example)),
    Ok(shift) => Recovery::Derived {
      value: AnswerValue::Word(apply_shift(&parsed.target, shift)),
      rule: format!("shift {:+}", signed_shift(shift)),
    },
    Err(why) => Recovery::Ambiguous(why),
  }
}

pub struct CipherInverse;

impl PatternInverse for CipherInverse {
  fn domain(&self) -> Domain {
    Domain::CipherCode
  }

  fn recover(&self, prompt: &str) -> Recovery {
    match parse_prompt(prompt) {
      Ok(parsed) => infer_answer(&parsed),
      Err(why) => Recovery::Ambiguous(why),
    }
  }

  fn explain_mismatch(&self, prompt: &str, claimed: &AnswerValue) -> Option<String> {
    let parsed = parse_prompt(prompt).ok()?;
    let implied = signed_shift(infer_shift(&parsed.example, &parsed.coded).ok()?);
    let claimed = claimed.as_text()?.to_ascii_uppercase();
    Some(match infer_shift(&parsed.target, &claimed) {
      Ok(s) => format!(
        "prompt implies shift {implied:+}, but claimed answer {claimed} is {} shifted by {:+}",
        parsed.target,
        signed_shift(s)
      ),
      Err(why) => format!(
        "prompt implies shift {implied:+}, but claimed answer {claimed} is not a uniform shift of {} ({why})",
        parsed.target
      ),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn d(level: u8) -> Difficulty {
    Difficulty::new(level).unwrap()
  }

  #[test]
  fn cat_dog_shift_two() {
    let sample = build(CipherParams::new(2, "CAT", "DOG"), d(2)).unwrap();
    assert_eq!(sample.rendered_prompt, "If CAT is coded as ECV, what is the code for DOG?");
    assert_eq!(sample.correct_value, AnswerValue::Word("FQI".into()));
  }

  #[test]
  fn non_letters_pass_through() {
    assert_eq!(encode("ICE-CAP", 1), "JDF-DBQ");
    assert_eq!(infer_shift("ICE-CAP", "JDF-DBQ"), Ok(1));
    assert!(infer_shift("ICE-CAP", "JDFXDBQ").is_err());
  }

  #[test]
  fn negative_shift_wraps() {
    assert_eq!(encode("ABC", -2), "YZA");
    let parsed = parse_prompt("If ABC is coded as YZA, what is the code for BED?").unwrap();
    assert!(matches!(
      infer_answer(&parsed),
      Recovery::Derived { value: AnswerValue::Word(ref w), ref rule } if w == "ZCB" && rule == "shift -2"
    ));
  }

  #[test]
  fn inconsistent_example_is_ambiguous() {
    let parsed = parse_prompt("If CAT is coded as ECW, what is the code for DOG?").unwrap();
    assert!(matches!(infer_answer(&parsed), Recovery::Ambiguous(ref why) if why.contains("different amounts")));
  }

  #[test]
  fn zero_shift_is_rejected() {
    assert!(build(CipherParams::new(0, "CAT", "DOG"), d(1)).is_err());
    assert!(build(CipherParams::new(26, "CAT", "DOG"), d(1)).is_err());
    assert!(build(CipherParams::new(2, "CAT", "CAT"), d(1)).is_err());
  }

  #[test]
  fn mismatch_names_both_shifts() {
    let note = CipherInverse
      .explain_mismatch("If CAT is coded as ECV, what is the code for DOG?", &AnswerValue::Word("GRJ".into()))
      .unwrap();
    assert!(note.contains("+2"), "{note}");
    assert!(note.contains("+3"), "{note}");
  }

  proptest! {
    #[test]
    fn round_trip_and_no_collision(shift in 1i64..26, other in 1i64..26, word in "[A-Z]{3,8}") {
      let coded = encode(&word, shift);
      prop_assert_eq!(infer_shift(&word, &coded), Ok(shift));
      if other != shift {
        prop_assert_ne!(encode(&word, other), coded);
      }
    }
  }
}
