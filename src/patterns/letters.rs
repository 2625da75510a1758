//! Letter-pair sequences: two independent alphabet counters, each advancing by
//! its own step and wrapping from Z back to A.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{before_blank, Pattern, PatternInverse, PatternSample, Recovery, BLANK, NEXT_PROMPT};
use crate::alphabet::{distance, index_of, letter_at, signed_shift, LETTERS};
use crate::domain::{AnswerValue, Difficulty, Domain};
use crate::error::PatternError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterParams {
  /// Alphabet positions (0 = A) of the first pair.
  pub start: [i64; 2],
  pub steps: [i64; 2],
  pub pairs: usize,
}

impl LetterParams {
  pub fn new(start: &str, steps: [i64; 2], pairs: usize) -> Option<Self> {
    let mut chars = start.chars();
    let first = index_of(chars.next()?)?;
    let second = index_of(chars.next()?)?;
    Some(LetterParams { start: [first, second], steps, pairs })
  }

  pub fn pair(&self, n: usize) -> String {
    let n = n as i64;
    let mut out = String::with_capacity(2);
    out.push(letter_at(self.start[0] + n * self.steps[0]));
    out.push(letter_at(self.start[1] + n * self.steps[1]));
    out
  }

  pub fn shown_pairs(&self) -> Vec<String> {
    (0..self.pairs).map(|n| self.pair(n)).collect()
  }

  pub fn last_shown(&self) -> String {
    self.pair(self.pairs.saturating_sub(1))
  }

  pub fn next_pair(&self) -> String {
    self.pair(self.pairs)
  }

  pub(crate) fn explanation_vars(&self) -> Vec<(&'static str, String)> {
    vec![
      ("first_move", describe_move(self.steps[0])),
      ("second_move", describe_move(self.steps[1])),
      ("last", self.last_shown()),
      ("answer", self.next_pair()),
    ]
  }
}

fn describe_move(step: i64) -> String {
  match signed_shift(step) {
    0 => "stays the same".into(),
    s if s > 0 => format!("moves forward {}", crate::util::plural(s, "letter")),
    s => format!("moves back {}", crate::util::plural(-s, "letter")),
  }
}

pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Result<PatternSample, PatternError> {
  let level = difficulty.level();
  let steps = match level {
    1 => [rng.gen_range(1..=2), rng.gen_range(1..=2)],
    2 => [rng.gen_range(1..=3), rng.gen_range(1..=3)],
    _ => [rng.gen_range(-3..=5), rng.gen_range(-3..=5)],
  };
  let start = [rng.gen_range(0..LETTERS), rng.gen_range(0..LETTERS)];
  let pairs = if level >= 4 { 5 } else { 4 };
  build(LetterParams { start, steps, pairs }, difficulty)
}

pub fn build(params: LetterParams, difficulty: Difficulty) -> Result<PatternSample, PatternError> {
  if params.pairs < 3 {
    return Err(PatternError::degenerate(Domain::LetterSequence, "fewer than 3 pairs shown"));
  }
  if params.steps.iter().all(|s| s.rem_euclid(LETTERS) == 0) {
    return Err(PatternError::degenerate(Domain::LetterSequence, "both letters stand still"));
  }
  let rendered_prompt = format!("{NEXT_PROMPT}\n{}, {BLANK}", params.shown_pairs().join(", "));
  let correct_value = AnswerValue::Letters(params.next_pair());
  Ok(PatternSample { difficulty, pattern: Pattern::LetterSequence(params), rendered_prompt, correct_value })
}

// ---------------------------------------------------------------------------
// Inverse
// ---------------------------------------------------------------------------

static RE_PAIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{2}\b").unwrap());

/// Letter pairs shown before the blank, as character arrays.
pub fn parse_prompt(prompt: &str) -> Result<Vec<[char; 2]>, String> {
  let pairs: Vec<[char; 2]> = RE_PAIR
    .find_iter(before_blank(prompt))
    .filter_map(|m| {
      let mut chars = m.as_str().chars();
      Some([chars.next()?, chars.next()?])
    })
    .collect();
  if pairs.len() < 3 {
    return Err(format!("only {} letter pairs found in prompt, need at least 3", pairs.len()));
  }
  Ok(pairs)
}

/// Per-position step between consecutive pairs, if it never changes.
fn axis_step(pairs: &[[char; 2]], axis: usize) -> Result<i64, Vec<i64>> {
  let steps: Vec<i64> = pairs
    .windows(2)
    .filter_map(|w| distance(w[0][axis], w[1][axis]))
    .collect();
  match steps.first() {
    Some(&first) if steps.len() == pairs.len() - 1 && steps.iter().all(|s| *s == first) => Ok(first),
    _ => Err(steps.into_iter().map(signed_shift).collect()),
  }
}

pub fn infer_next(pairs: &[[char; 2]]) -> Recovery {
  let Some(last) = pairs.last() else {
    return Recovery::Ambiguous("no letter pairs".into());
  };
  let first = axis_step(pairs, 0);
  let second = axis_step(pairs, 1);
  match (first, second) {
    (Ok(a), Ok(b)) => {
      let next: String = [shift_from(last[0], a), shift_from(last[1], b)].iter().collect();
      Recovery::Derived {
        value: AnswerValue::Letters(next),
        rule: format!("first letter {:+}, second letter {:+}", signed_shift(a), signed_shift(b)),
      }
    }
    (Err(steps), _) => Recovery::Ambiguous(format!("first-letter steps {steps:?} are not constant")),
    (_, Err(steps)) => Recovery::Ambiguous(format!("second-letter steps {steps:?} are not constant")),
  }
}

fn shift_from(c: char, step: i64) -> char {
  index_of(c).map(|i| letter_at(i + step)).unwrap_or(c)
}

pub struct LetterInverse;

impl PatternInverse for LetterInverse {
  fn domain(&self) -> Domain {
    Domain::LetterSequence
  }

  fn recover(&self, prompt: &str) -> Recovery {
    match parse_prompt(prompt) {
      Ok(pairs) => infer_next(&pairs),
      Err(why) => Recovery::Ambiguous(why),
    }
  }

  fn explain_mismatch(&self, prompt: &str, claimed: &AnswerValue) -> Option<String> {
    let pairs = parse_prompt(prompt).ok()?;
    let last = pairs.last()?;
    let mut claimed_chars = claimed.as_text()?.chars().map(|c| c.to_ascii_uppercase());
    let a = distance(last[0], claimed_chars.next()?)?;
    let b = distance(last[1], claimed_chars.next()?)?;
    Some(format!(
      "claimed answer follows steps {:+}/{:+} from {}{}",
      signed_shift(a),
      signed_shift(b),
      last[0],
      last[1]
    ))
  }
}
