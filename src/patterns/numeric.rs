//! Numeric sequences: arithmetic (constant step) and quadratic (step grows by a
//! constant second-order step).

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{before_blank, Pattern, PatternInverse, PatternSample, Recovery, BLANK, NEXT_PROMPT};
use crate::domain::{AnswerValue, Difficulty, Domain};
use crate::error::PatternError;

const MIN_TERMS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
  Arithmetic,
  Quadratic,
}

/// `term(n) = start + n*step + growth*n*(n-1)/2`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericParams {
  pub start: i64,
  pub step: i64,
  #[serde(default)]
  pub growth: i64,
  pub terms: usize,
}

impl NumericParams {
  pub fn arithmetic(start: i64, step: i64, terms: usize) -> Self {
    NumericParams { start, step, growth: 0, terms }
  }

  pub fn quadratic(start: i64, step: i64, growth: i64, terms: usize) -> Self {
    NumericParams { start, step, growth, terms }
  }

  pub fn progression(&self) -> Progression {
    if self.growth == 0 { Progression::Arithmetic } else { Progression::Quadratic }
  }

  pub fn term(&self, n: usize) -> i64 {
    let n = n as i64;
    self.start + n * self.step + self.growth * n * (n - 1) / 2
  }

  /// Difference between term `n + 1` and term `n`.
  pub fn diff_after(&self, n: usize) -> i64 {
    self.step + self.growth * n as i64
  }

  pub fn shown_terms(&self) -> Vec<i64> {
    (0..self.terms).map(|n| self.term(n)).collect()
  }

  pub fn last_shown(&self) -> i64 {
    self.term(self.terms.saturating_sub(1))
  }

  pub fn next_term(&self) -> i64 {
    self.term(self.terms)
  }

  pub(crate) fn explanation_key(&self) -> &'static str {
    match self.progression() {
      Progression::Arithmetic => "numeric_arithmetic",
      Progression::Quadratic => "numeric_quadratic",
    }
  }

  pub(crate) fn explanation_vars(&self) -> Vec<(&'static str, String)> {
    let last = self.last_shown();
    let shown_diffs = self.terms.saturating_sub(1);
    let next_diff = self.diff_after(shown_diffs);
    let diffs: Vec<String> = (0..shown_diffs).map(|n| self.diff_after(n).to_string()).collect();
    vec![
      ("trend", trend(self.step).into()),
      ("step", self.step.abs().to_string()),
      ("growth_trend", trend(self.growth).into()),
      ("growth", self.growth.abs().to_string()),
      ("diffs", diffs.join(", ")),
      ("next_diff", next_diff.abs().to_string()),
      ("op", if next_diff < 0 { "-" } else { "+" }.into()),
      ("last", last.to_string()),
      ("answer", self.next_term().to_string()),
    ]
  }
}

fn trend(delta: i64) -> &'static str {
  if delta < 0 { "decreases" } else { "increases" }
}

/// Random draw scaled by difficulty.
pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Result<PatternSample, PatternError> {
  let params = match difficulty.level() {
    1 => NumericParams::arithmetic(rng.gen_range(1..=20), rng.gen_range(1..=5), 4),
    2 => NumericParams::arithmetic(rng.gen_range(1..=30), rng.gen_range(2..=9), 4),
    3 => NumericParams::arithmetic(rng.gen_range(20..=60), rng.gen_range(-9..=12), 5),
    level => {
      let growth = if level >= 5 { rng.gen_range(-3..=3) } else { rng.gen_range(1..=3) };
      if growth == 0 {
        return Err(PatternError::degenerate(Domain::NumericSequence, "quadratic draw with zero growth"));
      }
      NumericParams::quadratic(rng.gen_range(1..=20), rng.gen_range(1..=6), growth, 5)
    }
  };
  build(params, difficulty)
}

/// Validate explicit parameters and render the sample.
pub fn build(params: NumericParams, difficulty: Difficulty) -> Result<PatternSample, PatternError> {
  if params.terms < MIN_TERMS {
    return Err(PatternError::degenerate(
      Domain::NumericSequence,
      format!("{} terms shown, at least {MIN_TERMS} needed", params.terms),
    ));
  }
  if params.step == 0 && params.growth == 0 {
    return Err(PatternError::degenerate(Domain::NumericSequence, "constant sequence"));
  }
  let shown = params.shown_terms();
  let next = params.next_term();
  if difficulty.level() <= 2 && (next < 0 || shown.iter().any(|t| *t < 0)) {
    return Err(PatternError::degenerate(Domain::NumericSequence, "negative terms at low difficulty"));
  }

  let terms: Vec<String> = shown.iter().map(i64::to_string).collect();
  let rendered_prompt = format!("{NEXT_PROMPT}\n{}, {BLANK}", terms.join(", "));
  Ok(PatternSample {
    difficulty,
    pattern: Pattern::NumericSequence(params),
    rendered_prompt,
    correct_value: AnswerValue::Number(next),
  })
}

// ---------------------------------------------------------------------------
// Inverse
// ---------------------------------------------------------------------------

static RE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+").unwrap());

/// Integers shown before the blank, in order.
pub fn parse_prompt(prompt: &str) -> Result<Vec<i64>, String> {
  let head = before_blank(prompt);
  let numbers = RE_NUMBER
    .find_iter(head)
    .map(|m| m.as_str().parse::<i64>().map_err(|e| format!("unreadable term '{}': {e}", m.as_str())))
    .collect::<Result<Vec<_>, _>>()?;
  if numbers.len() < 3 {
    return Err(format!("only {} numbers found in prompt, need at least 3", numbers.len()));
  }
  Ok(numbers)
}

fn differences(values: &[i64]) -> Vec<i64> {
  values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn constant(values: &[i64]) -> Option<i64> {
  let first = *values.first()?;
  values.iter().all(|v| *v == first).then_some(first)
}

/// Constant difference, then constant second difference, then constant ratio.
pub fn infer_next(terms: &[i64]) -> Recovery {
  let Some(&last) = terms.last() else {
    return Recovery::Ambiguous("no terms".into());
  };
  let diffs = differences(terms);
  if let Some(step) = constant(&diffs) {
    return Recovery::Derived {
      value: AnswerValue::Number(last + step),
      rule: format!("constant difference {step:+}"),
    };
  }

  let second = differences(&diffs);
  if second.len() >= 2 {
    if let (Some(growth), Some(&last_diff)) = (constant(&second), diffs.last()) {
      let next_diff = last_diff + growth;
      return Recovery::Derived {
        value: AnswerValue::Number(last + next_diff),
        rule: format!("differences change by {growth:+}; next difference {next_diff:+}"),
      };
    }
  }

  if let Some(next) = geometric_next(terms) {
    return Recovery::Derived { value: AnswerValue::Number(next), rule: "constant ratio".into() };
  }

  Recovery::Ambiguous(format!(
    "differences {diffs:?} are neither constant nor changing by a constant amount"
  ))
}

/// Exact integer ratio only; a fractional ratio is left for a human.
fn geometric_next(terms: &[i64]) -> Option<i64> {
  if terms.len() < 3 || terms.iter().any(|t| *t == 0) {
    return None;
  }
  let ratio = terms[1].checked_div(terms[0])?;
  if ratio == 0 || ratio == 1 {
    return None;
  }
  let holds = terms.windows(2).all(|w| w[0].checked_mul(ratio) == Some(w[1]));
  if holds { terms.last()?.checked_mul(ratio) } else { None }
}

pub struct NumericInverse;

impl PatternInverse for NumericInverse {
  fn domain(&self) -> Domain {
    Domain::NumericSequence
  }

  fn recover(&self, prompt: &str) -> Recovery {
    match parse_prompt(prompt) {
      Ok(terms) => infer_next(&terms),
      Err(why) => Recovery::Ambiguous(why),
    }
  }
}
