//! Independent verification of assembled candidates.
//!
//! The verifier reads `rendered_prompt` and the option list only. It never touches
//! `generation`, so a bug in a forward generator shows up here as a contradiction
//! instead of being confirmed by the same faulty code.

use tracing::{debug, instrument, warn};

use crate::domain::{all_distinct, AnswerValue, Confidence, Domain, QuestionCandidate, Verdict};
use crate::patterns::{inverse_for, PatternInverse, Recovery};

/// Option-set defects that make a candidate wrong regardless of its prompt.
pub fn structural_defects(candidate: &QuestionCandidate) -> Vec<String> {
  let mut notes = vec![];
  let options = &candidate.options;
  if options.len() < 2 {
    notes.push(format!("only {} option(s); a multiple-choice question needs at least 2", options.len()));
  }
  if candidate.correct_index >= options.len() {
    notes.push(format!("correct_index {} is outside {} options", candidate.correct_index, options.len()));
  }
  let flagged: Vec<usize> = options.iter().enumerate().filter(|(_, o)| o.is_correct).map(|(i, _)| i).collect();
  match flagged.as_slice() {
    [only] if *only == candidate.correct_index => {}
    [only] => notes.push(format!("option {only} is flagged correct but correct_index is {}", candidate.correct_index)),
    [] => notes.push("no option is flagged correct".into()),
    many => notes.push(format!("{} options flagged correct ({many:?})", many.len())),
  }
  if !all_distinct(&candidate.option_values()) {
    notes.push("option set contains duplicate values".into());
  }
  let wrong_kind: Vec<usize> = options
    .iter()
    .enumerate()
    .filter(|(_, o)| !kind_fits(candidate.domain, &o.value))
    .map(|(i, _)| i)
    .collect();
  if !wrong_kind.is_empty() {
    notes.push(format!("options {wrong_kind:?} do not belong to the {} domain", candidate.domain));
  }
  notes
}

fn kind_fits(domain: Domain, value: &AnswerValue) -> bool {
  matches!(
    (domain, value),
    (Domain::NumericSequence, AnswerValue::Number(_))
      | (Domain::LetterSequence, AnswerValue::Letters(_))
      | (Domain::CipherCode, AnswerValue::Word(_))
      | (Domain::VisualPattern, AnswerValue::Shape(_))
  )
}

/// Re-derive the expected answer from the prompt and compare it with the claim.
///
/// Structural defects always contradict, but the inverse still runs so the notes
/// also say what the prompt implies.
#[instrument(level = "debug", skip_all, fields(id = %candidate.id, domain = %candidate.domain))]
pub fn verify(candidate: &QuestionCandidate) -> Verdict {
  let defects = structural_defects(candidate);
  let Some(claimed) = candidate.claimed_answer() else {
    let mut notes = defects;
    notes.push("no claimed answer".into());
    warn!(target: "verifier", id = %candidate.id, ?notes, "Structural defects in candidate");
    return Verdict::contradicted(notes);
  };

  let inverse = inverse_for(candidate.domain);
  let recovery = inverse.recover(&candidate.rendered_prompt);
  if !defects.is_empty() {
    let mut notes = defects;
    if let Recovery::Derived { value, rule } = &recovery {
      if !value.matches(claimed) {
        notes.extend(mismatch_notes(candidate, inverse, value, rule, claimed));
      }
    }
    warn!(target: "verifier", id = %candidate.id, ?notes, "Structural defects in candidate");
    return Verdict::contradicted(notes);
  }

  match recovery {
    Recovery::Ambiguous(why) => {
      debug!(target: "verifier", id = %candidate.id, %why, "No unique rule recovered");
      Verdict::indeterminate(format!("no unique rule could be inferred from the prompt: {why}"))
    }
    Recovery::Derived { value, rule } if value.matches(claimed) => {
      let cap = inverse.confidence_cap();
      let mut verdict = Verdict::confirmed(Confidence::High.capped_at(cap));
      verdict.notes.push(format!("re-derived {value} via {rule}"));
      if cap < Confidence::High {
        verdict.notes.push(format!("{} confirmations are capped at {:?} confidence", candidate.domain, cap).to_lowercase());
      }
      debug!(target: "verifier", id = %candidate.id, %rule, "Claimed answer confirmed");
      verdict
    }
    Recovery::Derived { value, rule } => {
      let notes = mismatch_notes(candidate, inverse, &value, &rule, claimed);
      warn!(target: "verifier", id = %candidate.id, ?notes, "Claimed answer contradicted");
      Verdict::contradicted(notes)
    }
  }
}

fn mismatch_notes(
  candidate: &QuestionCandidate,
  inverse: &dyn PatternInverse,
  expected: &AnswerValue,
  rule: &str,
  claimed: &AnswerValue,
) -> Vec<String> {
  let mut notes = vec![format!("expected {expected}, claimed {claimed} (rule: {rule})")];
  if let Some(i) = candidate.options.iter().position(|o| o.value.matches(expected)) {
    notes.push(format!("the expected value is option {i}"));
  } else {
    notes.push("the expected value is not among the options".into());
  }
  if let Some(extra) = inverse.explain_mismatch(&candidate.rendered_prompt, claimed) {
    notes.push(extra);
  }
  notes
}
