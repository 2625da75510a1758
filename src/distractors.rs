//! Distractor synthesis: plausible wrong answers built from the sample's own
//! parameters (common slips such as a wrong step or a swapped letter), deduplicated
//! under domain equality and never equal to the correct value.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

use crate::alphabet::{index_of, letter_at};
use crate::domain::AnswerValue;
use crate::error::DistractorError;
use crate::patterns::cipher::encode;
use crate::patterns::visual::{AnalogyChange, Fill, ShapeDescriptor, ShapeKind, VisualRule, MAX_SIZE, MIN_SIZE};
use crate::patterns::{AnalogyParams, CipherParams, LetterParams, NumericParams, Pattern, PatternSample, VisualParams};

/// Candidate pool that silently drops values matching the correct answer or an
/// earlier candidate.
struct Pool<'a> {
  correct: &'a AnswerValue,
  items: Vec<AnswerValue>,
}

impl<'a> Pool<'a> {
  fn new(correct: &'a AnswerValue) -> Self {
    Pool { correct, items: vec![] }
  }

  fn offer(&mut self, value: AnswerValue) {
    if value.matches(self.correct) || self.items.iter().any(|v| v.matches(&value)) {
      return;
    }
    self.items.push(value);
  }
}

/// Exactly `count` distinct wrong values for `sample`, or `Insufficient`.
/// `widen` enlarges the perturbation ranges for a retry after a shortfall.
pub fn synthesize<R: Rng + ?Sized>(
  sample: &PatternSample,
  count: usize,
  widen: u32,
  rng: &mut R,
) -> Result<Vec<AnswerValue>, DistractorError> {
  let mut pool = Pool::new(&sample.correct_value);
  let low_level = sample.difficulty.level() <= 2;
  match &sample.pattern {
    Pattern::NumericSequence(p) => numeric_candidates(p, widen, low_level, &mut pool),
    Pattern::LetterSequence(p) => letter_candidates(p, widen, &mut pool),
    Pattern::CipherCode(p) => cipher_candidates(p, widen, &mut pool),
    Pattern::VisualPattern(p) => visual_candidates(p, widen, &mut pool),
    Pattern::VisualAnalogy(p) => analogy_candidates(p, widen, &mut pool),
  }

  let mut items = pool.items;
  trace!(target: "pipeline", domain = %sample.domain(), widen, pool = items.len(), "Distractor pool built");
  if items.len() < count {
    return Err(DistractorError::Insufficient { wanted: count, produced: items.len() });
  }
  items.shuffle(rng);
  items.truncate(count);
  Ok(items)
}

fn numeric_candidates(p: &NumericParams, widen: u32, low_level: bool, pool: &mut Pool<'_>) {
  let correct = p.next_term();
  let last = p.last_shown();
  let next_diff = p.diff_after(p.terms.saturating_sub(1));
  let last_diff = p.diff_after(p.terms.saturating_sub(2));

  let mut values = vec![
    correct + 1,
    correct - 1,
    correct + 2,
    correct - 2,
    last,
    correct + p.diff_after(p.terms),
    last - next_diff,
  ];
  if p.growth != 0 {
    values.push(last + last_diff);
    values.push(correct + p.growth);
  }
  let reach = 3 + 2 * widen as i64;
  for k in 3..=reach {
    values.push(correct + k);
    values.push(correct - k);
  }
  for v in values {
    if low_level && v < 0 {
      continue;
    }
    pool.offer(AnswerValue::Number(v));
  }
}

fn pair_from(first: i64, second: i64) -> String {
  [letter_at(first), letter_at(second)].iter().collect()
}

fn letter_candidates(p: &LetterParams, widen: u32, pool: &mut Pool<'_>) {
  let n = p.pairs as i64;
  let last = [p.start[0] + (n - 1) * p.steps[0], p.start[1] + (n - 1) * p.steps[1]];
  let next = [last[0] + p.steps[0], last[1] + p.steps[1]];

  // Wrong step on one axis or both.
  for delta in [-1, 1] {
    pool.offer(AnswerValue::Letters(pair_from(last[0] + p.steps[0] + delta, next[1])));
    pool.offer(AnswerValue::Letters(pair_from(next[0], last[1] + p.steps[1] + delta)));
    pool.offer(AnswerValue::Letters(pair_from(next[0] + delta, next[1] + delta)));
  }
  // Single-letter slips on the correct pair.
  let reach = 2 + widen as i64;
  for delta in (-reach..=reach).filter(|d| *d != 0) {
    pool.offer(AnswerValue::Letters(pair_from(next[0] + delta, next[1])));
    pool.offer(AnswerValue::Letters(pair_from(next[0], next[1] + delta)));
  }
  pool.offer(AnswerValue::Letters(pair_from(next[1], next[0])));
  pool.offer(AnswerValue::Letters(pair_from(last[0], last[1])));
}

fn perturb_letter(word: &str, at: usize, delta: i64) -> String {
  word
    .chars()
    .enumerate()
    .map(|(i, c)| match index_of(c) {
      Some(idx) if i == at => letter_at(idx + delta),
      _ => c,
    })
    .collect()
}

fn cipher_candidates(p: &CipherParams, widen: u32, pool: &mut Pool<'_>) {
  let answer = p.coded_target();
  let shift = p.shift;

  // The target under a wrong shift.
  let mut shifts = vec![-shift, shift + 1, shift - 1, shift + 2];
  let w = widen as i64;
  shifts.extend(-3 - w..=5 + w);
  for s in shifts {
    if (s - shift).rem_euclid(26) != 0 {
      pool.offer(AnswerValue::Word(encode(&p.target, s)));
    }
  }

  // Two neighbouring letters swapped.
  let chars: Vec<char> = answer.chars().collect();
  for i in 0..chars.len().saturating_sub(1) {
    let mut swapped = chars.clone();
    swapped.swap(i, i + 1);
    pool.offer(AnswerValue::Word(swapped.into_iter().collect()));
  }

  // One letter off.
  for at in 0..chars.len() {
    for delta in [-1, 1, 2] {
      pool.offer(AnswerValue::Word(perturb_letter(&answer, at, delta)));
    }
  }
}

fn visual_candidates(p: &VisualParams, widen: u32, pool: &mut Pool<'_>) {
  let Some(correct) = p.next_frame() else {
    return;
  };
  let mut offer = |s: ShapeDescriptor| pool.offer(AnswerValue::Shape(s));
  let with_rotation = |r: i64| ShapeDescriptor::new(correct.shape, correct.fill, correct.rotation as i64 + r, correct.size);
  let with_size = |d: i64| {
    let size = correct.size as i64 + d;
    (MIN_SIZE..=MAX_SIZE)
      .contains(&size)
      .then(|| ShapeDescriptor { size: size as u32, ..correct })
  };

  // The last frame again, and one step too far.
  if let Some(last) = p.frame(p.frames.saturating_sub(1)) {
    offer(last);
  }
  if let Some(beyond) = p.frame(p.frames + 1) {
    offer(beyond);
  }

  match p.rule {
    VisualRule::Rotation { step } => {
      offer(with_rotation(-2 * step));
      offer(with_rotation(step / 2));
    }
    VisualRule::Size { step } => {
      if let Some(s) = with_size(-2 * step) {
        offer(s);
      }
    }
    VisualRule::ShapeProgression { .. } => {}
  }

  for r in [45, 90, -45, 180] {
    offer(with_rotation(r));
  }
  let reach = 1 + widen as i64;
  for k in 1..=reach {
    for d in [4 * k, -4 * k] {
      if let Some(s) = with_size(d) {
        offer(s);
      }
    }
  }

  // A structurally different shape with the correct attributes.
  let alternative = match correct.shape.sides() {
    Some(n) => ShapeKind::regular_polygon(n as i64 + 1).or_else(|| ShapeKind::regular_polygon(n as i64 - 1)),
    None => Some(ShapeKind::Square),
  };
  if let Some(shape) = alternative {
    offer(ShapeDescriptor { shape, ..correct });
  }
  if correct.shape != ShapeKind::Circle {
    offer(ShapeDescriptor { shape: ShapeKind::Circle, rotation: 0, ..correct });
  }
  offer(ShapeDescriptor { fill: Fill::Grey, ..correct });
  if p.fill_step > 0 {
    offer(ShapeDescriptor { fill: p.base.fill, ..correct });
  }
}

fn analogy_candidates(p: &AnalogyParams, widen: u32, pool: &mut Pool<'_>) {
  let Some(correct) = p.answer() else {
    return;
  };
  let mut offer = |s: ShapeDescriptor| pool.offer(AnswerValue::Shape(s));

  // C left unchanged, and B itself (right change, wrong shape).
  offer(p.second);
  if let Some(b) = p.change.apply(p.first) {
    offer(b);
  }
  // Only part of the change applied.
  let partials = [
    AnalogyChange { recolour: None, ..p.change },
    AnalogyChange { turn: 0, ..p.change },
    AnalogyChange { resize: 0, ..p.change },
    AnalogyChange { turn: -p.change.turn, ..p.change },
    AnalogyChange { resize: -p.change.resize, ..p.change },
  ];
  for change in partials {
    if let Some(s) = change.apply(p.second) {
      offer(s);
    }
  }

  offer(ShapeDescriptor { shape: ShapeKind::Diamond, ..correct });
  if correct.shape != ShapeKind::Circle {
    offer(ShapeDescriptor { shape: ShapeKind::Circle, rotation: 0, ..correct });
  }
  offer(ShapeDescriptor { fill: Fill::Grey, ..correct });
  let reach = 1 + widen as i64;
  for k in 1..=reach {
    for d in [4 * k, -4 * k] {
      let size = correct.size as i64 + d;
      if (MIN_SIZE..=MAX_SIZE).contains(&size) {
        offer(ShapeDescriptor { size: size as u32, ..correct });
      }
    }
  }
  for r in [45, 90] {
    offer(ShapeDescriptor::new(correct.shape, correct.fill, correct.rotation as i64 + r, correct.size));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{all_distinct, Difficulty, Domain};
  use crate::patterns::{cipher, letters, numeric, sample};
  use rand::SeedableRng;
  use rand_chacha::ChaCha20Rng;

  fn d(level: u8) -> Difficulty {
    Difficulty::new(level).unwrap()
  }

  fn check(sample: &PatternSample, values: &[AnswerValue]) {
    assert!(values.iter().all(|v| !v.matches(&sample.correct_value)), "correct value leaked into {values:?}");
    let refs: Vec<&AnswerValue> = values.iter().collect();
    assert!(all_distinct(&refs), "duplicates in {values:?}");
  }

  #[test]
  fn numeric_distractors_avoid_the_answer() {
    let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), d(2)).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let out = synthesize(&sample, 4, 0, &mut rng).unwrap();
    assert_eq!(out.len(), 4);
    check(&sample, &out);
    assert!(out.iter().all(|v| matches!(v, AnswerValue::Number(n) if *n >= 0)));
  }

  #[test]
  fn cipher_distractors_include_wrong_shifts_only_when_distinct() {
    let sample = cipher::build(CipherParams::new(2, "CAT", "DOG"), d(2)).unwrap();
    let mut pool = Pool::new(&sample.correct_value);
    if let Pattern::CipherCode(p) = &sample.pattern {
      cipher_candidates(p, 0, &mut pool);
    }
    assert!(pool.items.contains(&AnswerValue::Word("GRJ".into())));
    assert!(pool.items.contains(&AnswerValue::Word("BME".into())));
    assert!(!pool.items.iter().any(|v| v.matches(&AnswerValue::Word("FQI".into()))));
  }

  #[test]
  fn letter_distractors_include_the_swap() {
    let sample = letters::build(LetterParams::new("AA", [1, 2], 4).unwrap(), d(1)).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let out = synthesize(&sample, 10, 0, &mut rng).unwrap();
    check(&sample, &out);
    assert!(out.contains(&AnswerValue::Letters("IE".into())));
  }

  #[test]
  fn square_rotations_collapse_under_symmetry() {
    let params = VisualParams {
      rule: VisualRule::Rotation { step: 45 },
      base: ShapeDescriptor::new(ShapeKind::Square, Fill::Blue, 0, 24),
      frames: 4,
      fill_step: 0,
    };
    let sample = crate::patterns::visual::build(params, d(2)).unwrap();
    let mut pool = Pool::new(&sample.correct_value);
    if let Pattern::VisualPattern(p) = &sample.pattern {
      visual_candidates(p, 0, &mut pool);
    }
    let refs: Vec<&AnswerValue> = pool.items.iter().collect();
    assert!(all_distinct(&refs));
    assert!(!pool.items.iter().any(|v| v.matches(&sample.correct_value)));
  }

  #[test]
  fn analogy_distractors_keep_c_and_b() {
    let params = AnalogyParams {
      first: ShapeDescriptor::new(ShapeKind::Circle, Fill::Blue, 0, 24),
      second: ShapeDescriptor::new(ShapeKind::Hexagon, Fill::Blue, 0, 24),
      change: AnalogyChange { recolour: Some(Fill::Amber), ..AnalogyChange::default() },
    };
    let sample = crate::patterns::visual::build_analogy(params, d(2)).unwrap();
    let out = synthesize(&sample, 4, 0, &mut ChaCha20Rng::seed_from_u64(8)).unwrap();
    check(&sample, &out);

    let mut pool = Pool::new(&sample.correct_value);
    if let Pattern::VisualAnalogy(p) = &sample.pattern {
      analogy_candidates(p, 0, &mut pool);
    }
    let hexagon = ShapeDescriptor::new(ShapeKind::Hexagon, Fill::Blue, 0, 24);
    let b = ShapeDescriptor::new(ShapeKind::Circle, Fill::Amber, 0, 24);
    let grey = ShapeDescriptor::new(ShapeKind::Hexagon, Fill::Grey, 0, 24);
    for expected in [hexagon, b, grey] {
      assert!(pool.items.contains(&AnswerValue::Shape(expected)), "{expected} missing");
    }
  }

  #[test]
  fn shortfall_is_reported() {
    let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), d(2)).unwrap();
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let err = synthesize(&sample, 500, 0, &mut rng).unwrap_err();
    assert!(matches!(err, DistractorError::Insufficient { wanted: 500, .. }));
  }

  #[test]
  fn selection_is_reproducible_for_a_seed() {
    let drawn = sample(Domain::CipherCode, d(3), &mut ChaCha20Rng::seed_from_u64(9)).unwrap();
    let a = synthesize(&drawn, 4, 0, &mut ChaCha20Rng::seed_from_u64(2)).unwrap();
    let b = synthesize(&drawn, 4, 0, &mut ChaCha20Rng::seed_from_u64(2)).unwrap();
    assert_eq!(a, b);
  }
}
