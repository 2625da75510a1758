use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use qgen::assembler::Assembler;
use qgen::config::GeneratorConfig;
use qgen::domain::{all_distinct, AcceptedQuestion, AnswerValue, Confidence, Difficulty, Domain, Outcome};
use qgen::error::{StoreError, StoreErrorKind};
use qgen::patterns::{cipher, letters, numeric, CipherParams, LetterParams, NumericParams, Pattern};
use qgen::pipeline::{FailureKind, Pipeline};
use qgen::review::{export_csv, review_rows};
use qgen::store::{JsonlStore, MemoryStore, PersistOutcome, QuestionStore};
use qgen::verifier::verify;

fn d(level: u8) -> Difficulty {
  Difficulty::new(level).unwrap()
}

fn rng(seed: u64) -> ChaCha20Rng {
  ChaCha20Rng::seed_from_u64(seed)
}

#[test]
fn numeric_sequence_is_confirmed_and_persisted() {
  let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), d(2)).unwrap();
  let candidate = Assembler::default().assemble(sample, &mut rng(1)).unwrap();
  assert_eq!(candidate.rendered_prompt, "What comes next in the sequence?\n4, 7, 10, 13, ___");
  assert_eq!(candidate.claimed_answer(), Some(&AnswerValue::Number(16)));

  let verdict = verify(&candidate);
  assert_eq!(verdict.outcome, Outcome::Confirmed);
  assert_eq!(verdict.confidence, Confidence::High);

  let store = MemoryStore::new();
  let accepted = AcceptedQuestion::from_verdict(candidate, verdict, 1);
  assert!(!accepted.needs_review);
  assert_eq!(store.persist(&accepted).unwrap(), PersistOutcome::Stored);
  assert_eq!(store.len(), 1);
}

#[test]
fn seeded_numeric_batch_is_confirmed_end_to_end() {
  let run = || {
    Pipeline::new(&GeneratorConfig::default(), Arc::new(MemoryStore::new()))
      .generate_batch_seeded("numeric_sequence", 1, 2, Some(2024))
      .unwrap()
  };
  let report = run();
  assert_eq!(report.seed, 2024);
  assert_eq!(report.summary.confirmed, 1);
  let q = &report.accepted[0];
  assert_eq!(q.outcome, Outcome::Confirmed);
  assert_eq!(q.confidence, Confidence::High);
  assert!(!q.needs_review);

  let prompt = &q.candidate.rendered_prompt;
  let body = prompt.strip_prefix("What comes next in the sequence?\n").unwrap();
  let terms: Vec<i64> = body.strip_suffix(", ___").unwrap().split(", ").map(|t| t.parse().unwrap()).collect();
  assert_eq!(terms.len(), 4);
  let step = terms[1] - terms[0];
  assert!(terms.windows(2).all(|w| w[1] - w[0] == step), "{terms:?}");
  assert_eq!(q.candidate.claimed_answer(), Some(&AnswerValue::Number(terms[3] + step)));

  assert_eq!(run().accepted[0].candidate.rendered_prompt, *prompt);
}

#[test]
fn dual_axis_letter_sequence_is_confirmed() {
  let sample = letters::build(LetterParams::new("AA", [1, 2], 4).unwrap(), d(1)).unwrap();
  let candidate = Assembler::default().assemble(sample, &mut rng(2)).unwrap();
  assert_eq!(candidate.claimed_answer(), Some(&AnswerValue::Letters("EI".into())));
  assert!(verify(&candidate).is_confirmed());
}

#[test]
fn ambiguous_sequence_is_flagged_for_review() {
  let sample = numeric::build(NumericParams::arithmetic(1, 1, 4), d(1)).unwrap();
  let mut candidate = Assembler::default().assemble(sample, &mut rng(3)).unwrap();
  // Differences 1, 2, 3, 5: no constant step, no constant second step.
  candidate.rendered_prompt = "What comes next in the sequence?\n1, 2, 4, 7, 12, ___".into();

  let verdict = verify(&candidate);
  assert_eq!(verdict.outcome, Outcome::Indeterminate);
  assert!(!verdict.notes.is_empty());

  let store = MemoryStore::new();
  let accepted = AcceptedQuestion::from_verdict(candidate, verdict, 1);
  assert!(accepted.needs_review);
  store.persist(&accepted).unwrap();

  let rows = review_rows(&store.all());
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].id, accepted.id());
  assert!(rows[0].reviewer_signoff.is_empty());

  let mut buf = Vec::new();
  assert_eq!(export_csv(&store.flagged(), &mut buf).unwrap(), 1);
  let csv = String::from_utf8(buf).unwrap();
  assert!(csv.contains(accepted.id()));
  assert!(csv.contains("\"What comes next in the sequence?\n1, 2, 4, 7, 12, ___\""));
}

#[test]
fn corrupted_cipher_answer_is_contradicted_and_not_persisted() {
  let sample = cipher::build(CipherParams::new(2, "CAT", "DOG"), d(2)).unwrap();
  let mut candidate = Assembler::default().assemble(sample, &mut rng(4)).unwrap();
  assert_eq!(candidate.rendered_prompt, "If CAT is coded as ECV, what is the code for DOG?");
  // Simulate a generator that applied +3 to the target.
  candidate.options[candidate.correct_index].value = AnswerValue::Word("GRJ".into());

  let verdict = verify(&candidate);
  assert_eq!(verdict.outcome, Outcome::Contradicted);
  let notes = verdict.notes.join(" | ");
  assert!(notes.contains("expected FQI, claimed GRJ"), "{notes}");
  assert!(notes.contains("+2") && notes.contains("+3"), "{notes}");
}

#[test]
fn verdict_ignores_generation_artifacts() {
  let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), d(2)).unwrap();
  let candidate = Assembler::default().assemble(sample, &mut rng(5)).unwrap();
  let before = verify(&candidate);

  let mut tampered = candidate.clone();
  tampered.generation.parameters = Pattern::NumericSequence(NumericParams::arithmetic(100, 50, 4));
  tampered.generation.correct_value = AnswerValue::Number(-1);
  assert_eq!(verify(&tampered), before);
}

#[test]
fn option_sets_stay_distinct_across_many_candidates() {
  let assembler = Assembler::default();
  for domain in Domain::ALL {
    let mut rng = rng(domain as u64 + 100);
    let mut built = 0;
    let mut draws = 0;
    while built < 1000 && draws < 5000 {
      draws += 1;
      let level = (draws % 5) as u8 + 1;
      let Ok(candidate) = assembler.draw(domain, d(level), &mut rng) else { continue };
      built += 1;
      let values = candidate.option_values();
      assert!(all_distinct(&values), "{domain}: duplicate options in {values:?}");
      let correct = &candidate.generation.correct_value;
      assert_eq!(values.iter().filter(|v| v.matches(correct)).count(), 1, "{domain}: {values:?}");
      assert!(candidate.options[candidate.correct_index].value.matches(correct));
    }
    assert_eq!(built, 1000, "{domain} assembled only {built} candidates");
  }
}

/// Stores the record, then reports a transient failure the first time, as when an
/// acknowledgement is lost after a successful write.
struct LostAckStore {
  inner: MemoryStore,
  calls: AtomicUsize,
}

impl QuestionStore for LostAckStore {
  fn persist(&self, question: &AcceptedQuestion) -> Result<PersistOutcome, StoreError> {
    let outcome = self.inner.persist(question)?;
    if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
      return Err(StoreError::Transient("ack lost".into()));
    }
    Ok(outcome)
  }
  fn get(&self, id: &str) -> Option<AcceptedQuestion> {
    self.inner.get(id)
  }
  fn all(&self) -> Vec<AcceptedQuestion> {
    self.inner.all()
  }
  fn len(&self) -> usize {
    self.inner.len()
  }
}

#[test]
fn retried_persist_creates_exactly_one_record() {
  let store = Arc::new(LostAckStore { inner: MemoryStore::new(), calls: AtomicUsize::new(0) });
  let pipeline = Pipeline::new(&GeneratorConfig::default(), store.clone());
  let report = pipeline.generate_batch_seeded("numeric_sequence", 1, 2, Some(7)).unwrap();
  assert_eq!(report.accepted.len(), 1);
  assert!(report.failures.is_empty());
  assert_eq!(store.len(), 1);
  assert_eq!(store.calls.load(Ordering::SeqCst), 2);
}

struct BrokenStore;

impl QuestionStore for BrokenStore {
  fn persist(&self, _: &AcceptedQuestion) -> Result<PersistOutcome, StoreError> {
    Err(StoreError::Permanent("disk full".into()))
  }
  fn get(&self, _: &str) -> Option<AcceptedQuestion> {
    None
  }
  fn all(&self) -> Vec<AcceptedQuestion> {
    Vec::new()
  }
  fn len(&self) -> usize {
    0
  }
}

#[test]
fn permanent_storage_failures_are_reported_per_item() {
  let pipeline = Pipeline::new(&GeneratorConfig::default(), Arc::new(BrokenStore));
  let report = pipeline.generate_batch_seeded("cipher_code", 3, 2, Some(8)).unwrap();
  assert_eq!(report.summary.failed, 3);
  assert!(report.accepted.is_empty());
  for failure in &report.failures {
    assert_eq!(failure.kind, FailureKind::Storage { error: StoreErrorKind::Permanent, retries: 0 });
    assert!(failure.detail.contains("disk full"), "{}", failure.detail);
  }
}

struct FlakyStore;

impl QuestionStore for FlakyStore {
  fn persist(&self, _: &AcceptedQuestion) -> Result<PersistOutcome, StoreError> {
    Err(StoreError::Transient("timeout".into()))
  }
  fn get(&self, _: &str) -> Option<AcceptedQuestion> {
    None
  }
  fn all(&self) -> Vec<AcceptedQuestion> {
    Vec::new()
  }
  fn len(&self) -> usize {
    0
  }
}

#[test]
fn transient_failures_give_up_after_the_retry_budget() {
  let cfg = GeneratorConfig::default();
  let pipeline = Pipeline::new(&cfg, Arc::new(FlakyStore));
  let report = pipeline.generate_batch_seeded("letter_sequence", 2, 1, Some(9)).unwrap();
  assert_eq!(report.summary.failed, 2);
  let expected = FailureKind::Storage { error: StoreErrorKind::Transient, retries: cfg.pipeline.store_retries };
  assert!(report.failures.iter().all(|f| f.kind == expected), "{:?}", report.failures);
}

#[test]
fn seeded_batches_reproduce() {
  let cfg = GeneratorConfig::default();
  let a = Pipeline::new(&cfg, Arc::new(MemoryStore::new()))
    .generate_batch_seeded("visual_pattern", 6, 3, Some(42))
    .unwrap();
  let b = Pipeline::new(&cfg, Arc::new(MemoryStore::new()))
    .generate_batch_seeded("visual_pattern", 6, 3, Some(42))
    .unwrap();
  let ids = |r: &qgen::BatchReport| r.accepted.iter().map(|q| q.id().to_string()).collect::<Vec<_>>();
  assert_eq!(ids(&a), ids(&b));
  assert_eq!(a.summary, b.summary);
}

#[test]
fn jsonl_store_survives_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("questions.jsonl");
  let sample = letters::build(LetterParams::new("AA", [1, 2], 4).unwrap(), d(1)).unwrap();
  let candidate = Assembler::default().assemble(sample, &mut rng(9)).unwrap();
  let verdict = verify(&candidate);
  let accepted = AcceptedQuestion::from_verdict(candidate, verdict, 1);

  {
    let store = JsonlStore::open(&path).unwrap();
    assert_eq!(store.persist(&accepted).unwrap(), PersistOutcome::Stored);
  }
  let reopened = JsonlStore::open(&path).unwrap();
  assert_eq!(reopened.len(), 1);
  assert_eq!(reopened.persist(&accepted).unwrap(), PersistOutcome::Duplicate);
  assert_eq!(reopened.get(accepted.id()).unwrap(), accepted);
  let lines = std::fs::read_to_string(&path).unwrap();
  assert_eq!(lines.lines().count(), 1);
}
