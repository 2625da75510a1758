//! Pipeline controller: drives each requested item through generate, verify and
//! persist, retrying recoverable failures within a bounded budget.
//!
//! Item states:
//!   Generating -> Verifying -> Accepted
//!        ^            |
//!        +- Retrying -+-> Discarded (attempt budget exhausted)
//!
//! Items are independent: a batch runs them on a rayon pool, each with its own
//! `ChaCha20Rng` stream derived from the batch seed, so a seeded batch reproduces
//! exactly regardless of scheduling.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::assembler::Assembler;
use crate::config::{GeneratorConfig, PipelineConfig};
use crate::domain::{AcceptedQuestion, Difficulty, Domain, Outcome};
use crate::error::{GenerateError, StoreError, StoreErrorKind};
use crate::store::{PersistOutcome, QuestionStore};
use crate::util::trunc_for_log;
use crate::verifier::verify;

/// Visual prompts are whole JSON documents.
const PROMPT_LOG_LIMIT: usize = 160;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
  Generating,
  Verifying,
  Accepted,
  Retrying,
  Discarded,
}

/// Why an item failed after it was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
  /// The store refused the question; `retries` transient retries were spent first.
  Storage { error: StoreErrorKind, retries: u32 },
}

/// A per-item failure that did not stop the batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
  pub index: usize,
  pub id: String,
  pub kind: FailureKind,
  pub detail: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
  pub confirmed: usize,
  pub flagged: usize,
  pub discarded: usize,
  pub failed: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchReport {
  pub domain: Domain,
  pub difficulty: Difficulty,
  pub seed: u64,
  pub accepted: Vec<AcceptedQuestion>,
  pub failures: Vec<ItemFailure>,
  pub summary: BatchSummary,
}

/// How one item ended.
#[derive(Debug)]
pub enum ItemResult {
  Accepted(AcceptedQuestion),
  Discarded { attempts: u32, last_reason: String },
  Failed(ItemFailure),
}

pub struct Pipeline {
  assembler: Assembler,
  store: Arc<dyn QuestionStore>,
  settings: PipelineConfig,
}

impl Pipeline {
  pub fn new(cfg: &GeneratorConfig, store: Arc<dyn QuestionStore>) -> Self {
    Pipeline { assembler: Assembler::from_config(cfg), store, settings: cfg.pipeline.clone() }
  }

  pub fn store(&self) -> &Arc<dyn QuestionStore> {
    &self.store
  }

  pub fn settings(&self) -> &PipelineConfig {
    &self.settings
  }

  /// Batch entry point. Seed comes from the config, else OS entropy.
  pub fn generate_batch(&self, domain: &str, count: usize, difficulty: u8) -> Result<BatchReport, GenerateError> {
    self.generate_batch_seeded(domain, count, difficulty, None)
  }

  /// Like `generate_batch`, with an explicit seed taking priority over the config.
  #[instrument(level = "info", skip(self))]
  pub fn generate_batch_seeded(
    &self,
    domain: &str,
    count: usize,
    difficulty: u8,
    seed: Option<u64>,
  ) -> Result<BatchReport, GenerateError> {
    let domain: Domain = domain.parse()?;
    let difficulty = Difficulty::new(difficulty)?;
    let seed = seed.or(self.settings.seed).unwrap_or_else(rand::random);

    let mut builder = rayon::ThreadPoolBuilder::new();
    if self.settings.workers > 0 {
      builder = builder.num_threads(self.settings.workers);
    }
    let pool = builder.build().map_err(|e| GenerateError::WorkerPool(e.to_string()))?;

    info!(target: "pipeline", %domain, level = difficulty.level(), count, seed, workers = pool.current_num_threads(), "Batch started");
    let results: Vec<ItemResult> = pool.install(|| {
      (0..count)
        .into_par_iter()
        .map(|index| {
          let mut rng = ChaCha20Rng::seed_from_u64(seed);
          rng.set_stream(index as u64);
          self.run_item(index, domain, difficulty, &mut rng)
        })
        .collect()
    });

    let mut report = BatchReport {
      domain,
      difficulty,
      seed,
      accepted: Vec::new(),
      failures: Vec::new(),
      summary: BatchSummary::default(),
    };
    for result in results {
      match result {
        ItemResult::Accepted(q) => {
          if q.needs_review {
            report.summary.flagged += 1;
          } else {
            report.summary.confirmed += 1;
          }
          report.accepted.push(q);
        }
        ItemResult::Discarded { .. } => report.summary.discarded += 1,
        ItemResult::Failed(f) => {
          report.summary.failed += 1;
          report.failures.push(f);
        }
      }
    }
    info!(
      target: "pipeline",
      %domain,
      confirmed = report.summary.confirmed,
      flagged = report.summary.flagged,
      discarded = report.summary.discarded,
      failed = report.summary.failed,
      "Batch finished"
    );
    Ok(report)
  }

  /// One item through the state machine, bounded by `max_attempts`.
  pub fn run_item(&self, index: usize, domain: Domain, difficulty: Difficulty, rng: &mut ChaCha20Rng) -> ItemResult {
    let max_attempts = self.settings.max_attempts.max(1);
    let mut last_reason = String::from("no attempt made");

    for attempt in 1..=max_attempts {
      transition(index, attempt, GenerationState::Generating);
      let candidate = match self.assembler.draw(domain, difficulty, rng) {
        Ok(c) => c,
        Err(e) => {
          debug!(target: "pipeline", index, attempt, reason = %e.reason, detail = %e.detail, "Assembly failed");
          last_reason = e.to_string();
          transition(index, attempt, GenerationState::Retrying);
          continue;
        }
      };

      transition(index, attempt, GenerationState::Verifying);
      let verdict = verify(&candidate);
      if verdict.outcome == Outcome::Contradicted {
        // A contradiction means a generator bug; it must stay visible.
        warn!(
          target: "pipeline",
          index,
          attempt,
          id = %candidate.id,
          prompt = %trunc_for_log(&candidate.rendered_prompt, PROMPT_LOG_LIMIT),
          notes = ?verdict.notes,
          "Verifier contradicted candidate; regenerating"
        );
        last_reason = format!("contradicted: {}", verdict.notes.join("; "));
        transition(index, attempt, GenerationState::Retrying);
        continue;
      }

      let accepted = AcceptedQuestion::from_verdict(candidate, verdict, attempt);
      return match self.persist_with_retry(&accepted) {
        Ok(outcome) => {
          transition(index, attempt, GenerationState::Accepted);
          debug!(target: "pipeline", index, id = %accepted.id(), ?outcome, needs_review = accepted.needs_review, "Item accepted");
          ItemResult::Accepted(accepted)
        }
        Err((source, retries)) => {
          let kind = FailureKind::Storage { error: source.kind(), retries };
          let detail = storage_error(&accepted, source).to_string();
          warn!(target: "pipeline", index, id = %accepted.id(), ?kind, %detail, "Storage failed for item");
          ItemResult::Failed(ItemFailure { index, id: accepted.id().to_string(), kind, detail })
        }
      };
    }

    transition(index, max_attempts, GenerationState::Discarded);
    warn!(target: "pipeline", index, %domain, attempts = max_attempts, %last_reason, "Item discarded after exhausting attempts");
    ItemResult::Discarded { attempts: max_attempts, last_reason }
  }

  /// Transient errors are retried with the same question, so the same id. The
  /// error that ends the loop comes back with the number of retries spent.
  fn persist_with_retry(&self, question: &AcceptedQuestion) -> Result<PersistOutcome, (StoreError, u32)> {
    let mut tries = 0;
    loop {
      match self.store.persist(question) {
        Ok(outcome) => return Ok(outcome),
        Err(e) if e.is_transient() && tries < self.settings.store_retries => {
          tries += 1;
          warn!(target: "store", id = %question.id(), attempt = tries, error = %e, "Transient storage failure; retrying");
        }
        Err(source) => return Err((source, tries)),
      }
    }
  }
}

fn storage_error(question: &AcceptedQuestion, source: StoreError) -> GenerateError {
  GenerateError::Storage { id: question.id().to_string(), source }
}

fn transition(index: usize, attempt: u32, state: GenerationState) {
  debug!(target: "pipeline", index, attempt, ?state, "State transition");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;

  fn pipeline() -> Pipeline {
    Pipeline::new(&GeneratorConfig::default(), Arc::new(MemoryStore::new()))
  }

  #[test]
  fn unknown_domain_is_fatal() {
    let err = pipeline().generate_batch("geometry", 3, 2).unwrap_err();
    assert!(matches!(err, GenerateError::UnknownDomain(ref tag) if tag == "geometry"));
  }

  #[test]
  fn invalid_difficulty_is_fatal() {
    assert!(matches!(pipeline().generate_batch("numeric_sequence", 1, 9), Err(GenerateError::InvalidDifficulty(9))));
  }

  #[test]
  fn batch_accounts_for_every_item() {
    let p = pipeline();
    let report = p.generate_batch_seeded("letter_sequence", 12, 3, Some(5)).unwrap();
    let s = report.summary;
    assert_eq!(s.confirmed + s.flagged + s.discarded + s.failed, 12);
    assert_eq!(report.accepted.len(), s.confirmed + s.flagged);
    assert_eq!(p.store().len(), report.accepted.len());
  }

  #[test]
  fn zero_count_is_an_empty_report() {
    let report = pipeline().generate_batch_seeded("cipher", 0, 1, Some(1)).unwrap();
    assert_eq!(report.summary, BatchSummary::default());
    assert!(report.accepted.is_empty());
  }
}
