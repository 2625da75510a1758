//! Storage collaborator for accepted questions.
//!
//! `persist` is idempotent on the candidate id: the pipeline may retry a transient
//! failure with the same question, and a second call must never create a second
//! record.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::AcceptedQuestion;
use crate::error::StoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOutcome {
  Stored,
  Duplicate,
}

pub trait QuestionStore: Send + Sync {
  fn persist(&self, question: &AcceptedQuestion) -> Result<PersistOutcome, StoreError>;

  fn get(&self, id: &str) -> Option<AcceptedQuestion>;

  /// Every stored question, in insertion order.
  fn all(&self) -> Vec<AcceptedQuestion>;

  fn flagged(&self) -> Vec<AcceptedQuestion> {
    self.all().into_iter().filter(|q| q.needs_review).collect()
  }

  fn len(&self) -> usize;

  /// Mark a stored question for human review. `Ok(None)` when the id is unknown.
  fn flag(&self, id: &str, note: &str) -> Result<Option<AcceptedQuestion>, StoreError> {
    let _ = (id, note);
    Err(StoreError::Permanent("this store cannot flag questions".into()))
  }

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Concurrent in-memory store keyed by candidate id.
#[derive(Debug, Default)]
pub struct MemoryStore {
  items: DashMap<String, (u64, AcceptedQuestion)>,
  seq: AtomicU64,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.items.contains_key(id)
  }

  /// Insert, or replace an existing record in place (keeping its position).
  fn upsert(&self, question: AcceptedQuestion) {
    match self.items.entry(question.id().to_string()) {
      Entry::Occupied(mut slot) => slot.get_mut().1 = question,
      Entry::Vacant(slot) => {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        slot.insert((seq, question));
      }
    }
  }
}

impl QuestionStore for MemoryStore {
  fn persist(&self, question: &AcceptedQuestion) -> Result<PersistOutcome, StoreError> {
    match self.items.entry(question.id().to_string()) {
      Entry::Occupied(_) => Ok(PersistOutcome::Duplicate),
      Entry::Vacant(slot) => {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        slot.insert((seq, question.clone()));
        Ok(PersistOutcome::Stored)
      }
    }
  }

  fn get(&self, id: &str) -> Option<AcceptedQuestion> {
    self.items.get(id).map(|entry| entry.value().1.clone())
  }

  fn all(&self) -> Vec<AcceptedQuestion> {
    let mut rows: Vec<(u64, AcceptedQuestion)> = self.items.iter().map(|e| e.value().clone()).collect();
    rows.sort_by_key(|(seq, _)| *seq);
    rows.into_iter().map(|(_, q)| q).collect()
  }

  fn len(&self) -> usize {
    self.items.len()
  }

  fn flag(&self, id: &str, note: &str) -> Result<Option<AcceptedQuestion>, StoreError> {
    Ok(self.items.get_mut(id).map(|mut entry| {
      entry.1.flag_for_review(note);
      entry.1.clone()
    }))
  }
}

/// Append-only JSON-lines file. Existing ids are indexed on open, so re-persisting
/// a question after a restart is still a no-op. A flag appends the updated record;
/// the last line for an id wins on open.
#[derive(Debug)]
pub struct JsonlStore {
  path: PathBuf,
  file: Mutex<File>,
  index: MemoryStore,
}

impl JsonlStore {
  #[instrument(level = "info", skip_all)]
  pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    let index = MemoryStore::new();
    if path.exists() {
      let reader = BufReader::new(File::open(&path)?);
      for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
          continue;
        }
        match serde_json::from_str::<AcceptedQuestion>(&line) {
          Ok(q) => index.upsert(q),
          Err(e) => warn!(target: "store", line = lineno + 1, error = %e, "Skipping unreadable record"),
        }
      }
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!(target: "store", path = %path.display(), records = index.len(), "Opened question store");
    Ok(JsonlStore { path, file: Mutex::new(file), index })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn lock(&self) -> Result<MutexGuard<'_, File>, StoreError> {
    self.file.lock().map_err(|_| StoreError::Permanent("store file lock poisoned".into()))
  }
}

fn append(file: &mut File, question: &AcceptedQuestion) -> Result<(), StoreError> {
  let mut line = serde_json::to_string(question)?;
  line.push('\n');
  file.write_all(line.as_bytes())?;
  file.flush()?;
  Ok(())
}

impl QuestionStore for JsonlStore {
  fn persist(&self, question: &AcceptedQuestion) -> Result<PersistOutcome, StoreError> {
    let mut file = self.lock()?;
    if self.index.contains(question.id()) {
      debug!(target: "store", id = %question.id(), "Duplicate persist ignored");
      return Ok(PersistOutcome::Duplicate);
    }
    append(&mut file, question)?;
    self.index.persist(question)
  }

  fn flag(&self, id: &str, note: &str) -> Result<Option<AcceptedQuestion>, StoreError> {
    let mut file = self.lock()?;
    let Some(mut question) = self.index.get(id) else {
      return Ok(None);
    };
    question.flag_for_review(note);
    append(&mut file, &question)?;
    self.index.upsert(question.clone());
    info!(target: "store", id, "Question flagged for review");
    Ok(Some(question))
  }

  fn get(&self, id: &str) -> Option<AcceptedQuestion> {
    self.index.get(id)
  }

  fn all(&self) -> Vec<AcceptedQuestion> {
    self.index.all()
  }

  fn len(&self) -> usize {
    self.index.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assembler::Assembler;
  use crate::domain::{Difficulty, Verdict};
  use crate::patterns::{numeric, NumericParams};
  use rand::SeedableRng;
  use rand_chacha::ChaCha20Rng;

  fn question(seed: u64, flagged: bool) -> AcceptedQuestion {
    let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), Difficulty::new(2).unwrap()).unwrap();
    let candidate = Assembler::default().assemble(sample, &mut ChaCha20Rng::seed_from_u64(seed)).unwrap();
    let verdict = if flagged {
      Verdict::indeterminate("could not infer")
    } else {
      Verdict::confirmed(crate::domain::Confidence::High)
    };
    AcceptedQuestion::from_verdict(candidate, verdict, 1)
  }

  #[test]
  fn memory_persist_is_idempotent() {
    let store = MemoryStore::new();
    let q = question(1, false);
    assert_eq!(store.persist(&q).unwrap(), PersistOutcome::Stored);
    assert_eq!(store.persist(&q).unwrap(), PersistOutcome::Duplicate);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(q.id()).unwrap(), q);
  }

  #[test]
  fn manual_flag_reaches_the_review_export() {
    let store = MemoryStore::new();
    let q = question(4, false);
    store.persist(&q).unwrap();
    assert!(store.flagged().is_empty());

    let flagged = store.flag(q.id(), "diagram is hard to read").unwrap().unwrap();
    assert!(flagged.needs_review);
    assert_eq!(flagged.outcome, crate::domain::Outcome::Confirmed);
    assert!(store.flag("missing", "x").unwrap().is_none());

    let mut buf = Vec::new();
    assert_eq!(crate::review::export_csv(&store.all(), &mut buf).unwrap(), 1);
    let csv = String::from_utf8(buf).unwrap();
    assert!(csv.contains(q.id()), "{csv}");
    assert!(csv.contains("diagram is hard to read"), "{csv}");
  }

  #[test]
  fn jsonl_flag_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.jsonl");
    let q = question(5, false);
    {
      let store = JsonlStore::open(&path).unwrap();
      store.persist(&q).unwrap();
      store.flag(q.id(), "check wording").unwrap().unwrap();
    }
    let reopened = JsonlStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    let stored = reopened.get(q.id()).unwrap();
    assert!(stored.needs_review);
    assert!(stored.notes.iter().any(|n| n == "check wording"));
  }

  #[test]
  fn memory_keeps_insertion_order_and_flags() {
    let store = MemoryStore::new();
    let qs = [question(1, false), question(2, true), question(3, false)];
    for q in &qs {
      store.persist(q).unwrap();
    }
    let ids: Vec<String> = store.all().iter().map(|q| q.id().to_string()).collect();
    assert_eq!(ids, qs.iter().map(|q| q.id().to_string()).collect::<Vec<_>>());
    assert_eq!(store.flagged().len(), 1);
    assert_eq!(store.flagged()[0].id(), qs[1].id());
  }
}
