//! Question assembly: one pattern sample plus synthesized distractors become a
//! complete multiple-choice candidate with an explanation.

use rand::Rng;
use tracing::debug;

use crate::config::{Explanations, GeneratorConfig, PipelineConfig};
use crate::distractors::synthesize;
use crate::domain::{AnswerOption, Difficulty, Domain, GenerationTrace, QuestionCandidate};
use crate::error::{AssemblyError, DistractorError};
use crate::patterns::{self, Pattern, PatternSample};
use crate::util::fill_template;

#[derive(Clone, Debug)]
pub struct Assembler {
  option_count: usize,
  max_widen: u32,
  explanations: Explanations,
}

impl Assembler {
  pub fn new(pipeline: &PipelineConfig, explanations: Explanations) -> Self {
    Assembler { option_count: pipeline.option_count, max_widen: pipeline.max_widen, explanations }
  }

  pub fn from_config(cfg: &GeneratorConfig) -> Self {
    Self::new(&cfg.pipeline, cfg.explanations.clone())
  }

  pub fn option_count(&self) -> usize {
    self.option_count
  }

  /// Draw a fresh sample and assemble it.
  pub fn draw<R: Rng + ?Sized>(
    &self,
    domain: Domain,
    difficulty: Difficulty,
    rng: &mut R,
  ) -> Result<QuestionCandidate, AssemblyError> {
    let sample = patterns::sample(domain, difficulty, rng)?;
    self.assemble(sample, rng)
  }

  /// Distractor ranges widen up to `max_widen` times before the sample is given up.
  pub fn assemble<R: Rng + ?Sized>(&self, sample: PatternSample, rng: &mut R) -> Result<QuestionCandidate, AssemblyError> {
    let wanted = self.option_count.saturating_sub(1);
    let mut shortfall = DistractorError::Insufficient { wanted, produced: 0 };
    let mut distractors = None;
    for widen in 0..=self.max_widen {
      match synthesize(&sample, wanted, widen, rng) {
        Ok(found) => {
          distractors = Some(found);
          break;
        }
        Err(e) => {
          debug!(target: "pipeline", domain = %sample.domain(), widen, error = %e, "Distractor shortfall; widening");
          shortfall = e;
        }
      }
    }
    let distractors = distractors.ok_or(shortfall)?;

    let correct_index = rng.gen_range(0..self.option_count);
    let mut options: Vec<AnswerOption> =
      distractors.into_iter().map(|value| AnswerOption { value, is_correct: false }).collect();
    options.insert(correct_index, AnswerOption { value: sample.correct_value.clone(), is_correct: true });

    let explanation = self.explain(&sample.pattern);
    // Ids come from the same rng so a seeded batch reproduces exactly.
    let id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();

    Ok(QuestionCandidate {
      id: id.to_string(),
      domain: sample.domain(),
      difficulty: sample.difficulty,
      rendered_prompt: sample.rendered_prompt,
      options,
      correct_index,
      explanation,
      generation: GenerationTrace { parameters: sample.pattern, correct_value: sample.correct_value },
    })
  }

  /// Explanation text from the generation parameters, never re-inferred.
  pub fn explain(&self, pattern: &Pattern) -> String {
    let key = pattern.explanation_key();
    let vars = pattern.explanation_vars();
    match self.explanations.template(key) {
      Some(tpl) => fill_template(tpl, &vars),
      None => {
        let answer = vars.iter().find(|(k, _)| *k == "answer").map(|(_, v)| v.as_str()).unwrap_or_default();
        format!("The answer is {answer}.")
      }
    }
  }
}

impl Default for Assembler {
  fn default() -> Self {
    Self::from_config(&GeneratorConfig::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::AnswerValue;
  use crate::patterns::{cipher, letters, numeric, CipherParams, LetterParams, NumericParams};
  use rand::SeedableRng;
  use rand_chacha::ChaCha20Rng;

  fn d(level: u8) -> Difficulty {
    Difficulty::new(level).unwrap()
  }

  #[test]
  fn scenario_numeric_sequence() {
    let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), d(2)).unwrap();
    let c = Assembler::default().assemble(sample, &mut ChaCha20Rng::seed_from_u64(1)).unwrap();
    assert_eq!(c.options.len(), 5);
    assert_eq!(c.claimed_answer(), Some(&AnswerValue::Number(16)));
    assert!(c.options[c.correct_index].is_correct);
    assert_eq!(c.options.iter().filter(|o| o.is_correct).count(), 1);
    assert!(c.explanation.contains("increases by 3"), "{}", c.explanation);
    assert!(c.explanation.contains("13 + 3 = 16"), "{}", c.explanation);
  }

  #[test]
  fn scenario_letter_sequence_explanation() {
    let sample = letters::build(LetterParams::new("AA", [1, 2], 4).unwrap(), d(1)).unwrap();
    let c = Assembler::default().assemble(sample, &mut ChaCha20Rng::seed_from_u64(2)).unwrap();
    assert_eq!(c.claimed_answer(), Some(&AnswerValue::Letters("EI".into())));
    assert_eq!(
      c.explanation,
      "The first letter moves forward 1 letter and the second letter moves forward 2 letters each time, so after DG comes EI."
    );
  }

  #[test]
  fn cipher_explanation_names_the_shift() {
    let sample = cipher::build(CipherParams::new(2, "CAT", "DOG"), d(2)).unwrap();
    let c = Assembler::default().assemble(sample, &mut ChaCha20Rng::seed_from_u64(3)).unwrap();
    assert!(c.explanation.starts_with("The shift is +2 letters"), "{}", c.explanation);
    assert!(c.explanation.ends_with("gives FQI."), "{}", c.explanation);
  }

  #[test]
  fn correct_index_covers_every_slot() {
    let assembler = Assembler::default();
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let mut seen = [false; 5];
    for _ in 0..200 {
      let sample = numeric::build(NumericParams::arithmetic(10, 4, 4), d(2)).unwrap();
      seen[assembler.assemble(sample, &mut rng).unwrap().correct_index] = true;
    }
    assert!(seen.iter().all(|s| *s));
  }

  #[test]
  fn shortfall_becomes_a_tagged_failure() {
    let cfg = PipelineConfig { option_count: 8, max_widen: 0, ..PipelineConfig::default() };
    let assembler = Assembler { option_count: 40, ..Assembler::new(&cfg, Explanations::default()) };
    let sample = numeric::build(NumericParams::arithmetic(4, 3, 4), d(2)).unwrap();
    let err = assembler.assemble(sample, &mut ChaCha20Rng::seed_from_u64(5)).unwrap_err();
    assert_eq!(err.reason, crate::error::FailureReason::InsufficientDistractors);
  }

  #[test]
  fn seeded_assembly_is_reproducible() {
    let a = Assembler::default().draw(Domain::LetterSequence, d(3), &mut ChaCha20Rng::seed_from_u64(6));
    let b = Assembler::default().draw(Domain::LetterSequence, d(3), &mut ChaCha20Rng::seed_from_u64(6));
    assert_eq!(a, b);
  }
}
