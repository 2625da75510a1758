//! Public protocol structs for the HTTP endpoints (serde ready).
//! Question DTOs never carry the correct index; that lives behind the answer route.

use serde::{Deserialize, Serialize};

use crate::domain::{AcceptedQuestion, AnswerValue, Confidence, Difficulty, Domain, Outcome};
use crate::patterns::visual;
use crate::pipeline::{BatchReport, BatchSummary, ItemFailure};
use crate::svg;

const OPTION_LABELS: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub stored: usize,
}

#[derive(Debug, Deserialize)]
pub struct BatchIn {
    pub domain: String,
    pub count: usize,
    #[serde(default = "default_difficulty")]
    pub difficulty: u8,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_difficulty() -> u8 {
    Difficulty::default().level()
}

#[derive(Debug, Deserialize)]
pub struct FlagIn {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct OptionOut {
    pub label: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
}

/// Student-facing question. Visual prompts are split into instruction + drawn frames.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub domain: Domain,
    pub difficulty: Difficulty,
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<String>,
    pub options: Vec<OptionOut>,
    pub needs_review: bool,
    pub confidence: Confidence,
}

#[derive(Debug, Serialize)]
pub struct BatchOut {
    pub seed: u64,
    pub summary: BatchSummary,
    pub questions: Vec<QuestionOut>,
    pub failures: Vec<ItemFailure>,
}

/// Privileged answer view: correct option plus explanation and verifier notes.
#[derive(Debug, Serialize)]
pub struct AnswerOut {
    pub id: String,
    pub correct_index: usize,
    pub correct_label: String,
    pub correct_text: String,
    pub explanation: String,
    pub outcome: Outcome,
    pub confidence: Confidence,
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

fn label(i: usize) -> String {
    OPTION_LABELS.get(i).map(|c| c.to_string()).unwrap_or_else(|| (i + 1).to_string())
}

fn option_out(i: usize, value: &AnswerValue) -> OptionOut {
    let svg = match value {
        AnswerValue::Shape(shape) => Some(svg::render(shape)),
        _ => None,
    };
    OptionOut { label: label(i), text: value.to_string(), svg }
}

/// Convert a stored question to the public DTO.
pub fn to_out(q: &AcceptedQuestion) -> QuestionOut {
    let c = &q.candidate;
    let (prompt, frames) = match c.domain {
        Domain::VisualPattern => match serde_json::from_str::<visual::VisualPrompt>(&c.rendered_prompt) {
            Ok(parsed) => (parsed.instruction, parsed.frames.iter().map(svg::render).collect()),
            Err(_) => (c.rendered_prompt.clone(), Vec::new()),
        },
        _ => (c.rendered_prompt.clone(), Vec::new()),
    };
    QuestionOut {
        id: c.id.clone(),
        domain: c.domain,
        difficulty: c.difficulty,
        prompt,
        frames,
        options: c.options.iter().enumerate().map(|(i, o)| option_out(i, &o.value)).collect(),
        needs_review: q.needs_review,
        confidence: q.confidence,
    }
}

pub fn batch_out(report: &BatchReport) -> BatchOut {
    BatchOut {
        seed: report.seed,
        summary: report.summary,
        questions: report.accepted.iter().map(to_out).collect(),
        failures: report.failures.clone(),
    }
}

pub fn answer_out(q: &AcceptedQuestion) -> AnswerOut {
    let c = &q.candidate;
    AnswerOut {
        id: c.id.clone(),
        correct_index: c.correct_index,
        correct_label: label(c.correct_index),
        correct_text: c.claimed_answer().map(|v| v.to_string()).unwrap_or_default(),
        explanation: c.explanation.clone(),
        outcome: q.outcome,
        confidence: q.confidence,
        notes: q.notes.clone(),
    }
}
