//! qgen · procedural question generation with independent verification.
//!
//! Questions are generated from parameterised patterns (numeric sequences, letter
//! pairs, letter-shift ciphers, visual shape sequences and analogies), padded with synthesized
//! distractors, and re-checked by an inverse that reads only the rendered prompt
//! before anything is persisted.

pub mod alphabet;
pub mod assembler;
pub mod config;
pub mod distractors;
pub mod domain;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod protocol;
pub mod review;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod store;
pub mod svg;
pub mod telemetry;
pub mod util;
pub mod verifier;

pub use domain::{AcceptedQuestion, Difficulty, Domain, QuestionCandidate, Verdict};
pub use error::GenerateError;
pub use pipeline::{BatchReport, Pipeline};
