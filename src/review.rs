//! Human-review export: flagged questions as CSV rows with an empty sign-off column
//! for a reviewer to fill in.

use std::borrow::Cow;
use std::io::{self, Write};

use serde::Serialize;

use crate::domain::AcceptedQuestion;

pub const HEADER: [&str; 8] = [
  "id",
  "domain",
  "difficulty",
  "prompt",
  "options",
  "claimed_correct",
  "verifier_notes",
  "reviewer_signoff",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReviewRow {
  pub id: String,
  pub domain: String,
  pub difficulty: u8,
  pub prompt: String,
  pub options: String,
  pub claimed_correct: String,
  pub verifier_notes: String,
  pub reviewer_signoff: String,
}

impl ReviewRow {
  fn fields(&self) -> [Cow<'_, str>; 8] {
    [
      Cow::Borrowed(self.id.as_str()),
      Cow::Borrowed(self.domain.as_str()),
      Cow::Owned(self.difficulty.to_string()),
      Cow::Borrowed(self.prompt.as_str()),
      Cow::Borrowed(self.options.as_str()),
      Cow::Borrowed(self.claimed_correct.as_str()),
      Cow::Borrowed(self.verifier_notes.as_str()),
      Cow::Borrowed(self.reviewer_signoff.as_str()),
    ]
  }
}

/// Rows for every question that still needs a human look.
pub fn review_rows(questions: &[AcceptedQuestion]) -> Vec<ReviewRow> {
  questions
    .iter()
    .filter(|q| q.needs_review)
    .map(|q| {
      let c = &q.candidate;
      let options: Vec<String> = c.options.iter().map(|o| o.value.to_string()).collect();
      ReviewRow {
        id: c.id.clone(),
        domain: c.domain.to_string(),
        difficulty: c.difficulty.level(),
        prompt: c.rendered_prompt.clone(),
        options: options.join(" | "),
        claimed_correct: c.claimed_answer().map(|v| v.to_string()).unwrap_or_default(),
        verifier_notes: q.notes.join("; "),
        reviewer_signoff: String::new(),
      }
    })
    .collect()
}

/// Quote a field when it holds a comma, quote or line break (RFC 4180).
fn csv_field(raw: &str) -> Cow<'_, str> {
  if raw.contains([',', '"', '\n', '\r']) {
    Cow::Owned(format!("\"{}\"", raw.replace('"', "\"\"")))
  } else {
    Cow::Borrowed(raw)
  }
}

fn write_record<W: Write>(out: &mut W, fields: &[Cow<'_, str>]) -> io::Result<()> {
  let line: Vec<Cow<'_, str>> = fields.iter().map(|f| csv_field(f)).collect();
  out.write_all(line.join(",").as_bytes())?;
  out.write_all(b"\r\n")
}

/// Write the review sheet; returns the number of data rows written.
pub fn export_csv<W: Write>(questions: &[AcceptedQuestion], mut out: W) -> io::Result<usize> {
  let header: Vec<Cow<'_, str>> = HEADER.iter().map(|h| Cow::Borrowed(*h)).collect();
  write_record(&mut out, &header)?;
  let rows = review_rows(questions);
  for row in &rows {
    write_record(&mut out, &row.fields())?;
  }
  out.flush()?;
  Ok(rows.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quoting_follows_rfc4180() {
    assert_eq!(csv_field("plain"), "plain");
    assert_eq!(csv_field("a, b"), "\"a, b\"");
    assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
  }

  #[test]
  fn empty_export_is_header_only() {
    let mut buf = Vec::new();
    let n = export_csv(&[], &mut buf).unwrap();
    assert_eq!(n, 0);
    assert_eq!(
      String::from_utf8(buf).unwrap(),
      "id,domain,difficulty,prompt,options,claimed_correct,verifier_notes,reviewer_signoff\r\n"
    );
  }
}
