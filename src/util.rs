//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, String)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings (visual prompts are JSON documents).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// "1 place" / "3 places".
pub fn plural(n: i64, word: &str) -> String {
  if n.abs() == 1 { format!("{n} {word}") } else { format!("{n} {word}s") }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_every_occurrence() {
    let out = fill_template("{a} + {b} = {a}{b}", &[("a", "1".into()), ("b", "2".into())]);
    assert_eq!(out, "1 + 2 = 12");
  }

  #[test]
  fn unknown_keys_stay_verbatim() {
    assert_eq!(fill_template("{missing}", &[]), "{missing}");
  }

  #[test]
  fn truncates_on_char_boundary() {
    let s = "ééééé";
    let t = trunc_for_log(s, 3);
    assert!(t.starts_with('é'));
    assert!(t.ends_with("(10 bytes total)"));
    assert_eq!(trunc_for_log("short", 10), "short");
  }

  #[test]
  fn pluralises() {
    assert_eq!(plural(1, "place"), "1 place");
    assert_eq!(plural(-1, "place"), "-1 place");
    assert_eq!(plural(3, "place"), "3 places");
  }
}
