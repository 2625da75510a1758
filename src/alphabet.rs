//! Letter arithmetic on the 26-letter Latin alphabet, wrapping at the ends.

pub const LETTERS: i64 = 26;

/// Zero-based alphabet position of an ASCII letter, either case.
pub fn index_of(c: char) -> Option<i64> {
  if c.is_ascii_alphabetic() {
    Some((c.to_ascii_uppercase() as u8 - b'A') as i64)
  } else {
    None
  }
}

/// Uppercase letter at `position`, wrapping modulo 26 in both directions.
pub fn letter_at(position: i64) -> char {
  (b'A' + position.rem_euclid(LETTERS) as u8) as char
}

/// Shift one character, preserving case. Non-letters pass through unchanged.
pub fn shift_char(c: char, shift: i64) -> char {
  match index_of(c) {
    Some(i) => {
      let shifted = letter_at(i + shift);
      if c.is_ascii_lowercase() { shifted.to_ascii_lowercase() } else { shifted }
    }
    None => c,
  }
}

/// Forward distance from `from` to `to`, in `0..26`.
pub fn distance(from: char, to: char) -> Option<i64> {
  Some((index_of(to)? - index_of(from)?).rem_euclid(LETTERS))
}

/// Representative of a shift modulo 26 in `-12..=13`.
pub fn signed_shift(shift: i64) -> i64 {
  let s = shift.rem_euclid(LETTERS);
  if s > 13 { s - LETTERS } else { s }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wraps_both_ways() {
    assert_eq!(letter_at(26), 'A');
    assert_eq!(letter_at(-1), 'Z');
    assert_eq!(shift_char('Y', 3), 'B');
    assert_eq!(shift_char('b', -2), 'z');
    assert_eq!(shift_char('-', 5), '-');
  }

  #[test]
  fn distance_and_sign() {
    assert_eq!(distance('C', 'E'), Some(2));
    assert_eq!(distance('E', 'C'), Some(24));
    assert_eq!(signed_shift(24), -2);
    assert_eq!(signed_shift(-25), 1);
    assert_eq!(distance('1', 'C'), None);
  }
}
