//! Built-in content tables: the word bank for cipher questions and the shape
//! palette for visual patterns. Guarantees generation works with no external data.

use crate::patterns::visual::{Fill, ShapeKind};

/// Common 4–6 letter words, grouped by length.
pub const CIPHER_WORDS: &[&str] = &[
  // 4 letters
  "WORD", "MATH", "BOOK", "FISH", "BIRD", "TREE", "HAND", "FACE", "DOOR", "LAKE",
  "FIRE", "WIND", "RAIN", "SNOW", "STAR", "MOON", "GOLD", "PINK", "BLUE", "GRAY",
  "KING", "JUMP", "WALK", "TALK", "PLAY", "READ", "SING", "DRAW", "SWIM", "RIDE",
  "CAMP", "HELP", "LIFT", "PUSH", "PULL", "KICK", "WAVE", "CLAP", "SPIN", "FLIP",
  "BEAR", "DUCK", "FROG", "GOAT", "LION", "WOLF", "DEER", "SEAL", "CRAB", "MOTH",
  // 5 letters
  "HOUSE", "SMART", "BRAIN", "DANCE", "MUSIC", "LIGHT", "NIGHT", "DREAM", "PEACE",
  "EARTH", "WATER", "PLANT", "FRUIT", "BREAD", "CHAIR", "TABLE", "CLOCK", "PHONE",
  "SMILE", "LAUGH", "THINK", "LEARN", "TEACH", "WRITE", "SPEAK", "SLEEP", "CLIMB",
  "HORSE", "SHEEP", "SNAKE", "WHALE", "TIGER", "ZEBRA", "PANDA", "CAMEL", "MOUSE",
  "CLOUD", "STORM", "FROST", "BEACH", "RIVER", "OCEAN", "MOUNT", "FIELD", "GRASS",
  // 6 letters
  "TARGET", "FRIEND", "SCHOOL", "FAMILY", "GARDEN", "ANIMAL", "BRIDGE", "CASTLE",
  "FLOWER", "MONKEY", "RABBIT", "DRAGON", "PLANET", "SUMMER", "WINTER", "SPRING",
  "AUTUMN", "ORANGE", "PURPLE", "YELLOW", "SILVER", "GOLDEN", "BRIGHT", "SISTER",
  "PARENT", "MARKET", "ISLAND", "FOREST", "DESERT", "JUNGLE", "STREAM",
];

/// Shapes whose rotation is visible in a drawing.
pub const ROTATABLE_SHAPES: &[ShapeKind] =
  &[ShapeKind::Triangle, ShapeKind::Square, ShapeKind::Pentagon, ShapeKind::Star];

/// Shapes used for size sequences.
pub const SCALABLE_SHAPES: &[ShapeKind] =
  &[ShapeKind::Circle, ShapeKind::Square, ShapeKind::Triangle, ShapeKind::Hexagon];

/// A and C shapes for analogies; the first entry (circle) cannot show a turn.
pub const ANALOGY_FIRST_SHAPES: &[ShapeKind] = &[ShapeKind::Circle, ShapeKind::Square, ShapeKind::Triangle];
pub const ANALOGY_SECOND_SHAPES: &[ShapeKind] = &[ShapeKind::Pentagon, ShapeKind::Hexagon, ShapeKind::Star];

/// Ordered polygon catalog for shape-progression sequences (one more side each).
pub const POLYGON_CATALOG: &[ShapeKind] = &[
  ShapeKind::Triangle,
  ShapeKind::Square,
  ShapeKind::Pentagon,
  ShapeKind::Hexagon,
  ShapeKind::Heptagon,
  ShapeKind::Octagon,
];

/// Fills a generator may draw; grey is reserved for wrong-fill distractors.
pub const PALETTE: &[Fill] = &[Fill::Blue, Fill::Red, Fill::Green, Fill::Amber, Fill::Purple, Fill::Pink];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn word_bank_is_uppercase_and_has_partners() {
    for w in CIPHER_WORDS {
      assert!(w.chars().all(|c| c.is_ascii_uppercase()), "{w}");
      assert!(
        CIPHER_WORDS.iter().any(|o| o != w && o.len() == w.len()),
        "{w} has no same-length partner"
      );
    }
  }

  #[test]
  fn palette_excludes_grey() {
    assert!(!PALETTE.contains(&Fill::Grey));
  }
}
