//! Visual patterns: a parametric shape evolving by a constant per-frame delta, or an
//! analogy ("A is to B as C is to ?") where the change from A to B applies to C.
//!
//! The prompt is a structured vector description (JSON, one attribute set per
//! frame), not prose. The inverse reads the frames back and recomputes the missing
//! attribute set attribute by attribute.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Pattern, PatternInverse, PatternSample, Recovery, NEXT_PROMPT};
use crate::domain::{AnswerValue, Confidence, Difficulty, Domain};
use crate::error::PatternError;
use crate::seeds::{
  ANALOGY_FIRST_SHAPES, ANALOGY_SECOND_SHAPES, PALETTE, POLYGON_CATALOG, ROTATABLE_SHAPES, SCALABLE_SHAPES,
};

pub const MIN_SIZE: i64 = 8;
pub const MAX_SIZE: i64 = 48;
const PROMPT_KIND: &str = "nvr_sequence";
const ANALOGY_KIND: &str = "nvr_analogy";
pub const ANALOGY_PROMPT: &str = "A is to B as C is to ?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
  Circle,
  Triangle,
  Square,
  Diamond,
  Pentagon,
  Hexagon,
  Heptagon,
  Octagon,
  Star,
}

impl ShapeKind {
  pub fn name(self) -> &'static str {
    match self {
      ShapeKind::Circle => "circle",
      ShapeKind::Triangle => "triangle",
      ShapeKind::Square => "square",
      ShapeKind::Diamond => "diamond",
      ShapeKind::Pentagon => "pentagon",
      ShapeKind::Hexagon => "hexagon",
      ShapeKind::Heptagon => "heptagon",
      ShapeKind::Octagon => "octagon",
      ShapeKind::Star => "star",
    }
  }

  /// Side count of a regular polygon; `None` for circle, diamond and star.
  pub fn sides(self) -> Option<u32> {
    match self {
      ShapeKind::Triangle => Some(3),
      ShapeKind::Square => Some(4),
      ShapeKind::Pentagon => Some(5),
      ShapeKind::Hexagon => Some(6),
      ShapeKind::Heptagon => Some(7),
      ShapeKind::Octagon => Some(8),
      ShapeKind::Circle | ShapeKind::Diamond | ShapeKind::Star => None,
    }
  }

  pub fn regular_polygon(sides: i64) -> Option<ShapeKind> {
    match sides {
      3 => Some(ShapeKind::Triangle),
      4 => Some(ShapeKind::Square),
      5 => Some(ShapeKind::Pentagon),
      6 => Some(ShapeKind::Hexagon),
      7 => Some(ShapeKind::Heptagon),
      8 => Some(ShapeKind::Octagon),
      _ => None,
    }
  }

  /// How many rotations within a full turn map the drawing onto itself.
  /// `None` means every rotation does (circle).
  pub fn rotational_order(self) -> Option<i64> {
    match self {
      ShapeKind::Circle => None,
      ShapeKind::Diamond => Some(2),
      ShapeKind::Star => Some(5),
      other => other.sides().map(i64::from),
    }
  }

  /// True when rotating by `a` and by `b` degrees draws the same picture.
  pub fn same_rotation(self, a: i64, b: i64) -> bool {
    match self.rotational_order() {
      None => true,
      Some(order) => ((a - b) * order).rem_euclid(360) == 0,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
  Blue,
  Red,
  Green,
  Amber,
  Purple,
  Pink,
  Grey,
}

impl Fill {
  pub fn name(self) -> &'static str {
    match self {
      Fill::Blue => "blue",
      Fill::Red => "red",
      Fill::Green => "green",
      Fill::Amber => "amber",
      Fill::Purple => "purple",
      Fill::Pink => "pink",
      Fill::Grey => "grey",
    }
  }

  pub fn hex(self) -> &'static str {
    match self {
      Fill::Blue => "#3B82F6",
      Fill::Red => "#EF4444",
      Fill::Green => "#10B981",
      Fill::Amber => "#F59E0B",
      Fill::Purple => "#8B5CF6",
      Fill::Pink => "#EC4899",
      Fill::Grey => "#9CA3AF",
    }
  }
}

/// One frame of a visual pattern: the attributes a drawing is made from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeDescriptor {
  pub shape: ShapeKind,
  pub fill: Fill,
  /// Clockwise degrees, normalised to `0..360`.
  pub rotation: u32,
  pub size: u32,
}

impl ShapeDescriptor {
  pub fn new(shape: ShapeKind, fill: Fill, rotation: i64, size: u32) -> Self {
    ShapeDescriptor { shape, fill, rotation: rotation.rem_euclid(360) as u32, size }
  }

  /// Structural equality: identical attributes, rotation modulo symmetry.
  pub fn same_picture(&self, other: &ShapeDescriptor) -> bool {
    self.shape == other.shape
      && self.fill == other.fill
      && self.size == other.size
      && self.shape.same_rotation(self.rotation as i64, other.rotation as i64)
  }

  /// Attribute-by-attribute differences, empty when the pictures match.
  pub fn differences(&self, other: &ShapeDescriptor) -> Vec<String> {
    let mut out = vec![];
    if self.shape != other.shape {
      out.push(format!("shape {} vs {}", self.shape.name(), other.shape.name()));
    }
    if self.fill != other.fill {
      out.push(format!("fill {} vs {}", self.fill.name(), other.fill.name()));
    }
    if self.size != other.size {
      out.push(format!("size {} vs {}", self.size, other.size));
    }
    if self.shape == other.shape && !self.shape.same_rotation(self.rotation as i64, other.rotation as i64) {
      out.push(format!("rotation {}° vs {}°", self.rotation, other.rotation));
    }
    out
  }
}

impl fmt::Display for ShapeDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.fill.name(), self.shape.name())?;
    if self.shape.rotational_order().is_some() && self.rotation != 0 {
      write!(f, ", rotated {}°", self.rotation)?;
    }
    write!(f, ", size {}", self.size)
  }
}

/// How the shape changes from one frame to the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum VisualRule {
  Rotation { step: i64 },
  Size { step: i64 },
  ShapeProgression { step: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualParams {
  pub rule: VisualRule,
  pub base: ShapeDescriptor,
  pub frames: usize,
  /// Palette positions the fill advances per frame (0 = constant fill).
  #[serde(default)]
  pub fill_step: usize,
}

impl VisualParams {
  pub fn frame(&self, n: usize) -> Option<ShapeDescriptor> {
    let k = n as i64;
    let mut shape = self.base;
    match self.rule {
      VisualRule::Rotation { step } => {
        shape = ShapeDescriptor::new(shape.shape, shape.fill, shape.rotation as i64 + k * step, shape.size);
      }
      VisualRule::Size { step } => {
        shape.size = u32::try_from(shape.size as i64 + k * step).ok()?;
      }
      VisualRule::ShapeProgression { step } => {
        let start = POLYGON_CATALOG.iter().position(|s| *s == self.base.shape)? as i64;
        shape.shape = *POLYGON_CATALOG.get(usize::try_from(start + k * step).ok()?)?;
      }
    }
    if self.fill_step > 0 {
      let start = PALETTE.iter().position(|f| *f == self.base.fill)?;
      shape.fill = PALETTE[(start + n * self.fill_step) % PALETTE.len()];
    }
    Some(shape)
  }

  pub fn shown_frames(&self) -> Option<Vec<ShapeDescriptor>> {
    (0..self.frames).map(|n| self.frame(n)).collect()
  }

  pub fn next_frame(&self) -> Option<ShapeDescriptor> {
    self.frame(self.frames)
  }

  pub(crate) fn explanation_key(&self) -> &'static str {
    match self.rule {
      VisualRule::Rotation { .. } => "visual_rotation",
      VisualRule::Size { .. } => "visual_size",
      VisualRule::ShapeProgression { .. } => "visual_progression",
    }
  }

  pub(crate) fn explanation_vars(&self) -> Vec<(&'static str, String)> {
    let answer = self.next_frame().unwrap_or(self.base);
    let (step, direction) = match self.rule {
      VisualRule::Rotation { step } => (step, if step < 0 { "anticlockwise" } else { "clockwise" }),
      VisualRule::Size { step } => (step, if step < 0 { "decreases" } else { "increases" }),
      VisualRule::ShapeProgression { step } => (step, if step < 0 { "loses" } else { "gains" }),
    };
    let sides: Vec<String> = (0..=self.frames)
      .filter_map(|n| self.frame(n)?.shape.sides())
      .map(|s| s.to_string())
      .collect();
    let fill_note = if self.fill_step > 0 {
      format!(" The colour also moves {} along the palette each step.", crate::util::plural(self.fill_step as i64, "place"))
    } else {
      String::new()
    };
    vec![
      ("shape", self.base.shape.name().to_string()),
      ("step", step.abs().to_string()),
      ("direction", direction.to_string()),
      ("frames", self.frames.to_string()),
      ("total", (step * self.frames as i64).abs().to_string()),
      ("sides", sides.join("→")),
      ("answer_shape", answer.shape.name().to_string()),
      ("answer_size", answer.size.to_string()),
      ("answer", answer.to_string()),
      ("fill_note", fill_note),
    ]
  }
}

/// The change that turns A into B.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogyChange {
  /// B's fill; `None` keeps the fill.
  #[serde(default)]
  pub recolour: Option<Fill>,
  /// Clockwise degrees.
  #[serde(default)]
  pub turn: i64,
  #[serde(default)]
  pub resize: i64,
}

impl AnalogyChange {
  pub fn apply(&self, shape: ShapeDescriptor) -> Option<ShapeDescriptor> {
    let size = u32::try_from(shape.size as i64 + self.resize).ok()?;
    let fill = self.recolour.unwrap_or(shape.fill);
    Some(ShapeDescriptor::new(shape.shape, fill, shape.rotation as i64 + self.turn, size))
  }

  fn describe(&self, from: Fill) -> String {
    let mut parts = vec![];
    if let Some(to) = self.recolour.filter(|to| *to != from) {
      parts.push(format!("changes from {} to {}", from.name(), to.name()));
    }
    match self.turn {
      0 => {}
      t if t > 0 => parts.push(format!("turns {t}° clockwise")),
      t => parts.push(format!("turns {}° anticlockwise", -t)),
    }
    match self.resize {
      0 => {}
      r if r > 0 => parts.push(format!("grows by {r}")),
      r => parts.push(format!("shrinks by {}", -r)),
    }
    parts.join(" and ")
  }
}

/// "A is to B as C is to ?" with A = `first`, B = `change(first)`, C = `second`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalogyParams {
  pub first: ShapeDescriptor,
  pub second: ShapeDescriptor,
  pub change: AnalogyChange,
}

impl AnalogyParams {
  /// A, B and C in prompt order.
  pub fn shown_frames(&self) -> Option<Vec<ShapeDescriptor>> {
    Some(vec![self.first, self.change.apply(self.first)?, self.second])
  }

  pub fn answer(&self) -> Option<ShapeDescriptor> {
    self.change.apply(self.second)
  }

  pub(crate) fn explanation_vars(&self) -> Vec<(&'static str, String)> {
    let answer = self.answer().unwrap_or(self.second);
    vec![
      ("first_shape", self.first.shape.name().to_string()),
      ("second_shape", self.second.shape.name().to_string()),
      ("change", self.change.describe(self.first.fill)),
      ("answer", answer.to_string()),
    ]
  }
}

/// The serialized prompt: the only thing the inverse sees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualPrompt {
  #[serde(rename = "type")]
  pub kind: String,
  pub instruction: String,
  pub frames: Vec<ShapeDescriptor>,
}

pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Result<PatternSample, PatternError> {
  if rng.gen_ratio(1, 4) {
    return generate_analogy(difficulty, rng);
  }
  let level = difficulty.level();
  let fill = *PALETTE.choose(rng).unwrap_or(&Fill::Blue);
  let fill_step = if level >= 4 && rng.gen_bool(0.5) { 1 } else { 0 };
  let frames = 4;

  let params = match rng.gen_range(0..3) {
    0 => {
      let shape = *ROTATABLE_SHAPES.choose(rng).unwrap_or(&ShapeKind::Triangle);
      let steps: &[i64] = if level <= 2 { &[45, 90] } else { &[30, 45, 60, 72] };
      let mut step = *steps.choose(rng).unwrap_or(&45);
      if level >= 4 && rng.gen_bool(0.5) {
        step = -step;
      }
      let size = rng.gen_range(20..=30);
      VisualParams { rule: VisualRule::Rotation { step }, base: ShapeDescriptor::new(shape, fill, 0, size), frames, fill_step }
    }
    1 => {
      let shape = *SCALABLE_SHAPES.choose(rng).unwrap_or(&ShapeKind::Circle);
      let step: i64 = if level <= 2 {
        if rng.gen_bool(0.5) { 7 } else { -6 }
      } else {
        let magnitude = rng.gen_range(4..=8);
        if rng.gen_bool(0.5) { magnitude } else { -magnitude }
      };
      let span = step.abs() * frames as i64;
      let (lo, hi) = if step > 0 { (MIN_SIZE, MAX_SIZE - span) } else { (MIN_SIZE + span, MAX_SIZE) };
      if lo > hi {
        return Err(PatternError::degenerate(Domain::VisualPattern, format!("size step {step} leaves no room")));
      }
      let start = rng.gen_range(lo..=hi) as u32;
      VisualParams { rule: VisualRule::Size { step }, base: ShapeDescriptor::new(shape, fill, 0, start), frames, fill_step }
    }
    _ => {
      let last_start = POLYGON_CATALOG.len() - frames - 1;
      let shape = POLYGON_CATALOG[rng.gen_range(0..=last_start)];
      let size = rng.gen_range(20..=30);
      VisualParams {
        rule: VisualRule::ShapeProgression { step: 1 },
        base: ShapeDescriptor::new(shape, fill, 0, size),
        frames,
        fill_step,
      }
    }
  };
  build(params, difficulty)
}

pub fn build(params: VisualParams, difficulty: Difficulty) -> Result<PatternSample, PatternError> {
  let degenerate = |reason: String| PatternError::degenerate(Domain::VisualPattern, reason);
  if params.frames < 3 {
    return Err(degenerate(format!("{} frames shown, at least 3 needed", params.frames)));
  }
  match params.rule {
    VisualRule::Rotation { step } if params.base.shape.same_rotation(0, step) => {
      return Err(degenerate(format!("a {}° turn leaves a {} unchanged", step, params.base.shape.name())));
    }
    VisualRule::Size { step: 0 } | VisualRule::ShapeProgression { step: 0 } => {
      return Err(degenerate("shape never changes".into()));
    }
    _ => {}
  }
  if params.fill_step > 0 && (params.fill_step % PALETTE.len() == 0 || !PALETTE.contains(&params.base.fill)) {
    return Err(degenerate("fill progression does not move along the palette".into()));
  }

  let frames = params
    .shown_frames()
    .ok_or_else(|| degenerate("frames run off the shape catalog".into()))?;
  let next = params
    .next_frame()
    .ok_or_else(|| degenerate("next frame runs off the shape catalog".into()))?;
  if let VisualRule::Size { .. } = params.rule {
    let out_of_range = |s: &ShapeDescriptor| !(MIN_SIZE..=MAX_SIZE).contains(&(s.size as i64));
    if frames.iter().any(out_of_range) || out_of_range(&next) {
      return Err(degenerate(format!("sizes leave {MIN_SIZE}..={MAX_SIZE}")));
    }
  }

  let prompt = VisualPrompt { kind: PROMPT_KIND.into(), instruction: NEXT_PROMPT.into(), frames };
  let rendered_prompt = serde_json::to_string(&prompt).map_err(|e| degenerate(format!("prompt encoding: {e}")))?;
  Ok(PatternSample {
    difficulty,
    pattern: Pattern::VisualPattern(params),
    rendered_prompt,
    correct_value: AnswerValue::Shape(next),
  })
}

/// Recolour at d≤2, recolour and resize at d3, resize and turn (sometimes
/// recolour) above.
pub fn generate_analogy<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Result<PatternSample, PatternError> {
  let level = difficulty.level();
  let (plain, accent) = PALETTE.split_at(3);
  let fill = *plain.choose(rng).unwrap_or(&Fill::Blue);
  let other = *accent.choose(rng).unwrap_or(&Fill::Amber);
  let size = rng.gen_range(20..=30);
  let resize = |rng: &mut R| {
    let magnitude = rng.gen_range(4..=8);
    if rng.gen_bool(0.5) { magnitude } else { -magnitude }
  };

  let mut first_shapes = ANALOGY_FIRST_SHAPES;
  let change = match level {
    1 | 2 => AnalogyChange { recolour: Some(other), ..AnalogyChange::default() },
    3 => AnalogyChange { recolour: Some(other), resize: resize(&mut *rng), ..AnalogyChange::default() },
    _ => {
      // Circles hide any turn.
      first_shapes = &ANALOGY_FIRST_SHAPES[1..];
      let turn = *[30, 45, -30, -45].choose(rng).unwrap_or(&45);
      let recolour = rng.gen_bool(0.5).then_some(other);
      AnalogyChange { recolour, turn, resize: resize(&mut *rng) }
    }
  };
  let first = *first_shapes.choose(rng).unwrap_or(&ShapeKind::Square);
  let second = *ANALOGY_SECOND_SHAPES.choose(rng).unwrap_or(&ShapeKind::Pentagon);
  let params = AnalogyParams {
    first: ShapeDescriptor::new(first, fill, 0, size),
    second: ShapeDescriptor::new(second, fill, 0, size),
    change,
  };
  build_analogy(params, difficulty)
}

pub fn build_analogy(params: AnalogyParams, difficulty: Difficulty) -> Result<PatternSample, PatternError> {
  let degenerate = |reason: String| PatternError::degenerate(Domain::VisualPattern, reason);
  let AnalogyParams { first, second, change } = params;
  if first.same_picture(&second) {
    return Err(degenerate("C repeats A".into()));
  }
  let turn_visible = |s: &ShapeDescriptor| change.turn != 0 && !s.shape.same_rotation(0, change.turn);
  if change.turn != 0 && !(turn_visible(&first) && turn_visible(&second)) {
    return Err(degenerate(format!("a {}° turn is invisible on A or C", change.turn)));
  }
  let recoloured = change.recolour.is_some_and(|f| f != first.fill);
  if recoloured && second.fill != first.fill {
    // B's colour and a palette move would point at different answers.
    return Err(degenerate("C's fill differs from A's, so the colour change reads two ways".into()));
  }
  if !recoloured && change.turn == 0 && change.resize == 0 {
    return Err(degenerate("B is identical to A".into()));
  }

  let frames = params.shown_frames().ok_or_else(|| degenerate("B shrinks below zero".into()))?;
  let answer = params.answer().ok_or_else(|| degenerate("the answer shrinks below zero".into()))?;
  let out_of_range = |s: &ShapeDescriptor| !(MIN_SIZE..=MAX_SIZE).contains(&(s.size as i64));
  if frames.iter().any(out_of_range) || out_of_range(&answer) {
    return Err(degenerate(format!("sizes leave {MIN_SIZE}..={MAX_SIZE}")));
  }

  let prompt = VisualPrompt { kind: ANALOGY_KIND.into(), instruction: ANALOGY_PROMPT.into(), frames };
  let rendered_prompt = serde_json::to_string(&prompt).map_err(|e| degenerate(format!("prompt encoding: {e}")))?;
  Ok(PatternSample {
    difficulty,
    pattern: Pattern::VisualAnalogy(params),
    rendered_prompt,
    correct_value: AnswerValue::Shape(answer),
  })
}

// ---------------------------------------------------------------------------
// Inverse
// ---------------------------------------------------------------------------

pub fn parse_prompt(prompt: &str) -> Result<VisualPrompt, String> {
  let parsed: VisualPrompt = serde_json::from_str(prompt).map_err(|e| format!("prompt is not a frame description: {e}"))?;
  match parsed.kind.as_str() {
    PROMPT_KIND if parsed.frames.len() < 3 => {
      Err(format!("only {} frames in prompt, need at least 3", parsed.frames.len()))
    }
    ANALOGY_KIND if parsed.frames.len() != 3 => {
      Err(format!("an analogy shows A, B and C, not {} frames", parsed.frames.len()))
    }
    PROMPT_KIND | ANALOGY_KIND => Ok(parsed),
    other => Err(format!("unknown visual prompt type '{other}'")),
  }
}

/// Dispatch on the prompt type.
pub fn infer(prompt: &VisualPrompt) -> Recovery {
  if prompt.kind == ANALOGY_KIND {
    infer_analogy(&prompt.frames)
  } else {
    infer_next(&prompt.frames)
  }
}

/// Single constant delta between consecutive values, if there is one.
fn constant_delta(values: &[i64]) -> Option<i64> {
  let deltas: Vec<i64> = values.windows(2).map(|w| w[1] - w[0]).collect();
  let first = *deltas.first()?;
  deltas.iter().all(|d| *d == first).then_some(first)
}

fn next_shape(frames: &[ShapeDescriptor]) -> Result<ShapeKind, String> {
  let last = frames[frames.len() - 1].shape;
  if frames.iter().all(|f| f.shape == last) {
    return Ok(last);
  }
  let sides: Option<Vec<i64>> = frames.iter().map(|f| f.shape.sides().map(i64::from)).collect();
  let sides = sides.ok_or("shape changes between frames without a side-count progression")?;
  let step = constant_delta(&sides).ok_or_else(|| format!("side counts {sides:?} do not change by a constant amount"))?;
  let target = sides[sides.len() - 1] + step;
  ShapeKind::regular_polygon(target).ok_or_else(|| format!("no regular polygon with {target} sides"))
}

fn next_fill(frames: &[ShapeDescriptor]) -> Result<Fill, String> {
  let last = frames[frames.len() - 1].fill;
  if frames.iter().all(|f| f.fill == last) {
    return Ok(last);
  }
  let len = PALETTE.len() as i64;
  let positions: Option<Vec<i64>> = frames.iter().map(|f| PALETTE.iter().position(|p| *p == f.fill).map(|i| i as i64)).collect();
  let positions = positions.ok_or("fill changes to a colour outside the palette")?;
  let steps: Vec<i64> = positions.windows(2).map(|w| (w[1] - w[0]).rem_euclid(len)).collect();
  match steps.first() {
    Some(&s) if steps.iter().all(|x| *x == s) => Ok(PALETTE[((positions[positions.len() - 1] + s).rem_euclid(len)) as usize]),
    _ => Err("fill changes irregularly".into()),
  }
}

fn next_size(frames: &[ShapeDescriptor]) -> Result<u32, String> {
  let sizes: Vec<i64> = frames.iter().map(|f| f.size as i64).collect();
  let step = constant_delta(&sizes).ok_or_else(|| format!("sizes {sizes:?} do not change by a constant amount"))?;
  u32::try_from(sizes[sizes.len() - 1] + step).map_err(|_| "size would shrink below zero".to_string())
}

fn next_rotation(frames: &[ShapeDescriptor]) -> Result<i64, String> {
  let turns: Vec<i64> = frames.windows(2).map(|w| (w[1].rotation as i64 - w[0].rotation as i64).rem_euclid(360)).collect();
  match turns.first() {
    Some(&t) if turns.iter().all(|x| *x == t) => Ok(frames[frames.len() - 1].rotation as i64 + t),
    _ => Err(format!("turns {turns:?} between frames are not constant")),
  }
}

pub fn infer_next(frames: &[ShapeDescriptor]) -> Recovery {
  if frames.is_empty() {
    return Recovery::Ambiguous("no frames".into());
  }
  let shape = match next_shape(frames) {
    Ok(s) => s,
    Err(why) => return Recovery::Ambiguous(why),
  };
  let fill = match next_fill(frames) {
    Ok(f) => f,
    Err(why) => return Recovery::Ambiguous(why),
  };
  let size = match next_size(frames) {
    Ok(s) => s,
    Err(why) => return Recovery::Ambiguous(why),
  };
  let rotation = match next_rotation(frames) {
    Ok(r) => r,
    Err(why) => return Recovery::Ambiguous(why),
  };
  let next = ShapeDescriptor::new(shape, fill, rotation, size);
  let last = frames[frames.len() - 1];
  Recovery::Derived { value: AnswerValue::Shape(next), rule: describe_changes(&last, &next) }
}

fn describe_changes(from: &ShapeDescriptor, to: &ShapeDescriptor) -> String {
  let mut changes = vec![];
  if to.shape != from.shape {
    changes.push(format!("shape {}→{}", from.shape.name(), to.shape.name()));
  }
  if to.fill != from.fill {
    changes.push(format!("fill {}→{}", from.fill.name(), to.fill.name()));
  }
  if to.size != from.size {
    changes.push(format!("size {:+}", to.size as i64 - from.size as i64));
  }
  if to.rotation != from.rotation {
    changes.push(format!("rotation {}°→{}°", from.rotation, to.rotation));
  }
  changes.join(", ")
}

fn analogy_shape(a: ShapeKind, b: ShapeKind, c: ShapeKind) -> Result<ShapeKind, String> {
  if a == b {
    return Ok(c);
  }
  match (a.sides(), b.sides(), c.sides()) {
    (Some(sa), Some(sb), Some(sc)) => {
      let target = i64::from(sc) + i64::from(sb) - i64::from(sa);
      ShapeKind::regular_polygon(target).ok_or_else(|| format!("no regular polygon with {target} sides"))
    }
    _ => Err(format!("{} becomes {} without a side-count change", a.name(), b.name())),
  }
}

fn analogy_fill(a: Fill, b: Fill, c: Fill) -> Result<Fill, String> {
  if a == b {
    Ok(c)
  } else if c == a {
    Ok(b)
  } else {
    Err(format!(
      "A goes {} to {} but C is {}: 'becomes {}' and 'same palette move' disagree",
      a.name(),
      b.name(),
      c.name(),
      b.name()
    ))
  }
}

/// Apply A→B to C, attribute by attribute.
pub fn infer_analogy(frames: &[ShapeDescriptor]) -> Recovery {
  let [a, b, c] = frames else {
    return Recovery::Ambiguous(format!("an analogy needs exactly 3 frames, got {}", frames.len()));
  };
  let shape = match analogy_shape(a.shape, b.shape, c.shape) {
    Ok(s) => s,
    Err(why) => return Recovery::Ambiguous(why),
  };
  let fill = match analogy_fill(a.fill, b.fill, c.fill) {
    Ok(f) => f,
    Err(why) => return Recovery::Ambiguous(why),
  };
  let Ok(size) = u32::try_from(c.size as i64 + b.size as i64 - a.size as i64) else {
    return Recovery::Ambiguous("the size change would shrink C below zero".into());
  };
  let rotation = c.rotation as i64 + b.rotation as i64 - a.rotation as i64;
  let answer = ShapeDescriptor::new(shape, fill, rotation, size);
  let rule = format!("A→B is {}, applied to C", describe_changes(a, b));
  Recovery::Derived { value: AnswerValue::Shape(answer), rule }
}

pub struct VisualInverse;

impl PatternInverse for VisualInverse {
  fn domain(&self) -> Domain {
    Domain::VisualPattern
  }

  fn recover(&self, prompt: &str) -> Recovery {
    match parse_prompt(prompt) {
      Ok(parsed) => infer(&parsed),
      Err(why) => Recovery::Ambiguous(why),
    }
  }

  fn explain_mismatch(&self, prompt: &str, claimed: &AnswerValue) -> Option<String> {
    let AnswerValue::Shape(claimed) = claimed else {
      return Some("claimed answer is not a shape".into());
    };
    let parsed = parse_prompt(prompt).ok()?;
    let Recovery::Derived { value: AnswerValue::Shape(expected), .. } = infer(&parsed) else {
      return None;
    };
    let diffs = expected.differences(claimed);
    (!diffs.is_empty()).then(|| format!("expected vs claimed: {}", diffs.join("; ")))
  }

  fn confidence_cap(&self) -> Confidence {
    Confidence::Medium
  }
}
