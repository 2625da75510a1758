//! SVG drawing for visual-pattern frames and options.

use std::f64::consts::PI;
use std::fmt::Write;

use crate::patterns::visual::{ShapeDescriptor, ShapeKind, MAX_SIZE};

pub const VIEWBOX: f64 = 80.0;
const CENTER: f64 = VIEWBOX / 2.0;

/// Vertices of a regular `n`-gon of radius `r`, first vertex straight up.
fn polygon_points(n: u32, r: f64) -> Vec<(f64, f64)> {
  (0..n)
    .map(|i| {
      let a = -PI / 2.0 + 2.0 * PI * i as f64 / n as f64;
      (CENTER + r * a.cos(), CENTER + r * a.sin())
    })
    .collect()
}

fn star_points(r: f64) -> Vec<(f64, f64)> {
  (0..10)
    .map(|i| {
      let radius = if i % 2 == 0 { r } else { r * 0.45 };
      let a = -PI / 2.0 + PI * i as f64 / 5.0;
      (CENTER + radius * a.cos(), CENTER + radius * a.sin())
    })
    .collect()
}

fn points_attr(points: &[(f64, f64)]) -> String {
  let mut out = String::new();
  for (i, (x, y)) in points.iter().enumerate() {
    if i > 0 {
      out.push(' ');
    }
    let _ = write!(out, "{x:.1},{y:.1}");
  }
  out
}

/// Radius in viewBox units. The largest legal size just fits, so every legal size
/// keeps its own radius.
fn radius(size: u32) -> f64 {
  let max = CENTER - 2.0;
  (f64::from(size) * max / MAX_SIZE as f64).min(max)
}

/// Standalone `<svg>` element for one shape descriptor.
pub fn render(shape: &ShapeDescriptor) -> String {
  let r = radius(shape.size);
  let fill = shape.fill.hex();
  let body = match shape.shape {
    ShapeKind::Circle => format!(r#"<circle cx="{CENTER}" cy="{CENTER}" r="{r:.1}" fill="{fill}"/>"#),
    ShapeKind::Square => {
      let side = r * std::f64::consts::SQRT_2;
      let corner = CENTER - side / 2.0;
      format!(r#"<rect x="{corner:.1}" y="{corner:.1}" width="{side:.1}" height="{side:.1}" fill="{fill}"/>"#)
    }
    ShapeKind::Diamond => {
      let pts = [(CENTER, CENTER - r), (CENTER + r * 0.6, CENTER), (CENTER, CENTER + r), (CENTER - r * 0.6, CENTER)];
      format!(r#"<polygon points="{}" fill="{fill}"/>"#, points_attr(&pts))
    }
    ShapeKind::Star => format!(r#"<polygon points="{}" fill="{fill}"/>"#, points_attr(&star_points(r))),
    kind => {
      let sides = kind.sides().unwrap_or(3);
      format!(r#"<polygon points="{}" fill="{fill}"/>"#, points_attr(&polygon_points(sides, r)))
    }
  };
  format!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {VIEWBOX} {VIEWBOX}"><g transform="rotate({} {CENTER} {CENTER})">{body}</g></svg>"#,
    shape.rotation
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::patterns::visual::{Fill, VisualParams, VisualRule};

  #[test]
  fn circle_uses_fill_and_radius() {
    let svg = render(&ShapeDescriptor::new(ShapeKind::Circle, Fill::Red, 0, 24));
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r##"fill="#EF4444""##));
    assert!(svg.contains(r#"r="19.0""#));
  }

  #[test]
  fn polygons_have_one_point_per_vertex() {
    let svg = render(&ShapeDescriptor::new(ShapeKind::Hexagon, Fill::Blue, 90, 24));
    let points = svg.split("points=\"").nth(1).unwrap().split('"').next().unwrap();
    assert_eq!(points.split(' ').count(), 6);
    assert!(svg.contains("rotate(90 40 40)"));
  }

  #[test]
  fn distinct_sizes_draw_distinct_markup() {
    let big = render(&ShapeDescriptor::new(ShapeKind::Circle, Fill::Blue, 0, 41));
    let biggest = render(&ShapeDescriptor::new(ShapeKind::Circle, Fill::Blue, 0, 48));
    assert_ne!(big, biggest);
    assert!(biggest.contains(r#"r="38.0""#));
  }

  #[test]
  fn size_sequence_frames_differ_from_the_answer() {
    let params = VisualParams {
      rule: VisualRule::Size { step: 7 },
      base: ShapeDescriptor::new(ShapeKind::Circle, Fill::Blue, 0, 20),
      frames: 4,
      fill_step: 0,
    };
    let drawn: Vec<String> = (0..=4).map(|n| render(&params.frame(n).unwrap())).collect();
    for (i, a) in drawn.iter().enumerate() {
      for b in &drawn[i + 1..] {
        assert_ne!(a, b);
      }
    }
  }

  #[test]
  fn oversized_shapes_stay_inside_the_viewbox() {
    let svg = render(&ShapeDescriptor::new(ShapeKind::Circle, Fill::Green, 0, 60));
    assert!(svg.contains(r#"r="38.0""#));
  }
}
