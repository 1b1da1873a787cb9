//! Expanding glyphs, composite references included, into paths.

use kurbo::{Affine, BezPath, Point, Vec2};
use outline_types::GlyphId;

use super::{Anchor, Component, Glyph, SimpleGlyph};

/// A flattened point with its on-curve flag.
#[derive(Copy, Clone, Debug)]
struct FlatPoint {
    pos: Point,
    on_curve: bool,
}

/// The expanded form of a glyph: points plus contour end indexes
/// (exclusive).
#[derive(Clone, Default, Debug)]
struct Expanded {
    points: Vec<FlatPoint>,
    contour_ends: Vec<usize>,
}

/// Returns the outline of `gid` with all component references resolved,
/// transformed by `matrix`.
///
/// Expansion walks the component graph depth first; a glyph already on the
/// current expansion chain contributes an empty outline, so malformed
/// cyclic fonts terminate after at most one visit per glyph.
pub fn glyph_path(glyphs: &[Glyph], gid: GlyphId, matrix: &Affine) -> BezPath {
    let mut chain = Vec::new();
    let expanded = expand(glyphs, gid, &mut chain);
    let mut path = BezPath::new();
    let mut start = 0;
    for end in &expanded.contour_ends {
        contour_to_path(&mut path, &expanded.points[start..*end]);
        start = *end;
    }
    path.apply_affine(*matrix);
    path
}

fn expand(glyphs: &[Glyph], gid: GlyphId, chain: &mut Vec<GlyphId>) -> Expanded {
    if chain.contains(&gid) {
        return Expanded::default();
    }
    match glyphs.get(gid.to_usize()) {
        Some(Glyph::Simple(simple)) => flatten(simple),
        Some(Glyph::Composite(composite)) => {
            chain.push(gid);
            let mut result = Expanded::default();
            for component in &composite.components {
                let child = expand(glyphs, component.glyph, chain);
                place_component(&mut result, child, component);
            }
            chain.pop();
            result
        }
        None => Expanded::default(),
    }
}

fn flatten(simple: &SimpleGlyph) -> Expanded {
    let mut expanded = Expanded::default();
    for contour in &simple.contours {
        expanded.points.extend(contour.iter().map(|p| FlatPoint {
            pos: Point::new(p.x as f64, p.y as f64),
            on_curve: p.on_curve,
        }));
        expanded.contour_ends.push(expanded.points.len());
    }
    expanded
}

/// Applies a component's transform and anchor, then appends its points.
fn place_component(parent: &mut Expanded, mut child: Expanded, component: &Component) {
    let t = &component.transform;
    let linear = Affine::new([
        t.xx.to_f64(),
        t.yx.to_f64(),
        t.xy.to_f64(),
        t.yy.to_f64(),
        0.0,
        0.0,
    ]);
    for point in &mut child.points {
        point.pos = linear * point.pos;
    }
    let translation = match component.anchor {
        Anchor::Offset { x, y } => {
            let offset = Vec2::new(x as f64, y as f64);
            if component.flags.scaled_component_offset {
                linear * offset.to_point() - Point::ORIGIN
            } else {
                offset
            }
        }
        Anchor::Point { base, component } => {
            match (
                parent.points.get(base as usize),
                child.points.get(component as usize),
            ) {
                (Some(parent_point), Some(child_point)) => parent_point.pos - child_point.pos,
                // unmatched point indices leave the component in place
                _ => Vec2::ZERO,
            }
        }
    };
    let base = parent.points.len();
    parent.points.extend(child.points.iter().map(|p| FlatPoint {
        pos: p.pos + translation,
        on_curve: p.on_curve,
    }));
    parent
        .contour_ends
        .extend(child.contour_ends.iter().map(|end| base + end));
}

/// Emits one TrueType contour: quadratic segments with implied on-curve
/// midpoints between consecutive off-curve points.
fn contour_to_path(path: &mut BezPath, points: &[FlatPoint]) {
    if points.is_empty() {
        return;
    }
    let first_on = points.iter().position(|p| p.on_curve);
    let (start, skip, count) = match first_on {
        Some(i) => (points[i].pos, i + 1, points.len() - 1),
        // an all-off-curve contour starts at the midpoint of its last and
        // first point
        None => (
            points[points.len() - 1].pos.midpoint(points[0].pos),
            0,
            points.len(),
        ),
    };
    path.move_to(start);
    let mut pending_off: Option<Point> = None;
    for k in 0..count {
        let point = points[(skip + k) % points.len()];
        if point.on_curve {
            match pending_off.take() {
                Some(control) => path.quad_to(control, point.pos),
                None => path.line_to(point.pos),
            }
        } else if let Some(control) = pending_off.replace(point.pos) {
            let implied = control.midpoint(point.pos);
            path.quad_to(control, implied);
        }
    }
    if let Some(control) = pending_off {
        path.quad_to(control, start);
    }
    path.close_path();
}
