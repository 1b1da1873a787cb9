//! Re-encoding glyphs as Type 2 charstrings.
//!
//! The path operators overlap: a run of curves can be written with
//! `rrcurveto`, split across `hhcurveto`/`vvcurveto` chains, folded into a
//! flex, and so on, each with a different byte cost. Each subpath is encoded
//! by running Dijkstra's algorithm over a graph whose nodes are positions in
//! the segment list and whose edges are legal operator applications, so the
//! emitted bytes are the shortest this encoder knows how to produce.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use outline_types::Fixed;

use super::stack::MAX_STACK;
use super::{ops, push_number, Widths};
use crate::glyph::{Command, Glyph, Point, Stem};
use crate::Error;

// Stems are flushed in chunks that leave room for a possible width operand
// at the bottom of the stack.
const STEMS_PER_CHUNK: usize = (MAX_STACK - 1) / 2;

/// Encodes a glyph as a Type 2 charstring.
///
/// The advance width is prefixed when it differs from the default width of
/// the glyph's private dictionary, as an offset from the nominal width.
pub fn encode_glyph(glyph: &Glyph, widths: Widths) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    if glyph.width != widths.default {
        push_number(glyph.width - widths.nominal, &mut out);
    }
    let has_mask = glyph.has_hint_masks();
    if !glyph.hstems.is_empty() {
        let op = if has_mask { ops::HSTEMHM } else { ops::HSTEM };
        push_stems(&glyph.hstems, Some(op), &mut out);
    }
    if !glyph.vstems.is_empty() {
        let first_is_mask = matches!(
            glyph.commands.first(),
            Some(Command::HintMask(_) | Command::CntrMask(_))
        );
        if has_mask && first_is_mask {
            // The operands of the final chunk are left on the stack; the
            // hint mask that follows reads them as implicit vstems.
            push_stems_implicit_last(&glyph.vstems, &mut out);
        } else {
            let op = if has_mask { ops::VSTEMHM } else { ops::VSTEM };
            push_stems(&glyph.vstems, Some(op), &mut out);
        }
    }
    let mut pos = Point::default();
    let mut is_open = false;
    let mut i = 0;
    while i < glyph.commands.len() {
        match &glyph.commands[i] {
            Command::HintMask(mask) => {
                out.push(ops::HINTMASK);
                out.extend(mask);
                i += 1;
            }
            Command::CntrMask(mask) => {
                out.push(ops::CNTRMASK);
                out.extend(mask);
                i += 1;
            }
            Command::MoveTo(target) => {
                push_move(delta(pos, *target), &mut out);
                pos = *target;
                is_open = true;
                i += 1;
            }
            Command::LineTo(..) | Command::CurveTo(..) => {
                if !is_open {
                    return Err(Error::invalid("type2", "path command before moveto"));
                }
                let (segments, end, consumed) = collect_run(&glyph.commands[i..], pos)?;
                out.extend(encode_run(&segments));
                pos = end;
                i += consumed;
            }
        }
    }
    out.push(ops::ENDCHAR);
    Ok(out)
}

/// One path segment expressed as coordinate deltas.
#[derive(Copy, Clone, Debug)]
enum Segment {
    Line {
        d: Delta,
    },
    Curve {
        d1: Delta,
        d2: Delta,
        d3: Delta,
    },
}

#[derive(Copy, Clone, Debug)]
struct Delta {
    x: Fixed,
    y: Fixed,
}

impl Segment {
    fn is_line(&self) -> bool {
        matches!(self, Self::Line { .. })
    }

    fn is_curve(&self) -> bool {
        matches!(self, Self::Curve { .. })
    }
}

fn delta(from: Point, to: Point) -> Delta {
    Delta {
        x: to.x - from.x,
        y: to.y - from.y,
    }
}

/// Converts a maximal run of line/curve commands into segment deltas.
fn collect_run(
    commands: &[Command],
    start: Point,
) -> Result<(Vec<Segment>, Point, usize), Error> {
    let mut segments = Vec::new();
    let mut pos = start;
    let mut consumed = 0;
    for command in commands {
        match command {
            Command::LineTo(target) => {
                segments.push(Segment::Line {
                    d: delta(pos, *target),
                });
                pos = *target;
            }
            Command::CurveTo(c1, c2, target) => {
                segments.push(Segment::Curve {
                    d1: delta(pos, *c1),
                    d2: delta(*c1, *c2),
                    d3: delta(*c2, *target),
                });
                pos = *target;
            }
            _ => break,
        }
        consumed += 1;
    }
    if segments.is_empty() {
        return Err(Error::invalid("type2", "empty path run"));
    }
    Ok((segments, pos, consumed))
}

fn push_move(d: Delta, out: &mut Vec<u8>) {
    if d.y == Fixed::ZERO {
        push_number(d.x, out);
        out.push(ops::HMOVETO);
    } else if d.x == Fixed::ZERO {
        push_number(d.y, out);
        out.push(ops::VMOVETO);
    } else {
        push_number(d.x, out);
        push_number(d.y, out);
        out.push(ops::RMOVETO);
    }
}

/// Emits stems as delta encoded intervals, one operator per chunk.
///
/// The interpreter restarts its accumulator at every stem operator, so each
/// chunk begins with an absolute start coordinate.
fn push_stems(stems: &[Stem], op: Option<u8>, out: &mut Vec<u8>) {
    let chunks = stems.chunks(STEMS_PER_CHUNK);
    for chunk in chunks {
        push_stem_chunk(chunk, out);
        if let Some(op) = op {
            out.push(op);
        }
    }
}

fn push_stems_implicit_last(stems: &[Stem], out: &mut Vec<u8>) {
    let chunks: Vec<_> = stems.chunks(STEMS_PER_CHUNK).collect();
    for (i, chunk) in chunks.iter().enumerate() {
        push_stem_chunk(chunk, out);
        if i + 1 < chunks.len() {
            out.push(ops::VSTEMHM);
        }
    }
}

fn push_stem_chunk(chunk: &[Stem], out: &mut Vec<u8>) {
    let mut prev = Fixed::ZERO;
    for stem in chunk {
        push_number(stem.start - prev, out);
        push_number(stem.end - stem.start, out);
        prev = stem.end;
    }
}

/// Shortest-path encoding of one subpath.
///
/// Node `i` is "the first `i` segments are encoded"; an edge from `i` to `j`
/// is an operator application covering segments `i..j`, weighted by its
/// emitted length in bytes.
fn encode_run(segments: &[Segment]) -> Vec<u8> {
    let n = segments.len();
    let mut dist = vec![usize::MAX; n + 1];
    let mut prev: Vec<Option<(usize, Vec<u8>)>> = vec![None; n + 1];
    let mut heap = BinaryHeap::new();
    dist[0] = 0;
    heap.push(Reverse((0usize, 0usize)));
    while let Some(Reverse((cost, node))) = heap.pop() {
        if cost > dist[node] {
            continue;
        }
        if node == n {
            break;
        }
        edges_from(segments, node, &mut |next, bytes| {
            let next_cost = cost + bytes.len();
            if next_cost < dist[next] {
                dist[next] = next_cost;
                prev[next] = Some((node, bytes));
                heap.push(Reverse((next_cost, next)));
            }
        });
    }
    // every segment is coverable by rlineto/rrcurveto, so a path exists
    let mut pieces = Vec::new();
    let mut node = n;
    while node > 0 {
        let (from, bytes) = prev[node].take().expect("unreachable node in subpath graph");
        pieces.push(bytes);
        node = from;
    }
    pieces.reverse();
    pieces.concat()
}

/// Enumerates every legal operator application starting at `start`.
fn edges_from(segments: &[Segment], start: usize, emit: &mut impl FnMut(usize, Vec<u8>)) {
    let rest = &segments[start..];
    let lines = rest.iter().take_while(|s| s.is_line()).count();
    let curves = rest.iter().take_while(|s| s.is_curve()).count();

    // rlineto
    for k in 1..=lines.min(MAX_STACK / 2) {
        let mut bytes = Vec::new();
        for segment in &rest[..k] {
            let Segment::Line { d } = segment else { unreachable!() };
            push_number(d.x, &mut bytes);
            push_number(d.y, &mut bytes);
        }
        bytes.push(ops::RLINETO);
        emit(start + k, bytes);
    }

    // hlineto / vlineto alternating chains
    for first_horizontal in [true, false] {
        let mut horizontal = first_horizontal;
        let mut chain = 0;
        for segment in rest.iter().take(MAX_STACK) {
            let Segment::Line { d } = segment else { break };
            let aligned = if horizontal {
                d.y == Fixed::ZERO
            } else {
                d.x == Fixed::ZERO
            };
            if !aligned {
                break;
            }
            chain += 1;
            horizontal = !horizontal;
        }
        let mut bytes = Vec::new();
        let mut horizontal = first_horizontal;
        for (k, segment) in rest[..chain].iter().enumerate() {
            let Segment::Line { d } = segment else { unreachable!() };
            push_number(if horizontal { d.x } else { d.y }, &mut bytes);
            horizontal = !horizontal;
            let mut with_op = bytes.clone();
            with_op.push(if first_horizontal {
                ops::HLINETO
            } else {
                ops::VLINETO
            });
            emit(start + k + 1, with_op);
        }
    }

    // rrcurveto
    for k in 1..=curves.min(MAX_STACK / 6) {
        let mut bytes = Vec::new();
        for segment in &rest[..k] {
            let Segment::Curve { d1, d2, d3 } = segment else { unreachable!() };
            for d in [d1, d2, d3] {
                push_number(d.x, &mut bytes);
                push_number(d.y, &mut bytes);
            }
        }
        bytes.push(ops::RRCURVETO);
        emit(start + k, bytes);
    }

    // rcurveline: curves followed by a single line
    for k in 1..=curves.min((MAX_STACK - 2) / 6) {
        let Some(Segment::Line { d }) = rest.get(k) else { continue };
        let mut bytes = Vec::new();
        for segment in &rest[..k] {
            let Segment::Curve { d1, d2, d3 } = segment else { unreachable!() };
            for cd in [d1, d2, d3] {
                push_number(cd.x, &mut bytes);
                push_number(cd.y, &mut bytes);
            }
        }
        push_number(d.x, &mut bytes);
        push_number(d.y, &mut bytes);
        bytes.push(ops::RCURVELINE);
        emit(start + k + 1, bytes);
    }

    // rlinecurve: lines followed by a single curve
    for k in 1..=lines.min((MAX_STACK - 6) / 2) {
        let Some(Segment::Curve { d1, d2, d3 }) = rest.get(k) else { continue };
        let mut bytes = Vec::new();
        for segment in &rest[..k] {
            let Segment::Line { d } = segment else { unreachable!() };
            push_number(d.x, &mut bytes);
            push_number(d.y, &mut bytes);
        }
        for cd in [d1, d2, d3] {
            push_number(cd.x, &mut bytes);
            push_number(cd.y, &mut bytes);
        }
        bytes.push(ops::RLINECURVE);
        emit(start + k + 1, bytes);
    }

    // hhcurveto / vvcurveto: axis aligned curve runs with an optional
    // leading off-axis delta on the first curve
    axis_curve_edges(rest, start, true, emit);
    axis_curve_edges(rest, start, false, emit);

    // hvcurveto / vhcurveto: alternating tangents
    alternating_curve_edges(rest, start, true, emit);
    alternating_curve_edges(rest, start, false, emit);

    // hflex / hflex1: two-curve flex features
    if curves >= 2 {
        let (Segment::Curve { d1: a1, d2: a2, d3: a3 }, Segment::Curve { d1: b1, d2: b2, d3: b3 }) =
            (&rest[0], &rest[1])
        else {
            unreachable!()
        };
        if a1.y == Fixed::ZERO
            && a3.y == Fixed::ZERO
            && b1.y == Fixed::ZERO
            && b3.y == Fixed::ZERO
            && b2.y == -a2.y
        {
            let mut bytes = Vec::new();
            for value in [a1.x, a2.x, a2.y, a3.x, b1.x, b2.x, b3.x] {
                push_number(value, &mut bytes);
            }
            bytes.extend([ops::ESCAPE, ops::HFLEX]);
            emit(start + 2, bytes);
        }
        if a3.y == Fixed::ZERO
            && b1.y == Fixed::ZERO
            && a1.y + a2.y + b2.y + b3.y == Fixed::ZERO
        {
            let mut bytes = Vec::new();
            for value in [a1.x, a1.y, a2.x, a2.y, a3.x, b1.x, b2.x, b2.y, b3.x] {
                push_number(value, &mut bytes);
            }
            bytes.extend([ops::ESCAPE, ops::HFLEX1]);
            emit(start + 2, bytes);
        }
    }
}

/// Edges for `hhcurveto` (`horizontal`) and `vvcurveto`.
fn axis_curve_edges(
    rest: &[Segment],
    start: usize,
    horizontal: bool,
    emit: &mut impl FnMut(usize, Vec<u8>),
) {
    let max = (MAX_STACK - 1) / 4;
    let mut bytes = Vec::new();
    for (k, segment) in rest.iter().take(max).enumerate() {
        let Segment::Curve { d1, d2, d3 } = segment else { break };
        let (d1_off, d3_off) = if horizontal {
            (d1.y, d3.y)
        } else {
            (d1.x, d3.x)
        };
        if d3_off != Fixed::ZERO || (k > 0 && d1_off != Fixed::ZERO) {
            break;
        }
        if k == 0 && d1_off != Fixed::ZERO {
            push_number(d1_off, &mut bytes);
        }
        if horizontal {
            for value in [d1.x, d2.x, d2.y, d3.x] {
                push_number(value, &mut bytes);
            }
        } else {
            for value in [d1.y, d2.x, d2.y, d3.y] {
                push_number(value, &mut bytes);
            }
        }
        let mut with_op = bytes.clone();
        with_op.push(if horizontal {
            ops::HHCURVETO
        } else {
            ops::VVCURVETO
        });
        emit(start + k + 1, with_op);
    }
}

/// Edges for `hvcurveto` (starting `horizontal`) and `vhcurveto`.
///
/// Mid-chain curves must end exactly on the alternating axis; the final
/// curve may spend one extra operand on its off-axis ending delta.
fn alternating_curve_edges(
    rest: &[Segment],
    start: usize,
    first_horizontal: bool,
    emit: &mut impl FnMut(usize, Vec<u8>),
) {
    let max = (MAX_STACK - 1) / 4;
    let mut bytes = Vec::new();
    let mut horizontal = first_horizontal;
    for (k, segment) in rest.iter().take(max).enumerate() {
        let Segment::Curve { d1, d2, d3 } = segment else { break };
        let start_off = if horizontal { d1.y } else { d1.x };
        if start_off != Fixed::ZERO {
            break;
        }
        // the ending delta on the tangent axis of the *next* curve
        let end_off = if horizontal { d3.x } else { d3.y };
        let mut with_op = bytes.clone();
        if horizontal {
            for value in [d1.x, d2.x, d2.y, d3.y] {
                push_number(value, &mut with_op);
            }
        } else {
            for value in [d1.y, d2.x, d2.y, d3.x] {
                push_number(value, &mut with_op);
            }
        }
        // this curve as the last of the chain
        let mut closing = with_op.clone();
        if end_off != Fixed::ZERO {
            push_number(end_off, &mut closing);
        }
        closing.push(if first_horizontal {
            ops::HVCURVETO
        } else {
            ops::VHCURVETO
        });
        emit(start + k + 1, closing);
        // continue the chain only through an exact axis ending
        if end_off != Fixed::ZERO {
            break;
        }
        bytes = with_op;
        horizontal = !horizontal;
    }
}
