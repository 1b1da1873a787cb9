//! Randomized round-trip laws for the charstring, FDSelect and glyf codecs.

use rand::prelude::*;
use rand::rngs::StdRng;

use outline_tables::font_data::FontData;
use outline_tables::glyph::{Command, Glyph, Point, Stem};
use outline_tables::tables::cff::index::Index;
use outline_tables::tables::cff::{self, FdSelect};
use outline_tables::tables::glyf::{
    self, Anchor, Bbox, Component, CompositeGlyph, Contour, CurvePoint, SimpleGlyph, Transform,
};
use outline_tables::tables::type2::{self, Widths};
use outline_types::{F2Dot14, Fixed, GlyphId};

fn coord(rng: &mut StdRng) -> Fixed {
    // integers and halves exercise both operand encodings
    let whole = rng.gen_range(-2000..2000);
    if rng.gen_bool(0.2) {
        Fixed::from_f64(whole as f64 + 0.5)
    } else {
        Fixed::from_i32(whole)
    }
}

fn random_glyph(rng: &mut StdRng) -> Glyph {
    let mut glyph = Glyph::default();
    let stem_count = rng.gen_range(0..4);
    let mut pos = Fixed::ZERO;
    for _ in 0..stem_count {
        pos += Fixed::from_i32(rng.gen_range(1..200));
        let end = pos + Fixed::from_i32(rng.gen_range(1..60));
        if rng.gen_bool(0.5) {
            glyph.hstems.push(Stem::new(pos, end));
        } else {
            glyph.vstems.push(Stem::new(pos, end));
        }
        pos = end;
    }
    let total_stems = glyph.hstems.len() + glyph.vstems.len();
    let mask_len = total_stems.div_ceil(8);
    let with_masks = total_stems > 0 && rng.gen_bool(0.5);
    if with_masks {
        let mask: Vec<u8> = (0..mask_len).map(|_| rng.gen()).collect();
        glyph.commands.push(Command::HintMask(mask));
    }
    for _ in 0..rng.gen_range(1..4) {
        let mut current = Point::new(coord(rng), coord(rng));
        glyph.commands.push(Command::MoveTo(current));
        for _ in 0..rng.gen_range(1..8) {
            if rng.gen_bool(0.5) {
                current = Point::new(coord(rng), coord(rng));
                glyph.commands.push(Command::LineTo(current));
            } else {
                let c1 = Point::new(coord(rng), coord(rng));
                let c2 = Point::new(coord(rng), coord(rng));
                current = Point::new(coord(rng), coord(rng));
                glyph.commands.push(Command::CurveTo(c1, c2, current));
            }
        }
        if with_masks && rng.gen_bool(0.3) {
            let mask: Vec<u8> = (0..mask_len).map(|_| rng.gen()).collect();
            glyph.commands.push(Command::CntrMask(mask));
        }
    }
    glyph.width = Fixed::from_i32(rng.gen_range(0..1000));
    glyph
}

// decode(encode(g)) == g for arbitrary glyphs, and the second encoding is
// byte identical to the first.
#[test]
fn charstring_round_trip_law() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    let widths = Widths {
        default: Fixed::from_i32(500),
        nominal: Fixed::from_i32(400),
    };
    let empty = Index::empty();
    for _ in 0..200 {
        let glyph = random_glyph(&mut rng);
        let bytes = type2::encode_glyph(&glyph, widths).unwrap();
        let decoded = type2::decode::parse_glyph(&bytes, &empty, &empty, widths).unwrap();
        assert_eq!(decoded, glyph);
        let second = type2::encode_glyph(&decoded, widths).unwrap();
        assert_eq!(second, bytes);
    }
}

// Random byte strings mostly fail to decode; the ones that succeed must
// re-encode into a charstring that decodes to the same glyph.
#[test]
fn charstring_fuzz_law() {
    let mut rng = StdRng::seed_from_u64(0xF00D);
    let widths = Widths::default();
    let empty = Index::empty();
    let mut decoded_count = 0;
    for _ in 0..2000 {
        let mut bytes = Vec::new();
        // start a subpath so path operators are reachable
        bytes.extend([0x8B, 0x8B, 21]);
        for _ in 0..rng.gen_range(0..24) {
            if rng.gen_bool(0.7) {
                bytes.push(rng.gen_range(32..=246));
            } else {
                bytes.push(*[1u8, 3, 4, 5, 6, 7, 8, 21, 22, 24, 25, 26, 27, 30, 31]
                    .choose(&mut rng)
                    .unwrap());
            }
        }
        bytes.push(14); // endchar
        let Ok(glyph) = type2::decode::parse_glyph(&bytes, &empty, &empty, widths) else {
            continue;
        };
        decoded_count += 1;
        let reencoded = type2::encode_glyph(&glyph, widths).unwrap();
        let redecoded = type2::decode::parse_glyph(&reencoded, &empty, &empty, widths).unwrap();
        assert_eq!(redecoded, glyph);
    }
    assert!(decoded_count > 0, "no random charstring decoded");
}

// Any mapping under 100 glyphs re-encodes into no more bytes than the plain
// format 0 serialization and preserves the mapping.
#[test]
fn fd_select_fuzz_law() {
    let mut rng = StdRng::seed_from_u64(0xFD5E);
    const NUM_GLYPHS: usize = 100;
    for _ in 0..200 {
        let runs = rng.gen_range(1..10);
        let mut fds = Vec::new();
        for _ in 0..runs {
            let fd = rng.gen_range(0..5u8);
            let len = rng.gen_range(1..40);
            fds.extend(std::iter::repeat(fd).take(len));
        }
        fds.truncate(NUM_GLYPHS);
        fds.resize(NUM_GLYPHS, 0);
        // a plain format 0 serialization of the same mapping
        let mut format0 = vec![0u8];
        format0.extend(&fds);
        let parsed = FdSelect::read(FontData::new(&format0), NUM_GLYPHS).unwrap();
        let reencoded = parsed.encode(NUM_GLYPHS);
        assert!(reencoded.len() <= format0.len());
        let reparsed = FdSelect::read(FontData::new(&reencoded), NUM_GLYPHS).unwrap();
        for gid in 0..NUM_GLYPHS {
            assert_eq!(
                reparsed.font_index(GlyphId::new(gid as u16)),
                fds[gid],
            );
        }
    }
}

fn random_simple(rng: &mut StdRng) -> glyf::Glyph {
    let mut contours = Vec::new();
    for _ in 0..rng.gen_range(1..4) {
        let points: Vec<CurvePoint> = (0..rng.gen_range(3..10))
            .map(|_| {
                CurvePoint::new(
                    rng.gen_range(-2000..2000),
                    rng.gen_range(-2000..2000),
                    rng.gen_bool(0.7),
                )
            })
            .collect();
        contours.push(Contour::from(points));
    }
    let instructions = if rng.gen_bool(0.3) {
        (0..rng.gen_range(1..10)).map(|_| rng.gen()).collect()
    } else {
        Vec::new()
    };
    let mut glyph = SimpleGlyph {
        bbox: Bbox::default(),
        contours,
        instructions,
    };
    glyph.recompute_bounding_box();
    glyf::Glyph::Simple(glyph)
}

fn random_composite(rng: &mut StdRng, num_glyphs: u16) -> glyf::Glyph {
    let components = (0..rng.gen_range(1..4))
        .map(|_| {
            let anchor = if rng.gen_bool(0.8) {
                Anchor::Offset {
                    x: rng.gen_range(-300..300),
                    y: rng.gen_range(-300..300),
                }
            } else {
                Anchor::Point {
                    base: rng.gen_range(0..4),
                    component: rng.gen_range(0..4),
                }
            };
            let mut component = Component::new(GlyphId::new(rng.gen_range(0..num_glyphs)), anchor);
            component.flags.round_xy_to_grid = rng.gen_bool(0.3);
            component.flags.use_my_metrics = rng.gen_bool(0.1);
            component.flags.overlap_compound = rng.gen_bool(0.1);
            match rng.gen_range(0..4) {
                1 => component.transform = Transform::scale(rng.gen_range(-1.5..1.5)),
                2 => {
                    component.transform.xx = F2Dot14::from_f32(rng.gen_range(-1.5..1.5));
                    component.transform.yy = F2Dot14::from_f32(rng.gen_range(-1.5..1.5));
                }
                3 => {
                    component.transform = Transform {
                        xx: F2Dot14::from_f32(rng.gen_range(-1.5..1.5)),
                        yx: F2Dot14::from_f32(rng.gen_range(-0.5..0.5)),
                        xy: F2Dot14::from_f32(rng.gen_range(-0.5..0.5)),
                        yy: F2Dot14::from_f32(rng.gen_range(-1.5..1.5)),
                    }
                }
                _ => {}
            }
            component
        })
        .collect();
    let instructions = if rng.gen_bool(0.3) {
        (0..rng.gen_range(1..8)).map(|_| rng.gen()).collect()
    } else {
        Vec::new()
    };
    glyf::Glyph::Composite(CompositeGlyph {
        bbox: Bbox::default(),
        components,
        instructions,
    })
}

// decode(encode(glyphs)) == glyphs after one canonicalizing pass, for
// arbitrary glyph lists, with a strictly consistent loca.
#[test]
fn glyf_round_trip_law() {
    let mut rng = StdRng::seed_from_u64(0x91F9);
    for _ in 0..100 {
        let num_glyphs = rng.gen_range(1..10u16);
        let glyphs: Vec<glyf::Glyph> = (0..num_glyphs)
            .map(|_| match rng.gen_range(0..3) {
                0 => glyf::Glyph::default(),
                1 => random_simple(&mut rng),
                _ => random_composite(&mut rng, num_glyphs),
            })
            .collect();
        let tables = glyf::encode(&glyphs);
        let decoded = glyf::decode(&tables.glyf, &tables.loca, tables.format).unwrap();
        // one canonicalizing pass: re-encoding the decoded list must be
        // byte identical
        let second = glyf::encode(&decoded);
        assert_eq!(second, tables);
        let redecoded = glyf::decode(&second.glyf, &second.loca, second.format).unwrap();
        assert_eq!(redecoded, decoded);
    }
}

// A full CFF container survives write -> read -> write bit-exactly.
#[test]
fn cff_container_stability_law() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = StdRng::seed_from_u64(0xCFF0);
    for _ in 0..20 {
        let mut outlines = cff::Outlines::new();
        outlines.private[0].default_width_x = 500.0;
        let glyph_count = rng.gen_range(2..12);
        for gid in 0..glyph_count {
            let mut glyph = random_glyph(&mut rng);
            glyph.name = Some(if gid == 0 {
                ".notdef".to_string()
            } else {
                format!("g{gid:02}")
            });
            outlines.push(glyph);
        }
        let info = cff::FontInfo {
            font_name: "Fuzz-Regular".to_string(),
            ..Default::default()
        };
        let first = cff::encode(&outlines, &info).unwrap();
        let (decoded, decoded_info) = cff::read(&first).unwrap();
        assert_eq!(decoded.num_glyphs(), glyph_count);
        let second = cff::encode(&decoded, &decoded_info).unwrap();
        assert_eq!(first, second);
    }
}
