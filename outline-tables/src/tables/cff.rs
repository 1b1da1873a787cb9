//! The CFF container codec.
//!
//! Reading turns a CFF 1.0 table into an owned [`Outlines`] container plus
//! the Top DICT's informational entries ([`FontInfo`]); writing assembles
//! the sections in a fixed order and resolves the self-referential offsets
//! in the Top DICT, Font DICTs and Private DICTs by fixed-point iteration.

pub mod charset;
pub mod dict;
pub mod encoding;
pub mod fd_select;
pub mod index;
pub mod names;
pub mod private;
pub mod strings;

use std::io;

use kurbo::{Affine, BezPath};
use log::debug;
use outline_types::GlyphId;

use crate::font_data::FontData;
use crate::glyph::{Command, Glyph};
use crate::tables::type2;
use crate::write::TableWriter;
use crate::Error;

use dict::{op, Dict, Operand};
pub use encoding::Encoding;
pub use fd_select::FdSelect;
use index::Index;
pub use private::PrivateDict;
use strings::StringInterner;

/// The identity matrix used to pad per-subfont matrices.
pub const IDENTITY_MATRIX: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// The DICT default font matrix (glyph space is 1000 units per em).
pub const DEFAULT_FONT_MATRIX: [f64; 6] = [0.001, 0.0, 0.0, 0.001, 0.0, 0.0];

// The write loop is bounded: offsets grow monotonically, by a few bytes of
// operand width per pass at most.
const MAX_OFFSET_PASSES: usize = 8;

/// A character collection identifier for CID-keyed fonts.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ros {
    pub registry: String,
    pub ordering: String,
    pub supplement: i32,
}

/// An owned CFF font: glyph outlines plus the structures that bind them.
///
/// Exactly one of `encoding` (simple fonts) and `ros` + `gid_to_cid`
/// (CID-keyed fonts) is populated.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct Outlines {
    /// The glyphs; index 0 is `.notdef`.
    pub glyphs: Vec<Glyph>,
    /// One or more private dictionaries.
    pub private: Vec<PrivateDict>,
    /// Maps each glyph to an entry of `private`.
    pub fd_select: FdSelect,
    /// The code to glyph mapping of a simple font.
    pub encoding: Option<Encoding>,
    /// The character collection of a CID-keyed font.
    pub ros: Option<Ros>,
    /// Glyph to CID mapping of a CID-keyed font; entry 0 is always CID 0.
    pub gid_to_cid: Vec<u16>,
    /// One font matrix per private dictionary (CID-keyed fonts).
    pub font_matrices: Vec<[f64; 6]>,
}

impl Outlines {
    /// Creates an empty simple font with one default private dictionary.
    pub fn new() -> Self {
        Self {
            private: vec![PrivateDict::default()],
            encoding: Some(Encoding::new()),
            ..Default::default()
        }
    }

    pub fn num_glyphs(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_cid_keyed(&self) -> bool {
        self.ros.is_some()
    }

    /// Appends a glyph and returns its identifier.
    pub fn push(&mut self, glyph: Glyph) -> GlyphId {
        self.glyphs.push(glyph);
        GlyphId::new(self.glyphs.len() as u16 - 1)
    }

    /// The private dictionary covering the given glyph.
    pub fn private_for(&self, glyph: GlyphId) -> &PrivateDict {
        let fd = self.fd_select.font_index(glyph) as usize;
        &self.private[fd.min(self.private.len() - 1)]
    }

    /// Returns the glyph outline as a path, transformed by `matrix`.
    ///
    /// Missing glyphs yield an empty path. Subpaths are implicitly closed.
    pub fn glyph_path(&self, glyph: GlyphId, matrix: &Affine) -> BezPath {
        let mut path = BezPath::new();
        let Some(glyph) = self.glyphs.get(glyph.to_usize()) else {
            return path;
        };
        let mut open = false;
        for command in &glyph.commands {
            match command {
                Command::MoveTo(p) => {
                    if open {
                        path.close_path();
                    }
                    open = true;
                    path.move_to((p.x.to_f64(), p.y.to_f64()));
                }
                Command::LineTo(p) => path.line_to((p.x.to_f64(), p.y.to_f64())),
                Command::CurveTo(c1, c2, p) => path.curve_to(
                    (c1.x.to_f64(), c1.y.to_f64()),
                    (c2.x.to_f64(), c2.y.to_f64()),
                    (p.x.to_f64(), p.y.to_f64()),
                ),
                Command::HintMask(_) | Command::CntrMask(_) => {}
            }
        }
        if open {
            path.close_path();
        }
        path.apply_affine(*matrix);
        path
    }
}

/// Informational entries from the Top DICT and Name INDEX.
#[derive(Clone, PartialEq, Debug)]
pub struct FontInfo {
    pub font_name: String,
    pub version: Option<String>,
    pub notice: Option<String>,
    pub copyright: Option<String>,
    pub full_name: Option<String>,
    pub family_name: Option<String>,
    pub weight: Option<String>,
    pub is_fixed_pitch: bool,
    pub italic_angle: f64,
    pub underline_position: f64,
    pub underline_thickness: f64,
    pub font_matrix: [f64; 6],
    pub font_bbox: [f64; 4],
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            font_name: "Untitled".to_string(),
            version: None,
            notice: None,
            copyright: None,
            full_name: None,
            family_name: None,
            weight: None,
            is_fixed_pitch: false,
            italic_angle: 0.0,
            underline_position: -100.0,
            underline_thickness: 50.0,
            font_matrix: DEFAULT_FONT_MATRIX,
            font_bbox: [0.0; 4],
        }
    }
}

/// Parses a CFF 1.0 table.
pub fn read(data: &[u8]) -> Result<(Outlines, FontInfo), Error> {
    let font = FontData::new(data);
    let mut header = font.cursor("cff");
    let major = header.read_u8()?;
    if major != 1 {
        return Err(Error::unsupported("cff", format!("major version {major}")));
    }
    let _minor = header.read_u8()?;
    let hdr_size = header.read_u8()?;
    if hdr_size < 4 {
        return Err(Error::invalid("cff", "header size below 4"));
    }
    let _off_size = header.read_u8()?;
    let mut cursor = font
        .split_off(hdr_size as usize)
        .ok_or_else(|| Error::invalid("cff", "truncated header"))?
        .cursor("cff");
    let name_index = Index::read(&mut cursor)?;
    if name_index.count() > 1 {
        return Err(Error::unsupported("cff", "multi-font CFF sets"));
    }
    let font_name = latin1(name_index.get(0)?);
    let top_dicts = Index::read(&mut cursor)?;
    let top = Dict::parse(top_dicts.get(0)?)?;
    let string_index = Index::read(&mut cursor)?;
    let global_subrs = Index::read(&mut cursor)?;

    if let Some(cs_type) = top.int(op::CHARSTRING_TYPE) {
        if cs_type != 2 {
            return Err(Error::unsupported(
                "cff",
                format!("CharstringType {cs_type}"),
            ));
        }
    }
    let charstrings_offset = require_offset(&top, op::CHARSTRINGS, "CharStrings")?;
    let charstrings = Index::read_from(
        font.split_off(charstrings_offset)
            .ok_or_else(|| Error::invalid("cff", "CharStrings offset out of bounds"))?
            .as_bytes(),
    )?;
    let num_glyphs = charstrings.count();
    if num_glyphs == 0 {
        return Err(Error::invalid("cff", "font has no glyphs (missing .notdef)"));
    }

    let info = read_info(&top, &string_index, font_name)?;

    let charset_offset = top.int(op::CHARSET).unwrap_or(0) as usize;
    let ids = charset::read(font, charset_offset, num_glyphs)?;

    let mut outlines = if top.contains(op::ROS) {
        read_cid_structure(font, &top, &string_index, num_glyphs, ids)?
    } else {
        read_simple_structure(font, &top, &string_index, ids)?
    };

    // decode every charstring against its subfont's widths and subrs
    let local_subrs = outlines.local_subrs.take().unwrap_or_default();
    for gid in 0..num_glyphs {
        let fd = outlines.inner.fd_select.font_index(GlyphId::new(gid as u16)) as usize;
        let widths = outlines.inner.private[fd].widths();
        let empty = Index::empty();
        let subrs = local_subrs.get(fd).unwrap_or(&empty);
        let mut glyph =
            type2::decode::parse_glyph(charstrings.get(gid)?, &global_subrs, subrs, widths)?;
        glyph.name = outlines.names.get(gid).cloned().flatten();
        outlines.inner.glyphs.push(glyph);
    }
    Ok((outlines.inner, info))
}

/// Serializes a CFF table to the given sink.
pub fn write(outlines: &Outlines, info: &FontInfo, out: &mut impl io::Write) -> Result<(), Error> {
    let bytes = encode(outlines, info)?;
    out.write_all(&bytes)?;
    Ok(())
}

/// Serializes a CFF table.
pub fn encode(outlines: &Outlines, info: &FontInfo) -> Result<Vec<u8>, Error> {
    let (bytes, passes) = encode_with_stats(outlines, info)?;
    debug!("cff offsets stable after {passes} passes");
    Ok(bytes)
}

fn read_info(top: &Dict, string_index: &Index, font_name: String) -> Result<FontInfo, Error> {
    let defaults = FontInfo::default();
    let sid_string = |key| -> Result<Option<String>, Error> {
        top.int(key)
            .map(|sid| strings::resolve(sid as u16, string_index))
            .transpose()
    };
    Ok(FontInfo {
        font_name,
        version: sid_string(op::VERSION)?,
        notice: sid_string(op::NOTICE)?,
        copyright: sid_string(op::COPYRIGHT)?,
        full_name: sid_string(op::FULL_NAME)?,
        family_name: sid_string(op::FAMILY_NAME)?,
        weight: sid_string(op::WEIGHT)?,
        is_fixed_pitch: top.int(op::IS_FIXED_PITCH).unwrap_or(0) != 0,
        italic_angle: top.real(op::ITALIC_ANGLE).unwrap_or(0.0),
        underline_position: top
            .real(op::UNDERLINE_POSITION)
            .unwrap_or(defaults.underline_position),
        underline_thickness: top
            .real(op::UNDERLINE_THICKNESS)
            .unwrap_or(defaults.underline_thickness),
        font_matrix: top
            .array(op::FONT_MATRIX)
            .and_then(|v| v.try_into().ok())
            .unwrap_or(DEFAULT_FONT_MATRIX),
        font_bbox: top
            .array(op::FONT_BBOX)
            .and_then(|v| v.try_into().ok())
            .unwrap_or([0.0; 4]),
    })
}

fn require_offset(dict: &Dict, key: dict::Key, what: &str) -> Result<usize, Error> {
    let value = dict
        .int(key)
        .ok_or_else(|| Error::invalid("cff", format!("missing {what} entry")))?;
    usize::try_from(value).map_err(|_| Error::invalid("cff", format!("negative {what} offset")))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| *b as char).collect()
}

fn read_private_entry<'a>(
    font: FontData<'a>,
    dict: &Dict,
) -> Result<(PrivateDict, Index<'a>), Error> {
    let Some(operands) = dict.get(op::PRIVATE) else {
        return Ok((PrivateDict::default(), Index::empty()));
    };
    let [size, offset] = operands else {
        return Err(Error::invalid("cff", "malformed Private entry"));
    };
    let (size, offset) = (size.as_i32() as usize, offset.as_i32() as usize);
    let data = font
        .as_bytes()
        .get(offset..offset.saturating_add(size))
        .ok_or_else(|| Error::invalid("cff", "Private DICT out of bounds"))?;
    let pdict = Dict::parse(data)?;
    let private = PrivateDict::from_dict(&pdict)?;
    let subrs = match pdict.int(op::SUBRS) {
        Some(rel) => {
            let rel = usize::try_from(rel)
                .map_err(|_| Error::invalid("cff", "negative Subrs offset"))?;
            Index::read_from(
                font.split_off(offset + rel)
                    .ok_or_else(|| Error::invalid("cff", "Subrs offset out of bounds"))?
                    .as_bytes(),
            )?
        }
        None => Index::empty(),
    };
    Ok((private, subrs))
}

fn read_cid_structure<'a>(
    font: FontData<'a>,
    top: &Dict,
    string_index: &Index,
    num_glyphs: usize,
    ids: Vec<u16>,
) -> Result<ReadState<'a>, Error> {
    let ros_operands = top
        .get(op::ROS)
        .filter(|ops| ops.len() == 3)
        .ok_or_else(|| Error::invalid("cff", "malformed ROS entry"))?;
    let ros = Ros {
        registry: strings::resolve(ros_operands[0].as_i32() as u16, string_index)?,
        ordering: strings::resolve(ros_operands[1].as_i32() as u16, string_index)?,
        supplement: ros_operands[2].as_i32(),
    };
    let fd_array_offset = require_offset(top, op::FD_ARRAY, "FDArray")?;
    let fd_dicts = Index::read_from(
        font.split_off(fd_array_offset)
            .ok_or_else(|| Error::invalid("cff", "FDArray offset out of bounds"))?
            .as_bytes(),
    )?;
    let fd_select_offset = require_offset(top, op::FD_SELECT, "FDSelect")?;
    let fd_select = FdSelect::read(
        font.split_off(fd_select_offset)
            .ok_or_else(|| Error::invalid("cff", "FDSelect offset out of bounds"))?,
        num_glyphs,
    )?;
    let mut private = Vec::new();
    let mut font_matrices = Vec::new();
    let mut local_subrs = Vec::new();
    for fd in fd_dicts.iter() {
        let fdict = Dict::parse(fd?)?;
        let (p, subrs) = read_private_entry(font, &fdict)?;
        private.push(p);
        local_subrs.push(subrs);
        font_matrices.push(
            fdict
                .array(op::FONT_MATRIX)
                .and_then(|v| v.try_into().ok())
                .unwrap_or(IDENTITY_MATRIX),
        );
    }
    if private.is_empty() {
        return Err(Error::invalid("cff", "CID font without private dicts"));
    }
    if fd_select.max_fd() as usize >= private.len() {
        return Err(Error::invalid("cff", "FDSelect out of range"));
    }
    Ok(ReadState {
        inner: Outlines {
            glyphs: Vec::new(),
            private,
            fd_select,
            encoding: None,
            ros: Some(ros),
            gid_to_cid: ids,
            font_matrices,
        },
        names: Vec::new(),
        local_subrs: Some(local_subrs),
    })
}

fn read_simple_structure<'a>(
    font: FontData<'a>,
    top: &Dict,
    string_index: &Index,
    ids: Vec<u16>,
) -> Result<ReadState<'a>, Error> {
    let (private, subrs) = read_private_entry(font, top)?;
    let names = ids
        .iter()
        .map(|sid| strings::resolve(*sid, string_index).ok())
        .collect();
    let encoding_offset = top.int(op::ENCODING).unwrap_or(0) as usize;
    let encoding = encoding::read(font, encoding_offset, &ids)?;
    Ok(ReadState {
        inner: Outlines {
            glyphs: Vec::new(),
            private: vec![private],
            fd_select: FdSelect::Constant(0),
            encoding: Some(encoding),
            ros: None,
            gid_to_cid: Vec::new(),
            font_matrices: Vec::new(),
        },
        names,
        local_subrs: Some(vec![subrs]),
    })
}

struct ReadState<'a> {
    inner: Outlines,
    names: Vec<Option<String>>,
    local_subrs: Option<Vec<Index<'a>>>,
}

fn encode_with_stats(outlines: &Outlines, info: &FontInfo) -> Result<(Vec<u8>, usize), Error> {
    let num_glyphs = outlines.num_glyphs();
    if num_glyphs == 0 {
        return Err(Error::invalid("cff", "font has no glyphs (missing .notdef)"));
    }
    if outlines.private.is_empty() {
        return Err(Error::invalid("cff", "font has no private dict"));
    }
    let is_cid = outlines.is_cid_keyed();
    if is_cid {
        if outlines.encoding.is_some() {
            return Err(Error::invalid(
                "cff",
                "CID-keyed font must not carry an encoding",
            ));
        }
        if outlines.gid_to_cid.len() != num_glyphs {
            return Err(Error::invalid("cff", "GID to CID map length mismatch"));
        }
        if outlines.gid_to_cid[0] != 0 {
            return Err(Error::invalid("cff", "glyph 0 must map to CID 0"));
        }
    } else if outlines.private.len() != 1 {
        return Err(Error::invalid(
            "cff",
            "simple font must have exactly one private dict",
        ));
    }
    if outlines.fd_select.max_fd() as usize >= outlines.private.len() {
        return Err(Error::invalid("cff", "FDSelect out of range"));
    }

    // charstrings are offset independent; encode them first
    let mut charstrings = Vec::with_capacity(num_glyphs);
    for (gid, glyph) in outlines.glyphs.iter().enumerate() {
        let widths = outlines.private_for(GlyphId::new(gid as u16)).widths();
        charstrings.push(type2::encode_glyph(glyph, widths)?);
    }
    let charstrings_bytes = {
        let mut writer = TableWriter::new();
        index::write_index(&charstrings, &mut writer);
        writer.into_data()
    };

    // intern strings in a deterministic order: info strings, ROS, names
    let mut interner = StringInterner::new();
    let info_sids = InfoSids::intern(info, &mut interner);
    let ros_sids = outlines
        .ros
        .as_ref()
        .map(|ros| (interner.sid(&ros.registry), interner.sid(&ros.ordering)));
    let ids: Vec<u16> = if is_cid {
        outlines.gid_to_cid.clone()
    } else {
        glyph_name_sids(outlines, &mut interner)?
    };

    let charset = charset::build(&ids, !is_cid);
    let built_encoding = if is_cid {
        None
    } else {
        let encoding = outlines
            .encoding
            .clone()
            .unwrap_or_else(|| Encoding::standard(&ids));
        Some(encoding::build(&encoding, &ids))
    };

    let string_bytes = {
        let customs: Vec<&[u8]> = interner.custom_strings().collect();
        let mut writer = TableWriter::new();
        index::write_index(&customs, &mut writer);
        writer.into_data()
    };
    let name_bytes = {
        let mut writer = TableWriter::new();
        index::write_index(&[info.font_name.as_bytes()], &mut writer);
        writer.into_data()
    };
    let empty_index: [u8; 2] = [0, 0];
    let fd_select_bytes = is_cid.then(|| outlines.fd_select.encode(num_glyphs));

    // The Top DICT holds absolute offsets to later sections and each
    // Private DICT the relative offset of its local subrs, so sizes feed
    // back into offsets. Iterate until the layout stops moving.
    let mut layout = Layout::default();
    layout.private = vec![(0usize, 0usize); outlines.private.len()];
    layout.subrs_rel = vec![0usize; outlines.private.len()];
    let mut passes = 0;
    let final_layout = loop {
        passes += 1;
        if passes > MAX_OFFSET_PASSES {
            return Err(Error::invalid("cff", "offset fixpoint did not converge"));
        }
        // private dicts with this pass's subr offsets
        let private_bytes: Vec<Vec<u8>> = outlines
            .private
            .iter()
            .zip(&layout.subrs_rel)
            .map(|(private, rel)| {
                let mut d = private.to_dict();
                d.set_int(op::SUBRS, *rel as i32);
                d.encode()
            })
            .collect();
        let font_dict_bytes = is_cid.then(|| {
            let dicts: Vec<Vec<u8>> = outlines
                .private
                .iter()
                .enumerate()
                .map(|(fd, _)| {
                    let mut d = Dict::new();
                    let matrix = outlines
                        .font_matrices
                        .get(fd)
                        .copied()
                        .unwrap_or(IDENTITY_MATRIX);
                    d.set(
                        op::FONT_MATRIX,
                        matrix.iter().map(|v| dict::number_operand(*v)).collect(),
                    );
                    let (size, offset) = layout.private[fd];
                    d.set(
                        op::PRIVATE,
                        vec![Operand::Int(size as i32), Operand::Int(offset as i32)],
                    );
                    d.encode()
                })
                .collect();
            let mut writer = TableWriter::new();
            index::write_index(&dicts, &mut writer);
            writer.into_data()
        });
        let top_bytes = {
            let top = build_top_dict(
                outlines,
                info,
                &info_sids,
                ros_sids,
                &charset,
                built_encoding.as_ref(),
                &layout,
            );
            let mut writer = TableWriter::new();
            index::write_index(&[top.encode_priority(&[op::ROS])], &mut writer);
            writer.into_data()
        };

        // lay the sections out in writing order
        let mut next = Layout::default();
        let mut pos = 4 + name_bytes.len() + top_bytes.len() + string_bytes.len();
        pos += empty_index.len(); // global subrs
        if let Some(encoding::BuiltEncoding::Custom(data)) = built_encoding.as_ref() {
            next.encoding = pos;
            pos += data.len();
        }
        if let charset::Charset::Custom(data) = &charset {
            next.charset = pos;
            pos += data.len();
        }
        if let Some(data) = fd_select_bytes.as_ref() {
            next.fd_select = pos;
            pos += data.len();
        }
        next.charstrings = pos;
        pos += charstrings_bytes.len();
        if let Some(data) = font_dict_bytes.as_ref() {
            next.fd_array = pos;
            pos += data.len();
        }
        next.private = private_bytes
            .iter()
            .map(|bytes| {
                let entry = (bytes.len(), pos);
                pos += bytes.len();
                entry
            })
            .collect();
        // local subrs follow the private dicts, one empty index each
        next.subrs_rel = next
            .private
            .iter()
            .enumerate()
            .map(|(fd, (_, offset))| pos + fd * empty_index.len() - offset)
            .collect();
        if next == layout {
            break FinalLayout {
                top_bytes,
                private_bytes,
                font_dict_bytes,
            };
        }
        layout = next;
    };

    // assemble
    let mut out = TableWriter::new();
    let total_guess = layout.subrs_rel.len() * 2
        + layout
            .private
            .last()
            .map(|(size, offset)| size + offset)
            .unwrap_or_default();
    let off_size = match total_guess {
        0..=0xFF => 1u8,
        0x100..=0xFFFF => 2,
        0x10000..=0xFFFFFF => 3,
        _ => 4,
    };
    out.extend(&[1, 0, 4, off_size]);
    out.extend(&name_bytes);
    out.extend(&final_layout.top_bytes);
    out.extend(&string_bytes);
    out.extend(&empty_index);
    if let Some(encoding::BuiltEncoding::Custom(data)) = built_encoding.as_ref() {
        out.extend(data);
    }
    if let charset::Charset::Custom(data) = &charset {
        out.extend(data);
    }
    if let Some(data) = fd_select_bytes.as_ref() {
        out.extend(data);
    }
    out.extend(&charstrings_bytes);
    if let Some(data) = final_layout.font_dict_bytes.as_ref() {
        out.extend(data);
    }
    for bytes in &final_layout.private_bytes {
        out.extend(bytes);
    }
    for _ in &final_layout.private_bytes {
        out.extend(&empty_index);
    }
    Ok((out.into_data(), passes))
}

#[derive(Clone, PartialEq, Default, Debug)]
struct Layout {
    encoding: usize,
    charset: usize,
    fd_select: usize,
    charstrings: usize,
    fd_array: usize,
    /// `(size, absolute offset)` per private dict.
    private: Vec<(usize, usize)>,
    /// Local subr offset relative to each private dict start.
    subrs_rel: Vec<usize>,
}

struct FinalLayout {
    top_bytes: Vec<u8>,
    private_bytes: Vec<Vec<u8>>,
    font_dict_bytes: Option<Vec<u8>>,
}

struct InfoSids {
    version: Option<u16>,
    notice: Option<u16>,
    copyright: Option<u16>,
    full_name: Option<u16>,
    family_name: Option<u16>,
    weight: Option<u16>,
}

impl InfoSids {
    fn intern(info: &FontInfo, interner: &mut StringInterner) -> Self {
        let mut sid = |s: &Option<String>| s.as_deref().map(|s| interner.sid(s));
        Self {
            version: sid(&info.version),
            notice: sid(&info.notice),
            copyright: sid(&info.copyright),
            full_name: sid(&info.full_name),
            family_name: sid(&info.family_name),
            weight: sid(&info.weight),
        }
    }
}

/// Produces the glyph name SIDs of a simple font, synthesizing missing
/// names first.
fn glyph_name_sids(
    outlines: &Outlines,
    interner: &mut StringInterner,
) -> Result<Vec<u16>, Error> {
    let mut names: Vec<Option<String>> =
        outlines.glyphs.iter().map(|g| g.name.clone()).collect();
    names::assign_names(&mut names, None);
    let mut seen = std::collections::HashSet::new();
    let mut sids = Vec::with_capacity(names.len());
    for name in &names {
        let name = name.as_deref().expect("assign_names fills every slot");
        if !seen.insert(name.to_string()) {
            return Err(Error::invalid(
                "cff",
                format!("duplicate glyph name '{name}'"),
            ));
        }
        sids.push(interner.sid(name));
    }
    Ok(sids)
}

fn build_top_dict(
    outlines: &Outlines,
    info: &FontInfo,
    info_sids: &InfoSids,
    ros_sids: Option<(u16, u16)>,
    charset: &charset::Charset,
    built_encoding: Option<&encoding::BuiltEncoding>,
    layout: &Layout,
) -> Dict {
    let mut top = Dict::new();
    let mut set_sid = |top: &mut Dict, key, sid: Option<u16>| {
        if let Some(sid) = sid {
            top.set(key, vec![Operand::Sid(sid)]);
        }
    };
    set_sid(&mut top, op::VERSION, info_sids.version);
    set_sid(&mut top, op::NOTICE, info_sids.notice);
    set_sid(&mut top, op::COPYRIGHT, info_sids.copyright);
    set_sid(&mut top, op::FULL_NAME, info_sids.full_name);
    set_sid(&mut top, op::FAMILY_NAME, info_sids.family_name);
    set_sid(&mut top, op::WEIGHT, info_sids.weight);
    if info.is_fixed_pitch {
        top.set_int(op::IS_FIXED_PITCH, 1);
    }
    if info.italic_angle != 0.0 {
        top.set(
            op::ITALIC_ANGLE,
            vec![dict::number_operand(info.italic_angle)],
        );
    }
    if info.underline_position != -100.0 {
        top.set(
            op::UNDERLINE_POSITION,
            vec![dict::number_operand(info.underline_position)],
        );
    }
    if info.underline_thickness != 50.0 {
        top.set(
            op::UNDERLINE_THICKNESS,
            vec![dict::number_operand(info.underline_thickness)],
        );
    }
    if info.font_bbox != [0.0; 4] {
        top.set(
            op::FONT_BBOX,
            info.font_bbox
                .iter()
                .map(|v| dict::number_operand(*v))
                .collect(),
        );
    }
    if let Some((registry, ordering)) = ros_sids {
        let supplement = outlines.ros.as_ref().map(|r| r.supplement).unwrap_or(0);
        top.set(
            op::ROS,
            vec![
                Operand::Sid(registry),
                Operand::Sid(ordering),
                Operand::Int(supplement),
            ],
        );
        let cid_count = outlines
            .gid_to_cid
            .iter()
            .copied()
            .max()
            .unwrap_or_default() as i32
            + 1;
        top.set_int(op::CID_COUNT, cid_count);
        top.set_int(op::FD_ARRAY, layout.fd_array as i32);
        top.set_int(op::FD_SELECT, layout.fd_select as i32);
    } else {
        // the top-level matrix is only written for simple fonts; CID-keyed
        // fonts carry per-subfont matrices in the Font DICTs
        if info.font_matrix != DEFAULT_FONT_MATRIX {
            top.set(
                op::FONT_MATRIX,
                info.font_matrix
                    .iter()
                    .map(|v| dict::number_operand(*v))
                    .collect(),
            );
        }
        let (size, offset) = layout.private.first().copied().unwrap_or_default();
        top.set(
            op::PRIVATE,
            vec![Operand::Int(size as i32), Operand::Int(offset as i32)],
        );
    }
    match charset {
        charset::Charset::Predefined(0) => {}
        charset::Charset::Predefined(operand) => top.set_int(op::CHARSET, *operand as i32),
        charset::Charset::Custom(_) => top.set_int(op::CHARSET, layout.charset as i32),
    }
    match built_encoding {
        None | Some(encoding::BuiltEncoding::Predefined(0)) => {}
        Some(encoding::BuiltEncoding::Predefined(operand)) => {
            top.set_int(op::ENCODING, *operand as i32)
        }
        Some(encoding::BuiltEncoding::Custom(_)) => {
            top.set_int(op::ENCODING, layout.encoding as i32)
        }
    }
    top.set_int(op::CHARSTRINGS, layout.charstrings as i32);
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::Stem;
    use outline_types::Fixed;
    use pretty_assertions::assert_eq;

    fn notdef() -> Glyph {
        Glyph::new(".notdef")
    }

    fn letter(name: &str, x: f64) -> Glyph {
        let mut glyph = Glyph::new(name);
        glyph.move_to(x, 0.0);
        glyph.line_to(x + 60.0, 0.0);
        glyph.line_to(x + 60.0, 700.0);
        glyph.line_to(x, 700.0);
        glyph.width = Fixed::from_i32(600);
        glyph
    }

    fn simple_font() -> (Outlines, FontInfo) {
        let mut outlines = Outlines::new();
        outlines.private[0].default_width_x = 500.0;
        outlines.private[0].nominal_width_x = 550.0;
        outlines.private[0].blue_values = vec![-15.0, 0.0, 700.0, 715.0];
        outlines.push(notdef());
        let mut a = letter("A", 40.0);
        a.hstems.push(Stem::new(Fixed::ZERO, Fixed::from_i32(20)));
        outlines.push(a);
        outlines.push(letter("B", 50.0));
        let mut encoding = Encoding::new();
        encoding.set(b'A', GlyphId::new(1));
        encoding.set(b'B', GlyphId::new(2));
        outlines.encoding = Some(encoding);
        let info = FontInfo {
            font_name: "Test-Regular".to_string(),
            version: Some("001.000".to_string()),
            notice: Some("for testing".to_string()),
            weight: Some("Regular".to_string()),
            font_bbox: [0.0, 0.0, 600.0, 700.0],
            ..Default::default()
        };
        (outlines, info)
    }

    fn cid_font() -> (Outlines, FontInfo) {
        let mut outlines = Outlines::new();
        outlines.encoding = None;
        outlines.ros = Some(Ros {
            registry: "Adobe".to_string(),
            ordering: "Identity".to_string(),
            supplement: 0,
        });
        outlines.private = vec![
            PrivateDict {
                default_width_x: 1000.0,
                ..Default::default()
            },
            PrivateDict {
                default_width_x: 500.0,
                std_vw: Some(80.0),
                ..Default::default()
            },
        ];
        outlines.font_matrices = vec![IDENTITY_MATRIX, DEFAULT_FONT_MATRIX];
        outlines.fd_select = FdSelect::Table(vec![0, 1, 1]);
        let mut g0 = Glyph::default();
        g0.width = Fixed::from_i32(1000);
        outlines.push(g0);
        let mut g1 = letter("", 10.0);
        g1.name = None;
        g1.width = Fixed::from_i32(500);
        outlines.push(g1);
        let mut g2 = letter("", 20.0);
        g2.name = None;
        g2.width = Fixed::from_i32(620);
        outlines.push(g2);
        outlines.gid_to_cid = vec![0, 17, 42];
        let info = FontInfo {
            font_name: "TestCID".to_string(),
            ..Default::default()
        };
        (outlines, info)
    }

    #[test]
    fn simple_round_trip() {
        let (outlines, info) = simple_font();
        let bytes = encode(&outlines, &info).unwrap();
        let (read_back, read_info) = read(&bytes).unwrap();
        assert_eq!(read_back, outlines);
        assert_eq!(read_info, info);
    }

    #[test]
    fn simple_round_trip_is_byte_stable() {
        let (outlines, info) = simple_font();
        let first = encode(&outlines, &info).unwrap();
        let (decoded, decoded_info) = read(&first).unwrap();
        let second = encode(&decoded, &decoded_info).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cid_round_trip() {
        let (outlines, info) = cid_font();
        let bytes = encode(&outlines, &info).unwrap();
        let (read_back, read_info) = read(&bytes).unwrap();
        assert_eq!(read_back, outlines);
        assert_eq!(read_info.font_name, info.font_name);
        // every glyph still resolves to a private dict in range
        for gid in 0..read_back.num_glyphs() {
            let fd = read_back.fd_select.font_index(GlyphId::new(gid as u16));
            assert!((fd as usize) < read_back.private.len());
        }
    }

    #[test]
    fn cid_round_trip_is_byte_stable() {
        let (outlines, info) = cid_font();
        let first = encode(&outlines, &info).unwrap();
        let (decoded, decoded_info) = read(&first).unwrap();
        let second = encode(&decoded, &decoded_info).unwrap();
        assert_eq!(first, second);
    }

    // Offsets move DICT operands to wider encodings as sections grow; the
    // layout must settle within a few passes even when the first guess is
    // off by an operand width.
    #[test]
    fn offset_fixpoint_converges_quickly() {
        let (mut outlines, info) = simple_font();
        for i in 0..80 {
            let mut glyph = letter("", 10.0 + i as f64);
            glyph.name = None;
            glyph.curve_to(200.0, 300.0, 400.0, 500.0, 600.0, 10.0 + i as f64);
            outlines.push(glyph);
        }
        let (bytes, passes) = encode_with_stats(&outlines, &info).unwrap();
        assert!(passes <= 3, "took {passes} passes");
        let (read_back, _) = read(&bytes).unwrap();
        assert_eq!(read_back.num_glyphs(), outlines.num_glyphs());
    }

    #[test]
    fn missing_notdef_is_invalid() {
        let outlines = Outlines::new();
        let err = encode(&outlines, &FontInfo::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidFont { table: "cff", .. }));
    }

    #[test]
    fn unknown_major_version_is_unsupported() {
        let (outlines, info) = simple_font();
        let mut bytes = encode(&outlines, &info).unwrap();
        bytes[0] = 2;
        assert!(matches!(read(&bytes), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn truncated_font_is_invalid() {
        let (outlines, info) = simple_font();
        let bytes = encode(&outlines, &info).unwrap();
        assert!(read(&bytes[..20]).is_err());
    }

    #[test]
    fn fd_select_out_of_range_is_invalid() {
        let (mut outlines, info) = cid_font();
        outlines.fd_select = FdSelect::Table(vec![0, 1, 9]);
        let err = encode(&outlines, &info).unwrap_err();
        assert!(matches!(err, Error::InvalidFont { .. }));
    }

    #[test]
    fn cid_map_must_anchor_notdef() {
        let (mut outlines, info) = cid_font();
        outlines.gid_to_cid[0] = 5;
        assert!(encode(&outlines, &info).is_err());
    }

    #[test]
    fn glyph_path_applies_matrix() {
        use kurbo::Shape;
        let (outlines, _) = simple_font();
        let path = outlines.glyph_path(GlyphId::new(1), &Affine::scale(2.0));
        let bbox = path.bounding_box();
        assert_eq!(bbox.max_y(), 1400.0);
        // missing glyphs produce an empty path
        assert!(outlines
            .glyph_path(GlyphId::new(99), &Affine::IDENTITY)
            .elements()
            .is_empty());
    }

    #[test]
    fn write_reports_io_errors() {
        struct Failing;
        impl io::Write for Failing {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "sink closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let (outlines, info) = simple_font();
        let err = write(&outlines, &info, &mut Failing).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
