//! Subsetting and conversion between simple and CID-keyed fonts.

use std::collections::HashMap;

use log::debug;
use outline_types::GlyphId;

use crate::tables::cff::{
    self, names, strings::StringInterner, Encoding, FdSelect, Ros, IDENTITY_MATRIX,
};
use crate::tables::glyf::{self, Glyph as TtGlyph};
use crate::Error;

impl cff::Outlines {
    /// Builds a new font containing `gids` in the given order.
    ///
    /// `gids[0]` must be glyph 0. Private dictionaries that remain
    /// referenced are deduplicated in first-occurrence order and the glyph
    /// to dictionary mapping is renumbered accordingly; the encoding and
    /// CID map are carried onto the new glyph ids.
    pub fn subset(&self, gids: &[GlyphId]) -> Result<cff::Outlines, Error> {
        if gids.first() != Some(&GlyphId::NOTDEF) {
            return Err(Error::invalid("cff", "subset must keep glyph 0 first"));
        }
        for gid in gids {
            if gid.to_usize() >= self.glyphs.len() {
                return Err(Error::invalid(
                    "cff",
                    format!("subset references missing glyph {gid}"),
                ));
            }
        }
        let is_cid = self.is_cid_keyed();
        let mut fd_map: Vec<Option<u8>> = vec![None; self.private.len()];
        let mut private = Vec::new();
        let mut font_matrices = Vec::new();
        let mut fds = Vec::with_capacity(gids.len());
        for gid in gids {
            let old_fd = self.fd_select.font_index(*gid) as usize;
            let old_fd = old_fd.min(self.private.len() - 1);
            let new_fd = match fd_map[old_fd] {
                Some(fd) => fd,
                None => {
                    let dict = &self.private[old_fd];
                    let matrix = self
                        .font_matrices
                        .get(old_fd)
                        .copied()
                        .unwrap_or(IDENTITY_MATRIX);
                    // identical dictionaries collapse to one entry
                    let fd = match private
                        .iter()
                        .zip(&font_matrices)
                        .position(|(d, m)| d == dict && *m == matrix)
                    {
                        Some(existing) => existing as u8,
                        None => {
                            private.push(dict.clone());
                            font_matrices.push(matrix);
                            private.len() as u8 - 1
                        }
                    };
                    fd_map[old_fd] = Some(fd);
                    fd
                }
            };
            fds.push(new_fd);
        }
        let fd_select = if private.len() == 1 {
            FdSelect::Constant(0)
        } else {
            FdSelect::Table(fds)
        };
        let mut gid_map = HashMap::new();
        for (new, old) in gids.iter().enumerate() {
            gid_map.entry(*old).or_insert(GlyphId::new(new as u16));
        }
        let encoding = self
            .encoding
            .as_ref()
            .map(|encoding| encoding.remap(|gid| gid_map.get(&gid).copied()));
        let gid_to_cid = if is_cid {
            gids.iter()
                .map(|gid| self.gid_to_cid.get(gid.to_usize()).copied().unwrap_or(0))
                .collect()
        } else {
            Vec::new()
        };
        debug!(
            "subset kept {} of {} glyphs, {} of {} private dicts",
            gids.len(),
            self.glyphs.len(),
            private.len(),
            self.private.len()
        );
        Ok(cff::Outlines {
            glyphs: gids
                .iter()
                .map(|gid| self.glyphs[gid.to_usize()].clone())
                .collect(),
            private,
            fd_select,
            encoding,
            ros: self.ros.clone(),
            gid_to_cid,
            font_matrices: if is_cid { font_matrices } else { Vec::new() },
        })
    }

    /// Converts the font to CID-keyed form.
    ///
    /// Drops the encoding and glyph names, installs the given character
    /// collection and CID map, and pads the matrix list to cover every
    /// private dictionary.
    pub fn make_cid_keyed(&mut self, ros: Ros, gid_to_cid: Vec<u16>) {
        self.encoding = None;
        for glyph in &mut self.glyphs {
            glyph.name = None;
        }
        self.ros = Some(ros);
        let mut map = gid_to_cid;
        map.resize(self.glyphs.len(), 0);
        if !map.is_empty() {
            map[0] = 0;
        }
        self.gid_to_cid = map;
        while self.font_matrices.len() < self.private.len() {
            self.font_matrices.push(IDENTITY_MATRIX);
        }
    }

    /// Converts the font to simple form.
    ///
    /// Drops the CID structures, runs the naming procedure (using the
    /// per-glyph `glyph_text` hints when given) and installs the Standard
    /// Encoding computed from the resulting names.
    pub fn make_simple(&mut self, glyph_text: Option<&[String]>) {
        self.ros = None;
        self.gid_to_cid.clear();
        self.font_matrices.clear();
        if self.private.len() > 1 {
            // a simple font carries a single private dict; keep the first
            self.private.truncate(1);
        }
        self.fd_select = FdSelect::Constant(0);
        let mut glyph_names: Vec<Option<String>> =
            self.glyphs.iter().map(|glyph| glyph.name.clone()).collect();
        names::assign_names(&mut glyph_names, glyph_text);
        let mut interner = StringInterner::new();
        let sids: Vec<u16> = glyph_names
            .iter()
            .map(|name| interner.sid(name.as_deref().unwrap_or_default()))
            .collect();
        for (glyph, name) in self.glyphs.iter_mut().zip(glyph_names) {
            glyph.name = name;
        }
        self.encoding = Some(Encoding::standard(&sids));
    }
}

impl glyf::Outlines {
    /// Builds a new glyph set containing `gids` in the given order.
    ///
    /// Component references are transitively closed: every child glyph a
    /// kept composite refers to is appended in discovery order, and the
    /// component ids are rewritten through the old to new mapping.
    pub fn subset(&self, gids: &[GlyphId]) -> Result<glyf::Outlines, Error> {
        if gids.first() != Some(&GlyphId::NOTDEF) {
            return Err(Error::invalid("glyf", "subset must keep glyph 0 first"));
        }
        for gid in gids {
            if gid.to_usize() >= self.glyphs.len() {
                return Err(Error::invalid(
                    "glyf",
                    format!("subset references missing glyph {gid}"),
                ));
            }
        }
        let mut gid_map = HashMap::new();
        let mut order: Vec<GlyphId> = Vec::with_capacity(gids.len());
        for gid in gids {
            if !gid_map.contains_key(gid) {
                gid_map.insert(*gid, GlyphId::new(order.len() as u16));
                order.push(*gid);
            }
        }
        let mut next = 0;
        while next < order.len() {
            let old = order[next];
            next += 1;
            let TtGlyph::Composite(composite) = &self.glyphs[old.to_usize()] else {
                continue;
            };
            for component in &composite.components {
                let child = component.glyph;
                if child.to_usize() >= self.glyphs.len() {
                    return Err(Error::invalid(
                        "glyf",
                        format!("component references missing glyph {child}"),
                    ));
                }
                if !gid_map.contains_key(&child) {
                    gid_map.insert(child, GlyphId::new(order.len() as u16));
                    order.push(child);
                }
            }
        }
        let glyphs = order
            .iter()
            .map(|old| {
                let mut glyph = self.glyphs[old.to_usize()].clone();
                if let TtGlyph::Composite(composite) = &mut glyph {
                    for component in &mut composite.components {
                        component.glyph = gid_map[&component.glyph];
                    }
                }
                glyph
            })
            .collect();
        debug!(
            "glyf subset kept {} glyphs ({} requested)",
            order.len(),
            gids.len()
        );
        let advances = if self.advances.is_empty() {
            Vec::new()
        } else {
            order
                .iter()
                .map(|old| self.advances.get(old.to_usize()).copied().unwrap_or(0))
                .collect()
        };
        let names = self.names.as_ref().map(|names| {
            order
                .iter()
                .map(|old| names.get(old.to_usize()).cloned().unwrap_or_default())
                .collect()
        });
        Ok(glyf::Outlines {
            glyphs,
            advances,
            names,
            hint_tables: self.hint_tables.clone(),
        })
    }
}
