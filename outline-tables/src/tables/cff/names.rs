//! Glyph name validation and synthesis.
//!
//! Converting a CID-keyed font to a simple one (and writing any simple font
//! with incomplete names) needs a full set of unique PostScript names.
//! Existing valid names are kept; glyphs with caller-supplied text get
//! Unicode-derived names; the rest are numbered ornaments.

use log::warn;

/// Longest allowed glyph name.
pub const MAX_NAME_LEN: usize = 63;

/// Returns true for a usable PostScript glyph name.
///
/// Names are ASCII, at most 63 characters, avoid the PostScript delimiter
/// characters and do not start with a digit.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_graphic() && !"()[]{}<>/%".contains(c))
}

/// The Adobe convention for naming a glyph after a character it renders.
fn unicode_name(ch: char) -> String {
    let code = ch as u32;
    if code <= 0xFFFF {
        format!("uni{code:04X}")
    } else {
        format!("u{code:X}")
    }
}

/// Assigns a unique name to every glyph.
///
/// `names[0]` is forced to `.notdef`. Existing names are kept when they are
/// valid and unique; otherwise a name is synthesized from the matching entry
/// of `texts` (the text the glyph renders), with an `.altN` suffix on
/// collision, and any remaining glyph receives a sequential `ornNNN` name.
pub fn assign_names(names: &mut [Option<String>], texts: Option<&[String]>) {
    let mut used = std::collections::HashSet::new();
    if !names.is_empty() {
        names[0] = Some(".notdef".to_string());
        used.insert(".notdef".to_string());
    }
    // first pass: keep valid, unique names
    for name in names.iter_mut().skip(1) {
        let keep = match name.as_deref() {
            Some(candidate) => {
                is_valid_name(candidate)
                    && candidate != ".notdef"
                    && !used.contains(candidate)
            }
            None => false,
        };
        if keep {
            used.insert(name.clone().unwrap());
        } else {
            *name = None;
        }
    }
    // second pass: derive names from text
    if let Some(texts) = texts {
        for (gid, name) in names.iter_mut().enumerate().skip(1) {
            if name.is_some() {
                continue;
            }
            let Some(text) = texts.get(gid).filter(|t| !t.is_empty()) else {
                continue;
            };
            let base = text.chars().map(unicode_name).collect::<Vec<_>>().join("_");
            if !is_valid_name(&base) {
                warn!("glyph {gid}: derived name exceeds name rules, skipping");
                continue;
            }
            let mut candidate = base.clone();
            let mut alt = 0;
            while used.contains(&candidate) {
                alt += 1;
                candidate = format!("{base}.alt{alt}");
                if candidate.len() > MAX_NAME_LEN {
                    warn!("glyph {gid}: alternate name overflows, skipping");
                    break;
                }
            }
            if candidate.len() <= MAX_NAME_LEN && !used.contains(&candidate) {
                used.insert(candidate.clone());
                *name = Some(candidate);
            }
        }
    }
    // final pass: numbered ornaments
    let mut next = 1;
    for name in names.iter_mut().skip(1) {
        if name.is_some() {
            continue;
        }
        let mut candidate = format!("orn{next:03}");
        while used.contains(&candidate) {
            next += 1;
            candidate = format!("orn{next:03}");
        }
        used.insert(candidate.clone());
        *name = Some(candidate);
        next += 1;
    }
}
