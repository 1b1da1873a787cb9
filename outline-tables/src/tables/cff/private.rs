//! Private dictionaries: per-subfont rendering hints.

use outline_types::Fixed;

use super::dict::{self, op, Dict};
use crate::tables::type2::Widths;
use crate::Error;

/// A CFF Private DICT.
///
/// Blue and stem snap arrays are carried as `f64` so fractional values
/// round-trip; the encoder falls back to integer operands whenever a value
/// is integral.
#[derive(Clone, PartialEq, Debug)]
pub struct PrivateDict {
    pub blue_values: Vec<f64>,
    pub other_blues: Vec<f64>,
    pub family_blues: Vec<f64>,
    pub family_other_blues: Vec<f64>,
    pub blue_scale: f64,
    pub blue_shift: f64,
    pub blue_fuzz: f64,
    pub std_hw: Option<f64>,
    pub std_vw: Option<f64>,
    pub stem_snap_h: Vec<f64>,
    pub stem_snap_v: Vec<f64>,
    pub force_bold: bool,
    pub language_group: i32,
    pub expansion_factor: f64,
    pub initial_random_seed: i32,
    pub default_width_x: f64,
    pub nominal_width_x: f64,
}

impl Default for PrivateDict {
    fn default() -> Self {
        Self {
            blue_values: Vec::new(),
            other_blues: Vec::new(),
            family_blues: Vec::new(),
            family_other_blues: Vec::new(),
            blue_scale: 0.039625,
            blue_shift: 7.0,
            blue_fuzz: 1.0,
            std_hw: None,
            std_vw: None,
            stem_snap_h: Vec::new(),
            stem_snap_v: Vec::new(),
            force_bold: false,
            language_group: 0,
            expansion_factor: 0.06,
            initial_random_seed: 0,
            default_width_x: 0.0,
            nominal_width_x: 0.0,
        }
    }
}

impl PrivateDict {
    /// The widths the charstring codec needs.
    pub fn widths(&self) -> Widths {
        Widths {
            default: Fixed::from_f64(self.default_width_x),
            nominal: Fixed::from_f64(self.nominal_width_x),
        }
    }

    pub fn from_dict(dict: &Dict) -> Result<Self, Error> {
        let defaults = Self::default();
        Ok(Self {
            blue_values: dict.delta(op::BLUE_VALUES).unwrap_or_default(),
            other_blues: dict.delta(op::OTHER_BLUES).unwrap_or_default(),
            family_blues: dict.delta(op::FAMILY_BLUES).unwrap_or_default(),
            family_other_blues: dict.delta(op::FAMILY_OTHER_BLUES).unwrap_or_default(),
            blue_scale: dict.real(op::BLUE_SCALE).unwrap_or(defaults.blue_scale),
            blue_shift: dict.real(op::BLUE_SHIFT).unwrap_or(defaults.blue_shift),
            blue_fuzz: dict.real(op::BLUE_FUZZ).unwrap_or(defaults.blue_fuzz),
            std_hw: dict.real(op::STD_HW),
            std_vw: dict.real(op::STD_VW),
            stem_snap_h: dict.delta(op::STEM_SNAP_H).unwrap_or_default(),
            stem_snap_v: dict.delta(op::STEM_SNAP_V).unwrap_or_default(),
            force_bold: dict.int(op::FORCE_BOLD).unwrap_or(0) != 0,
            language_group: dict.int(op::LANGUAGE_GROUP).unwrap_or(0),
            expansion_factor: dict
                .real(op::EXPANSION_FACTOR)
                .unwrap_or(defaults.expansion_factor),
            initial_random_seed: dict.int(op::INITIAL_RANDOM_SEED).unwrap_or(0),
            default_width_x: dict.real(op::DEFAULT_WIDTH_X).unwrap_or(0.0),
            nominal_width_x: dict.real(op::NOMINAL_WIDTH_X).unwrap_or(0.0),
        })
    }

    /// Builds the DICT form, omitting entries equal to their defaults.
    /// The local Subrs offset, if any, is appended by the container writer.
    pub fn to_dict(&self) -> Dict {
        let defaults = Self::default();
        let mut dict = Dict::new();
        if !self.blue_values.is_empty() {
            dict.set_delta(op::BLUE_VALUES, &self.blue_values);
        }
        if !self.other_blues.is_empty() {
            dict.set_delta(op::OTHER_BLUES, &self.other_blues);
        }
        if !self.family_blues.is_empty() {
            dict.set_delta(op::FAMILY_BLUES, &self.family_blues);
        }
        if !self.family_other_blues.is_empty() {
            dict.set_delta(op::FAMILY_OTHER_BLUES, &self.family_other_blues);
        }
        if self.blue_scale != defaults.blue_scale {
            dict.set(op::BLUE_SCALE, vec![dict::number_operand(self.blue_scale)]);
        }
        if self.blue_shift != defaults.blue_shift {
            dict.set(op::BLUE_SHIFT, vec![dict::number_operand(self.blue_shift)]);
        }
        if self.blue_fuzz != defaults.blue_fuzz {
            dict.set(op::BLUE_FUZZ, vec![dict::number_operand(self.blue_fuzz)]);
        }
        if let Some(std_hw) = self.std_hw {
            dict.set(op::STD_HW, vec![dict::number_operand(std_hw)]);
        }
        if let Some(std_vw) = self.std_vw {
            dict.set(op::STD_VW, vec![dict::number_operand(std_vw)]);
        }
        if !self.stem_snap_h.is_empty() {
            dict.set_delta(op::STEM_SNAP_H, &self.stem_snap_h);
        }
        if !self.stem_snap_v.is_empty() {
            dict.set_delta(op::STEM_SNAP_V, &self.stem_snap_v);
        }
        if self.force_bold {
            dict.set_int(op::FORCE_BOLD, 1);
        }
        if self.language_group != 0 {
            dict.set_int(op::LANGUAGE_GROUP, self.language_group);
        }
        if self.expansion_factor != defaults.expansion_factor {
            dict.set(
                op::EXPANSION_FACTOR,
                vec![dict::number_operand(self.expansion_factor)],
            );
        }
        if self.initial_random_seed != 0 {
            dict.set_int(op::INITIAL_RANDOM_SEED, self.initial_random_seed);
        }
        if self.default_width_x != 0.0 {
            dict.set(
                op::DEFAULT_WIDTH_X,
                vec![dict::number_operand(self.default_width_x)],
            );
        }
        if self.nominal_width_x != 0.0 {
            dict.set(
                op::NOMINAL_WIDTH_X,
                vec![dict::number_operand(self.nominal_width_x)],
            );
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_encode_to_an_empty_dict() {
        let private = PrivateDict::default();
        assert!(private.to_dict().encode().is_empty());
    }

    #[test]
    fn round_trip() {
        let private = PrivateDict {
            blue_values: vec![-15.0, 0.0, 500.0, 515.0, 700.0, 720.0],
            other_blues: vec![-250.0, -240.0],
            blue_scale: 0.0425,
            std_hw: Some(60.0),
            std_vw: Some(85.5),
            stem_snap_h: vec![60.0, 64.0],
            force_bold: true,
            language_group: 1,
            default_width_x: 450.0,
            nominal_width_x: 600.0,
            ..Default::default()
        };
        let dict = private.to_dict();
        let parsed = Dict::parse(&dict.encode()).unwrap();
        let read_back = PrivateDict::from_dict(&parsed).unwrap();
        assert_eq!(read_back, private);
    }

    #[test]
    fn fractional_blues_round_trip() {
        let private = PrivateDict {
            blue_values: vec![-12.5, 0.25],
            ..Default::default()
        };
        let parsed = Dict::parse(&private.to_dict().encode()).unwrap();
        assert_eq!(
            PrivateDict::from_dict(&parsed).unwrap().blue_values,
            private.blue_values
        );
    }

    #[test]
    fn widths_feed_the_charstring_codec() {
        let private = PrivateDict {
            default_width_x: 500.0,
            nominal_width_x: 512.0,
            ..Default::default()
        };
        let widths = private.widths();
        assert_eq!(widths.default, Fixed::from_i32(500));
        assert_eq!(widths.nominal, Fixed::from_i32(512));
    }
}
