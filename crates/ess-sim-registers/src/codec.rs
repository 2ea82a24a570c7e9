//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Fixed register map and word codec for telemetry transmission."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use serde::Serialize;

use crate::map::Encoding;

/// Split an IEEE-754 single into two registers, low half first.
pub fn float_to_words(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [bits as u16, (bits >> 16) as u16]
}

/// Reassemble a single from two registers written by [`float_to_words`].
pub fn words_to_float(words: [u16; 2]) -> f32 {
    f32::from_bits(u32::from(words[0]) | (u32::from(words[1]) << 16))
}

/// Value carried by one register field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum RegisterValue {
    /// Two-word float.
    Float(f32),
    /// Single word.
    Word(u16),
}

impl RegisterValue {
    /// Encoding this value is written with.
    pub fn encoding(&self) -> Encoding {
        match self {
            RegisterValue::Float(_) => Encoding::Float32,
            RegisterValue::Word(_) => Encoding::Word,
        }
    }

    /// Wire words for this value.
    pub fn to_words(&self) -> Vec<u16> {
        match *self {
            RegisterValue::Float(value) => float_to_words(value).to_vec(),
            RegisterValue::Word(word) => vec![word],
        }
    }

    /// Decode words read back from a register image.
    pub fn from_words(encoding: Encoding, words: &[u16]) -> Option<Self> {
        match (encoding, words) {
            (Encoding::Float32, [low, high, ..]) => {
                Some(RegisterValue::Float(words_to_float([*low, *high])))
            }
            (Encoding::Word, [word, ..]) => Some(RegisterValue::Word(*word)),
            _ => None,
        }
    }

    /// Float payload, if this is a float field.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            RegisterValue::Float(value) => Some(value),
            RegisterValue::Word(_) => None,
        }
    }

    /// Word payload, if this is a single-word field.
    pub fn as_word(&self) -> Option<u16> {
        match *self {
            RegisterValue::Word(word) => Some(word),
            RegisterValue::Float(_) => None,
        }
    }
}

/// One register operation destined for the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegisterWrite {
    /// Field label, used for logging.
    pub field: &'static str,
    /// Start address of the field.
    pub address: u16,
    /// Value to write.
    pub value: RegisterValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_round_trip_is_bit_exact() {
        for value in [0.0f32, -1.0, 123.456, f32::MAX, f32::MIN, f32::MIN_POSITIVE, -0.0] {
            let restored = words_to_float(float_to_words(value));
            assert_eq!(restored.to_bits(), value.to_bits(), "value {value}");
        }
    }

    #[test]
    fn low_half_is_written_first() {
        // 1.0f32 is 0x3F80_0000.
        assert_eq!(float_to_words(1.0), [0x0000, 0x3F80]);
        assert_eq!(float_to_words(-2.5), [0x0000, 0xC020]);
    }

    #[test]
    fn words_decode_by_encoding() {
        let value = RegisterValue::from_words(Encoding::Float32, &[0x0000, 0x3F80]);
        assert_eq!(value, Some(RegisterValue::Float(1.0)));
        assert_eq!(
            RegisterValue::from_words(Encoding::Word, &[7]),
            Some(RegisterValue::Word(7))
        );
        assert_eq!(RegisterValue::from_words(Encoding::Float32, &[1]), None);
    }
}
