//! Common Types for DVB-S2 Physical Layer Signalling
//!
//! Defines the PLS code and the MODCOD table according to ETSI EN 302 307

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normal FECFRAME size in bits
pub const NORMAL_FECFRAME_BITS: u32 = 64_800;

/// Short FECFRAME size in bits
pub const SHORT_FECFRAME_BITS: u32 = 16_200;

bitflags! {
    /// TYPE field of the PLS code (two LSBs of the PLSC)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PlscType: u8 {
        /// Short FECFRAME (16200 bits)
        const SHORT_FECFRAME = 0b10;
        /// Pilot blocks inserted in the PLFRAME
        const PILOTS = 0b01;
    }
}

/// Physical Layer Signalling Code
///
/// 7-bit value laid out MSB first as MODCOD (5 bits), FECFRAME size (1 bit)
/// and pilots (1 bit). MODCOD 0 marks a dummy PLFRAME.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Plsc(u8);

impl Plsc {
    /// Largest valid PLSC value
    pub const MAX: u8 = 127;

    /// Number of distinct PLSC values
    pub const COUNT: usize = 128;

    /// Canonical dummy PLFRAME signalling
    pub const DUMMY: Self = Self(0);

    /// Create a new PLSC with validation
    pub fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Build a PLSC from the 5-bit MODCOD field and the TYPE flags
    pub fn from_parts(modcod: u8, plsc_type: PlscType) -> Option<Self> {
        if modcod > 31 {
            return None;
        }
        Some(Self((modcod << 2) | plsc_type.bits()))
    }

    /// Build a PLSC from the 6-bit Reed-Muller dataword and the pilot bit
    pub fn from_dataword(dataword: u8, pilot_bit: bool) -> Self {
        Self(((dataword & 0x3F) << 1) | pilot_bit as u8)
    }

    /// Get the raw 7-bit value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// MODCOD field (five MSBs)
    pub fn modcod(&self) -> u8 {
        self.0 >> 2
    }

    /// TYPE field (two LSBs)
    pub fn plsc_type(&self) -> PlscType {
        PlscType::from_bits_truncate(self.0)
    }

    /// The six MSBs, protected by the (32,6) code
    pub fn dataword(&self) -> u8 {
        self.0 >> 1
    }

    /// The LSB, carried by the interleaved repetition of the (32,6) codeword
    pub fn pilot_bit(&self) -> bool {
        self.0 & 1 == 1
    }

    /// Whether the MODCOD field marks a dummy PLFRAME
    pub fn is_dummy(&self) -> bool {
        self.modcod() == 0
    }

    /// Iterate over all 128 PLSC values in ascending order
    pub fn all() -> impl Iterator<Item = Plsc> {
        (0..=Self::MAX).map(Self)
    }
}

impl fmt::Display for Plsc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// FECFRAME size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FecFrameSize {
    /// 64800 bits
    Normal,
    /// 16200 bits
    Short,
}

impl FecFrameSize {
    /// Get the FECFRAME size in bits
    pub fn bits(&self) -> u32 {
        match self {
            FecFrameSize::Normal => NORMAL_FECFRAME_BITS,
            FecFrameSize::Short => SHORT_FECFRAME_BITS,
        }
    }

    pub fn from_short_flag(short_fecframe: bool) -> Self {
        if short_fecframe {
            FecFrameSize::Short
        } else {
            FecFrameSize::Normal
        }
    }
}

/// Payload constellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constellation {
    Qpsk,
    Psk8,
    Apsk16,
    Apsk32,
}

impl Constellation {
    /// Bits per constellation symbol (n_mod)
    pub fn bits_per_symbol(&self) -> u8 {
        match self {
            Constellation::Qpsk => 2,
            Constellation::Psk8 => 3,
            Constellation::Apsk16 => 4,
            Constellation::Apsk32 => 5,
        }
    }
}

/// LDPC code rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeRate {
    R1_4,
    R1_3,
    R2_5,
    R1_2,
    R3_5,
    R2_3,
    R3_4,
    R4_5,
    R5_6,
    R8_9,
    R9_10,
}

impl CodeRate {
    /// Get the rate as (numerator, denominator)
    pub fn ratio(&self) -> (u8, u8) {
        match self {
            CodeRate::R1_4 => (1, 4),
            CodeRate::R1_3 => (1, 3),
            CodeRate::R2_5 => (2, 5),
            CodeRate::R1_2 => (1, 2),
            CodeRate::R3_5 => (3, 5),
            CodeRate::R2_3 => (2, 3),
            CodeRate::R3_4 => (3, 4),
            CodeRate::R4_5 => (4, 5),
            CodeRate::R5_6 => (5, 6),
            CodeRate::R8_9 => (8, 9),
            CodeRate::R9_10 => (9, 10),
        }
    }
}

impl fmt::Display for CodeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (num, den) = self.ratio();
        write!(f, "{}/{}", num, den)
    }
}

/// DVB-S2 modulation and coding scheme (EN 302 307 Table 12)
///
/// Only the 28 data MODCODs are represented. MODCOD 0 is the dummy PLFRAME
/// and 29-31 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModCod {
    Qpsk1_4 = 1,
    Qpsk1_3 = 2,
    Qpsk2_5 = 3,
    Qpsk1_2 = 4,
    Qpsk3_5 = 5,
    Qpsk2_3 = 6,
    Qpsk3_4 = 7,
    Qpsk4_5 = 8,
    Qpsk5_6 = 9,
    Qpsk8_9 = 10,
    Qpsk9_10 = 11,
    Psk8_3_5 = 12,
    Psk8_2_3 = 13,
    Psk8_3_4 = 14,
    Psk8_5_6 = 15,
    Psk8_8_9 = 16,
    Psk8_9_10 = 17,
    Apsk16_2_3 = 18,
    Apsk16_3_4 = 19,
    Apsk16_4_5 = 20,
    Apsk16_5_6 = 21,
    Apsk16_8_9 = 22,
    Apsk16_9_10 = 23,
    Apsk32_3_4 = 24,
    Apsk32_4_5 = 25,
    Apsk32_5_6 = 26,
    Apsk32_8_9 = 27,
    Apsk32_9_10 = 28,
}

impl ModCod {
    /// Symbols per slot
    pub const SLOT_SYMBOLS: u32 = 90;

    /// Look up a data MODCOD from the 5-bit PLSC field
    pub fn from_index(index: u8) -> Option<Self> {
        Self::from_u8(index)
    }

    /// Get the MODCOD index (1-28)
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Payload constellation
    pub fn constellation(&self) -> Constellation {
        match self.index() {
            1..=11 => Constellation::Qpsk,
            12..=17 => Constellation::Psk8,
            18..=23 => Constellation::Apsk16,
            _ => Constellation::Apsk32,
        }
    }

    /// LDPC code rate
    pub fn code_rate(&self) -> CodeRate {
        use ModCod::*;
        match self {
            Qpsk1_4 => CodeRate::R1_4,
            Qpsk1_3 => CodeRate::R1_3,
            Qpsk2_5 => CodeRate::R2_5,
            Qpsk1_2 => CodeRate::R1_2,
            Qpsk3_5 | Psk8_3_5 => CodeRate::R3_5,
            Qpsk2_3 | Psk8_2_3 | Apsk16_2_3 => CodeRate::R2_3,
            Qpsk3_4 | Psk8_3_4 | Apsk16_3_4 | Apsk32_3_4 => CodeRate::R3_4,
            Qpsk4_5 | Apsk16_4_5 | Apsk32_4_5 => CodeRate::R4_5,
            Qpsk5_6 | Psk8_5_6 | Apsk16_5_6 | Apsk32_5_6 => CodeRate::R5_6,
            Qpsk8_9 | Psk8_8_9 | Apsk16_8_9 | Apsk32_8_9 => CodeRate::R8_9,
            Qpsk9_10 | Psk8_9_10 | Apsk16_9_10 | Apsk32_9_10 => CodeRate::R9_10,
        }
    }

    /// Bits per payload symbol (n_mod)
    pub fn bits_per_symbol(&self) -> u8 {
        self.constellation().bits_per_symbol()
    }

    /// Rate 9/10 is only defined for normal FECFRAMEs
    pub fn supports_short_fecframe(&self) -> bool {
        self.code_rate() != CodeRate::R9_10
    }

    /// Number of 90-symbol slots (S) carrying one FECFRAME
    pub fn slots(&self, frame_size: FecFrameSize) -> u16 {
        let symbols = frame_size.bits() / self.bits_per_symbol() as u32;
        (symbols / Self::SLOT_SYMBOLS) as u16
    }
}

impl fmt::Display for ModCod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constellation = match self.constellation() {
            Constellation::Qpsk => "QPSK",
            Constellation::Psk8 => "8PSK",
            Constellation::Apsk16 => "16APSK",
            Constellation::Apsk32 => "32APSK",
        };
        write!(f, "{} {}", constellation, self.code_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plsc_validation() {
        assert!(Plsc::new(0).is_some());
        assert!(Plsc::new(127).is_some());
        assert!(Plsc::new(128).is_none());
        assert_eq!(Plsc::all().count(), Plsc::COUNT);
    }

    #[test]
    fn test_plsc_fields() {
        // 8PSK 3/5, short FECFRAME, pilots
        let plsc = Plsc::from_parts(12, PlscType::SHORT_FECFRAME | PlscType::PILOTS).unwrap();
        assert_eq!(plsc.value(), 51);
        assert_eq!(plsc.modcod(), 12);
        assert!(plsc.plsc_type().contains(PlscType::SHORT_FECFRAME));
        assert!(plsc.pilot_bit());
        assert_eq!(plsc.dataword(), 25);
        assert_eq!(Plsc::from_dataword(plsc.dataword(), plsc.pilot_bit()), plsc);

        assert!(Plsc::from_parts(32, PlscType::empty()).is_none());
        assert!(Plsc::DUMMY.is_dummy());
    }

    #[test]
    fn test_modcod_lookup() {
        assert_eq!(ModCod::from_index(0), None);
        assert_eq!(ModCod::from_index(4), Some(ModCod::Qpsk1_2));
        assert_eq!(ModCod::from_index(28), Some(ModCod::Apsk32_9_10));
        assert_eq!(ModCod::from_index(29), None);
        for idx in 1..=28u8 {
            assert_eq!(ModCod::from_index(idx).unwrap().index(), idx);
        }
    }

    #[test]
    fn test_modcod_slots() {
        assert_eq!(ModCod::Qpsk1_2.slots(FecFrameSize::Normal), 360);
        assert_eq!(ModCod::Psk8_3_5.slots(FecFrameSize::Normal), 240);
        assert_eq!(ModCod::Apsk16_2_3.slots(FecFrameSize::Normal), 180);
        assert_eq!(ModCod::Apsk32_3_4.slots(FecFrameSize::Normal), 144);
        assert_eq!(ModCod::Qpsk1_2.slots(FecFrameSize::Short), 90);
        assert_eq!(ModCod::Apsk32_3_4.slots(FecFrameSize::Short), 36);
    }

    #[test]
    fn test_short_frame_support() {
        assert!(!ModCod::Qpsk9_10.supports_short_fecframe());
        assert!(!ModCod::Apsk32_9_10.supports_short_fecframe());
        assert!(ModCod::Psk8_8_9.supports_short_fecframe());
        assert_eq!(ModCod::Apsk16_5_6.to_string(), "16APSK 5/6");
    }
}
