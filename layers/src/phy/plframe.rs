//! DVB-S2 PLFRAME Structure
//!
//! PLHEADER layout and the derivation of the PLFRAME parameters signalled by
//! the PLS code, according to ETSI EN 302 307 Section 5.5

use common::types::{FecFrameSize, ModCod, Plsc};
use num_complex::Complex32;
use serde::Serialize;

use super::pi2_bpsk;

/// Start-of-frame sequence (26 bits, MSB first)
pub const SOF: u32 = 0x18D_2E82;
/// Number of SOF symbols
pub const SOF_LEN: usize = 26;
/// Number of PLSC symbols
pub const PLSC_LEN: usize = 64;
/// Number of PLHEADER symbols (SOF + PLSC)
pub const PLHEADER_LEN: usize = SOF_LEN + PLSC_LEN;
/// Number of symbols per slot
pub const SLOT_LEN: usize = 90;
/// Pilot block length in symbols
pub const PILOT_BLOCK_LEN: usize = 36;
/// A pilot block follows every 16 slots
pub const PILOT_BLOCK_PERIOD: u16 = 16;
/// Slots in a dummy PLFRAME
pub const DUMMY_SLOTS: u16 = 36;

/// Bit carried by the last SOF symbol
pub const SOF_LAST_BIT: u8 = (SOF & 1) as u8;

/// Generate the 26 SOF symbols
pub fn sof_symbols() -> [Complex32; SOF_LEN] {
    let mut symbols = [Complex32::new(0.0, 0.0); SOF_LEN];
    pi2_bpsk::map_bits(SOF as u64, &mut symbols);
    symbols
}

/// PLFRAME parameters implied by a PLS code
///
/// A pure function of the PLSC: decoding the same value always yields the
/// same parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlFrameInfo {
    /// Decoded PLS code
    pub plsc: Plsc,
    /// MODCOD field
    pub modcod: u8,
    /// Whether the FECFRAME is short (16200 bits)
    pub short_fecframe: bool,
    /// Whether the PLFRAME carries pilot blocks
    pub has_pilots: bool,
    /// Whether this is a dummy PLFRAME
    pub dummy_frame: bool,
    /// Bits per payload constellation symbol (0 when there is no payload)
    pub n_mod: u8,
    /// Number of 90-symbol slots (S)
    pub slots: u16,
    /// PLFRAME length in symbols, PLHEADER and pilots included
    pub plframe_len: u16,
    /// Number of pilot blocks
    pub n_pilots: u8,
}

impl PlFrameInfo {
    /// Derive the PLFRAME parameters of a PLS code
    pub fn from_plsc(plsc: Plsc) -> Self {
        let modcod = plsc.modcod();
        let short_fecframe = plsc.value() & 0b10 != 0;
        let dummy_frame = modcod == 0;
        // A dummy frame never carries pilots
        let has_pilots = plsc.pilot_bit() && !dummy_frame;

        let (n_mod, slots) = match ModCod::from_index(modcod) {
            Some(mc) => (
                mc.bits_per_symbol(),
                mc.slots(FecFrameSize::from_short_flag(short_fecframe)),
            ),
            // Dummy frame or reserved MODCOD
            None => (0, DUMMY_SLOTS),
        };

        let n_pilots = if has_pilots {
            ((slots - 1) / PILOT_BLOCK_PERIOD) as u8
        } else {
            0
        };

        let plframe_len = (slots + 1) * SLOT_LEN as u16 + PILOT_BLOCK_LEN as u16 * n_pilots as u16;

        Self {
            plsc,
            modcod,
            short_fecframe,
            has_pilots,
            dummy_frame,
            n_mod,
            slots,
            plframe_len,
            n_pilots,
        }
    }

    /// Data MODCOD, if the PLSC signals one
    pub fn modcod(&self) -> Option<ModCod> {
        ModCod::from_index(self.modcod)
    }

    /// Whether the MODCOD field holds a reserved value (29-31)
    pub fn reserved_modcod(&self) -> bool {
        !self.dummy_frame && self.modcod().is_none()
    }

    /// FECFRAME size, if the PLFRAME carries a payload
    pub fn fecframe_size(&self) -> Option<FecFrameSize> {
        self.modcod()
            .map(|_| FecFrameSize::from_short_flag(self.short_fecframe))
    }

    /// Number of payload symbols, pilots excluded
    pub fn payload_len(&self) -> usize {
        self.slots as usize * SLOT_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::PlscType;

    fn info(modcod: u8, plsc_type: PlscType) -> PlFrameInfo {
        PlFrameInfo::from_plsc(Plsc::from_parts(modcod, plsc_type).unwrap())
    }

    #[test]
    fn test_sof_symbols() {
        let sof = sof_symbols();
        assert_eq!(sof.len(), SOF_LEN);
        for s in &sof {
            assert!((s.norm() - 1.0).abs() < 1e-6);
        }
        // The last SOF symbol sits at an odd position and carries bit 0
        assert_eq!(SOF_LAST_BIT, 0);
        assert_eq!(sof[SOF_LEN - 1], pi2_bpsk::reference_point(1));
    }

    #[test]
    fn test_qpsk_normal_frame() {
        let params = info(4, PlscType::empty());
        assert!(!params.dummy_frame);
        assert!(!params.short_fecframe);
        assert_eq!(params.n_mod, 2);
        assert_eq!(params.slots, 360);
        assert_eq!(params.n_pilots, 0);
        assert_eq!(params.plframe_len, 32_490);
        assert_eq!(params.payload_len(), 32_400);
    }

    #[test]
    fn test_qpsk_normal_frame_with_pilots() {
        let params = info(4, PlscType::PILOTS);
        assert!(params.has_pilots);
        assert_eq!(params.n_pilots, 22);
        assert_eq!(params.plframe_len, 33_282);
    }

    #[test]
    fn test_short_frames() {
        let params = info(12, PlscType::SHORT_FECFRAME | PlscType::PILOTS);
        assert_eq!(params.n_mod, 3);
        assert_eq!(params.slots, 60);
        assert_eq!(params.n_pilots, 3);
        assert_eq!(params.plframe_len, 61 * 90 + 3 * 36);
        assert_eq!(params.fecframe_size(), Some(FecFrameSize::Short));

        let params = info(24, PlscType::SHORT_FECFRAME);
        assert_eq!(params.n_mod, 5);
        assert_eq!(params.slots, 36);
        assert_eq!(params.plframe_len, 37 * 90);
    }

    #[test]
    fn test_dummy_frame() {
        for plsc_type in [PlscType::empty(), PlscType::PILOTS, PlscType::SHORT_FECFRAME] {
            let params = info(0, plsc_type);
            assert!(params.dummy_frame);
            assert!(!params.has_pilots);
            assert_eq!(params.n_mod, 0);
            assert_eq!(params.slots, DUMMY_SLOTS);
            assert_eq!(params.n_pilots, 0);
            assert_eq!(params.plframe_len, 3_330);
            assert_eq!(params.fecframe_size(), None);
        }
    }

    #[test]
    fn test_reserved_modcod() {
        let params = info(30, PlscType::PILOTS);
        assert!(!params.dummy_frame);
        assert!(params.reserved_modcod());
        assert_eq!(params.n_mod, 0);
        assert_eq!(params.slots, DUMMY_SLOTS);
        assert_eq!(params.n_pilots, 2);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for plsc in Plsc::all() {
            assert_eq!(PlFrameInfo::from_plsc(plsc), PlFrameInfo::from_plsc(plsc));
        }
    }
}
