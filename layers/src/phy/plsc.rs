//! PLS Code Encoding and Decoding
//!
//! Implements the (64,7) PLS code of the DVB-S2 PLHEADER according to
//! ETSI EN 302 307 Section 5.5.2: the (32,6) Reed-Muller code, the
//! interleaved repetition carrying the pilot bit, the PLSC scrambler and the
//! pi/2 BPSK mapping.

use crate::PhyError;
use common::types::{ModCod, Plsc, PlscType};
use common::utils::msb_bit;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::pi2_bpsk;
use super::plframe::{
    sof_symbols, PlFrameInfo, PLHEADER_LEN, PLSC_LEN, SOF_LAST_BIT, SOF_LEN,
};
use super::reed_muller::{ReedMuller, RM_CODEBOOK, RM_N};

/// PLSC scrambling sequence (MSB applies to the first PLSC symbol)
pub const PLSC_SCRAMBLER: u64 = 0x719D_83C9_5342_2DFA;

/// Decoder input length: the last SOF symbol followed by the PLSC symbols
pub const PLSC_INPUT_LEN: usize = PLSC_LEN + 1;

/// Build the unscrambled 64-bit PLS code
///
/// Code bit `j` of the (32,6) codeword is sent at positions `2j` and `2j+1`,
/// the second copy inverted when the pilot bit is set.
pub fn pls_code(reed_muller: &ReedMuller, plsc: Plsc) -> u64 {
    repeat_codeword(reed_muller.encode(plsc.dataword()), plsc.pilot_bit() as u64)
}

const fn repeat_codeword(codeword: u32, pilot_bit: u64) -> u64 {
    let mut code = 0u64;
    let mut j = 0;
    while j < RM_N {
        let bit = ((codeword >> (RM_N - 1 - j) as u32) & 1) as u64;
        code = (code << 2) | (bit << 1) | (bit ^ pilot_bit);
        j += 1;
    }
    code
}

/// Differential form of every scrambled PLS code, indexed by PLSC value
///
/// Bit `i` (from the MSB) is set when PLSC symbol `i` carries a different
/// bit than the symbol before it; the first symbol is compared with the last
/// SOF bit.
const DIFF_CODEBOOK: [u64; Plsc::COUNT] = build_diff_codebook();

const fn build_diff_codebook() -> [u64; Plsc::COUNT] {
    let mut table = [0u64; Plsc::COUNT];
    let mut plsc = 0;
    while plsc < Plsc::COUNT {
        let code = repeat_codeword(RM_CODEBOOK[plsc >> 1], (plsc & 1) as u64) ^ PLSC_SCRAMBLER;
        table[plsc] = code ^ ((code >> 1) | ((SOF_LAST_BIT as u64) << 63));
        plsc += 1;
    }
    table
}

/// Cost of explaining differential errors by one inverted symbol
const SYMBOL_ERROR_COST: u32 = 1;
/// Cost of a differential decision error not caused by an inverted symbol
const DECISION_ERROR_COST: u32 = 2;

/// Distance of a 64-bit differential error pattern
///
/// An inverted symbol flips the decisions on both of its sides, so adjacent
/// errors are charged as one symbol error. The last SOF symbol only touches
/// the first decision and the last PLSC symbol only the last one. The
/// cheapest mix of symbol and lone decision errors is found by a two-state
/// search over the symbols.
fn differential_distance(errors: u64) -> u32 {
    // Cost so far with the current symbol upright or inverted
    let mut cost = [0, SYMBOL_ERROR_COST];
    for i in 0..PLSC_LEN {
        let error = msb_bit(errors, 64, i) as usize;
        let mut next = [u32::MAX; 2];
        for (inverted, &so_far) in cost.iter().enumerate() {
            for (next_inverted, best) in next.iter_mut().enumerate() {
                let lone = (error ^ inverted ^ next_inverted) as u32;
                let total = so_far
                    + lone * DECISION_ERROR_COST
                    + next_inverted as u32 * SYMBOL_ERROR_COST;
                *best = (*best).min(total);
            }
        }
        cost = next;
    }
    cost[0].min(cost[1])
}

/// Split a 64-bit PLS code into the bits at even and odd positions
fn split_pairs(code: u64) -> (u32, u32) {
    let mut even = 0u32;
    let mut odd = 0u32;
    for j in 0..RM_N {
        even = (even << 1) | msb_bit(code, 64, 2 * j) as u32;
        odd = (odd << 1) | msb_bit(code, 64, 2 * j + 1) as u32;
    }
    (even, odd)
}

/// Validate PLFRAME parameters and pack them into a PLSC
///
/// The dummy PLFRAME is only signalled as PLSC 0, reserved MODCODs are
/// rejected and rate 9/10 has no short FECFRAME.
pub fn plsc_from_params(
    modcod: u8,
    short_fecframe: bool,
    has_pilots: bool,
) -> Result<Plsc, PhyError> {
    let mut plsc_type = PlscType::empty();
    plsc_type.set(PlscType::SHORT_FECFRAME, short_fecframe);
    plsc_type.set(PlscType::PILOTS, has_pilots);

    if modcod == 0 {
        if !plsc_type.is_empty() {
            return Err(PhyError::InvalidDummyFrame);
        }
        return Ok(Plsc::DUMMY);
    }

    let mc = ModCod::from_index(modcod).ok_or(PhyError::InvalidModcod(modcod))?;
    if short_fecframe && !mc.supports_short_fecframe() {
        return Err(PhyError::UnsupportedShortFrame(mc));
    }

    Plsc::from_parts(modcod, plsc_type).ok_or(PhyError::InvalidModcod(modcod))
}

/// PLSC encoder
#[derive(Debug, Clone, Default)]
pub struct PlscEncoder {
    reed_muller: ReedMuller,
}

impl PlscEncoder {
    /// Create a new PLSC encoder
    pub fn new() -> Self {
        Self {
            reed_muller: ReedMuller::new(),
        }
    }

    /// Encode a PLSC into 64 scrambled pi/2 BPSK symbols
    pub fn encode(&self, plsc: Plsc) -> [Complex32; PLSC_LEN] {
        let bits = pls_code(&self.reed_muller, plsc) ^ PLSC_SCRAMBLER;

        let mut symbols = [Complex32::new(0.0, 0.0); PLSC_LEN];
        pi2_bpsk::map_bits(bits, &mut symbols);

        debug!("Encoded PLSC {}: scrambled code {:016x}", plsc, bits);
        symbols
    }

    /// Encode a PLSC given as MODCOD, FECFRAME size and pilot flags
    pub fn encode_params(
        &self,
        modcod: u8,
        short_fecframe: bool,
        has_pilots: bool,
    ) -> Result<[Complex32; PLSC_LEN], PhyError> {
        let plsc = plsc_from_params(modcod, short_fecframe, has_pilots)?;
        Ok(self.encode(plsc))
    }

    /// Generate the full PLHEADER: SOF followed by the PLSC symbols
    pub fn encode_header(&self, plsc: Plsc) -> [Complex32; PLHEADER_LEN] {
        let mut header = [Complex32::new(0.0, 0.0); PLHEADER_LEN];
        header[..SOF_LEN].copy_from_slice(&sof_symbols());
        header[SOF_LEN..].copy_from_slice(&self.encode(plsc));
        header
    }
}

/// Decoder mode flags as requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Phase reference already recovered upstream
    pub coherent: bool,
    /// Soft-decision decoding
    pub soft: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            coherent: true,
            soft: true,
        }
    }
}

impl DecodeOptions {
    pub fn new(coherent: bool, soft: bool) -> Self {
        Self { coherent, soft }
    }

    /// Resolve the demapping actually performed
    ///
    /// Differential demapping only yields hard decisions, so a non-coherent
    /// soft request runs as a hard differential decode.
    pub fn demapping(&self) -> Demapping {
        match (self.coherent, self.soft) {
            (true, true) => Demapping::CoherentSoft,
            (true, false) => Demapping::CoherentHard,
            (false, _) => Demapping::Differential,
        }
    }
}

/// Effective demapping mode of a decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demapping {
    CoherentSoft,
    CoherentHard,
    Differential,
}

impl Demapping {
    pub fn all() -> [Demapping; 3] {
        [Demapping::CoherentSoft, Demapping::CoherentHard, Demapping::Differential]
    }

    /// Options selecting this mode
    pub fn options(&self) -> DecodeOptions {
        match self {
            Demapping::CoherentSoft => DecodeOptions::new(true, true),
            Demapping::CoherentHard => DecodeOptions::new(true, false),
            Demapping::Differential => DecodeOptions::new(false, false),
        }
    }
}

/// Decoding metric of the selected PLSC
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reliability {
    /// Hamming distance over the 64 code bits, or the weighted symbol and
    /// decision error count of a differential decode
    Distance(u32),
    /// Correlation between the soft decisions and the +/-1 code
    Correlation(f32),
}

/// Result of a PLSC decode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlscDecoded {
    /// Decoded PLSC and the PLFRAME parameters it implies
    pub info: PlFrameInfo,
    /// Metric of the decision
    pub reliability: Reliability,
    /// Demapping actually performed
    pub demapping: Demapping,
    confidence: f32,
}

impl PlscDecoded {
    pub fn plsc(&self) -> Plsc {
        self.info.plsc
    }

    /// Reliability normalized to [-1, 1]; 1 for a noiseless PLSC
    pub fn confidence(&self) -> f32 {
        self.confidence
    }
}

/// Set of PLSC values a receiver accepts
///
/// Bit `n` of the mask accepts PLSC `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlsFilter {
    mask: u128,
}

impl Default for PlsFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl PlsFilter {
    pub fn accept_all() -> Self {
        Self { mask: u128::MAX }
    }

    /// Build a filter from the low (PLSC 0-63) and high (PLSC 64-127) halves
    pub fn from_bounds(lo: u64, hi: u64) -> Self {
        Self {
            mask: ((hi as u128) << 64) | lo as u128,
        }
    }

    /// Accept exactly the given PLSC values
    pub fn from_plscs<I: IntoIterator<Item = Plsc>>(plscs: I) -> Self {
        let mask = plscs
            .into_iter()
            .fold(0u128, |mask, plsc| mask | (1u128 << plsc.value()));
        Self { mask }
    }

    pub fn accepts(&self, plsc: Plsc) -> bool {
        (self.mask >> plsc.value()) & 1 == 1
    }

    pub fn mask(&self) -> u128 {
        self.mask
    }
}

/// PLSC decoder
///
/// Holds a soft-decision buffer reused by every call; use one decoder per
/// thread.
#[derive(Debug, Clone)]
pub struct PlscDecoder {
    reed_muller: ReedMuller,
    soft_dec_buf: [f32; PLSC_LEN],
}

impl Default for PlscDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlscDecoder {
    /// Create a new PLSC decoder
    pub fn new() -> Self {
        Self {
            reed_muller: ReedMuller::new(),
            soft_dec_buf: [0.0; PLSC_LEN],
        }
    }

    /// Decode a PLSC
    ///
    /// `symbols[0]` is the last SOF symbol and `symbols[1..]` the 64 PLSC
    /// symbols. Always returns the most likely PLSC; ties are resolved
    /// towards the lowest value.
    pub fn decode(
        &mut self,
        symbols: &[Complex32; PLSC_INPUT_LEN],
        opts: DecodeOptions,
    ) -> PlscDecoded {
        let demapping = opts.demapping();
        if !opts.coherent && opts.soft {
            trace!(
                "Soft decisions unavailable without phase reference, using {:?}",
                demapping
            );
        }

        let (plsc, reliability, confidence) = match demapping {
            Demapping::CoherentSoft => self.decode_soft(&symbols[1..]),
            Demapping::CoherentHard => {
                let bits = pi2_bpsk::demap_hard(&symbols[1..]);
                self.decode_hard(bits ^ PLSC_SCRAMBLER)
            }
            Demapping::Differential => self.decode_differential(pi2_bpsk::demap_diff(symbols)),
        };

        debug!(
            "Decoded PLSC {} ({:?}): {:?}, confidence {:.3}",
            plsc, demapping, reliability, confidence
        );

        PlscDecoded {
            info: PlFrameInfo::from_plsc(plsc),
            reliability,
            demapping,
            confidence,
        }
    }

    /// Decode from a sample window, checking its length
    pub fn decode_slice(
        &mut self,
        symbols: &[Complex32],
        opts: DecodeOptions,
    ) -> Result<PlscDecoded, PhyError> {
        let window: &[Complex32; PLSC_INPUT_LEN] =
            symbols.try_into().map_err(|_| PhyError::InvalidLength {
                expected: PLSC_INPUT_LEN,
                actual: symbols.len(),
            })?;
        Ok(self.decode(window, opts))
    }

    /// Hard decoding of a descrambled 64-bit word over both pilot-bit
    /// hypotheses
    fn decode_hard(&self, code: u64) -> (Plsc, Reliability, f32) {
        let (even, odd) = split_pairs(code);

        let mut best: Option<(Plsc, u32)> = None;
        for pilot_bit in [false, true] {
            let repeated = if pilot_bit { !odd } else { odd };
            // Disagreeing pairs say nothing about the codeword bit and cost
            // one error whichever value it has.
            let erasures = even ^ repeated;
            let decision = self.reed_muller.decode_hard_masked(even, !erasures);
            let distance = 2 * decision.distance + erasures.count_ones();
            let plsc = Plsc::from_dataword(decision.dataword, pilot_bit);

            trace!(
                "Pilot bit {}: PLSC {} at distance {}",
                pilot_bit as u8,
                plsc,
                distance
            );
            if best.map_or(true, |(best_plsc, best_distance)| {
                distance < best_distance || (distance == best_distance && plsc < best_plsc)
            }) {
                best = Some((plsc, distance));
            }
        }

        let (plsc, distance) = best.unwrap_or((Plsc::DUMMY, PLSC_LEN as u32));
        let confidence = 1.0 - 2.0 * distance as f32 / PLSC_LEN as f32;
        (plsc, Reliability::Distance(distance), confidence)
    }

    /// Minimum distance decoding of the 64 differential decisions
    ///
    /// Runs against the differential form of each PLS code, so an inverted
    /// run of symbols only costs the decisions at its edges.
    fn decode_differential(&self, decisions: u64) -> (Plsc, Reliability, f32) {
        let mut best = (Plsc::DUMMY, u32::MAX);
        for (plsc, &diff) in Plsc::all().zip(DIFF_CODEBOOK.iter()) {
            let distance = differential_distance(decisions ^ diff);
            if distance < best.1 {
                best = (plsc, distance);
            }
        }

        let (plsc, distance) = best;
        trace!("Differential decisions {:016x}: PLSC {} at distance {}", decisions, plsc, distance);
        let confidence = 1.0 - 2.0 * distance as f32 / PLSC_LEN as f32;
        (plsc, Reliability::Distance(distance), confidence)
    }

    /// Coherent soft decoding over both pilot-bit hypotheses
    fn decode_soft(&mut self, symbols: &[Complex32]) -> (Plsc, Reliability, f32) {
        pi2_bpsk::demap_soft(symbols, &mut self.soft_dec_buf);
        for (i, soft) in self.soft_dec_buf.iter_mut().enumerate() {
            if msb_bit(PLSC_SCRAMBLER, 64, i) == 1 {
                *soft = -*soft;
            }
        }

        let mut best: Option<(Plsc, f32)> = None;
        for pilot_bit in [false, true] {
            let sign = if pilot_bit { -1.0 } else { 1.0 };
            let combined: [f32; RM_N] = std::array::from_fn(|j| {
                self.soft_dec_buf[2 * j] + sign * self.soft_dec_buf[2 * j + 1]
            });
            let decision = self.reed_muller.decode_soft(&combined);
            let plsc = Plsc::from_dataword(decision.dataword, pilot_bit);

            trace!(
                "Pilot bit {}: PLSC {} correlation {:.3}",
                pilot_bit as u8,
                plsc,
                decision.correlation
            );
            if best.map_or(true, |(best_plsc, best_correlation)| {
                decision.correlation > best_correlation
                    || (decision.correlation == best_correlation && plsc < best_plsc)
            }) {
                best = Some((plsc, decision.correlation));
            }
        }

        let (plsc, correlation) = best.unwrap_or((Plsc::DUMMY, 0.0));
        let magnitude: f32 = self.soft_dec_buf.iter().map(|s| s.abs()).sum();
        let confidence = if magnitude > 0.0 { correlation / magnitude } else { 0.0 };
        (plsc, Reliability::Correlation(correlation), confidence)
    }
}
