/// pi/2 BPSK mapping and demapping of the PLHEADER
/// Based on ETSI EN 302 307 Section 5.5.2.2
///
/// Symbol positions are counted from an even PLHEADER position. Bit 0 maps to
/// (1+j)/sqrt(2) on even positions and to (-1+j)/sqrt(2) on odd positions,
/// bit 1 to the opposite point.

use common::utils::msb_bit;
use num_complex::Complex32;
use std::f32::consts::FRAC_1_SQRT_2;

/// Constellation point of bit 0 at the given position
pub fn reference_point(index: usize) -> Complex32 {
    if index % 2 == 0 {
        Complex32::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)
    } else {
        Complex32::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2)
    }
}

/// Map the `out.len()` LSBs of `bits` (MSB first) to pi/2 BPSK symbols
pub fn map_bits(bits: u64, out: &mut [Complex32]) {
    let n = out.len() as u32;
    debug_assert!(n <= 64);
    for (i, symbol) in out.iter_mut().enumerate() {
        let point = reference_point(i);
        *symbol = if msb_bit(bits, n, i) == 1 { -point } else { point };
    }
}

/// Coherent soft demapping
///
/// Each soft decision is the projection of the symbol on the bit-0 point of
/// its position. Positive values favour bit 0.
pub fn demap_soft(symbols: &[Complex32], out: &mut [f32]) {
    debug_assert_eq!(symbols.len(), out.len());
    for (i, (symbol, soft)) in symbols.iter().zip(out.iter_mut()).enumerate() {
        *soft = (symbol * reference_point(i).conj()).re;
    }
}

/// Coherent hard demapping into a word (first symbol in the MSB)
pub fn demap_hard(symbols: &[Complex32]) -> u64 {
    debug_assert!(symbols.len() <= 64);
    let mut bits = 0u64;
    for (i, symbol) in symbols.iter().enumerate() {
        let projection = (symbol * reference_point(i).conj()).re;
        bits = (bits << 1) | (projection < 0.0) as u64;
    }
    bits
}

/// Differential hard demapping
///
/// Compares each symbol with its predecessor and returns one decision per
/// pair, first pair in the MSB: 0 when both symbols carry the same bit, 1
/// when the bit changes. `symbols[0]` must sit at an odd position. The
/// decisions are insensitive to a constant phase rotation.
pub fn demap_diff(symbols: &[Complex32]) -> u64 {
    debug_assert!(!symbols.is_empty() && symbols.len() <= 65);
    let mut decisions = 0u64;
    for (i, pair) in symbols.windows(2).enumerate() {
        // Between equal bits the phase advances by -pi/2 into an even
        // position and by +pi/2 into an odd one.
        let turn = (pair[1] * pair[0].conj()).im;
        let same = if i % 2 == 0 { turn < 0.0 } else { turn > 0.0 };
        decisions = (decisions << 1) | (!same) as u64;
    }
    decisions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotate(symbols: &[Complex32], phase: f32) -> Vec<Complex32> {
        let rotation = Complex32::from_polar(1.0, phase);
        symbols.iter().map(|&s| s * rotation).collect()
    }

    #[test]
    fn test_constellation_points() {
        let mut symbols = [Complex32::new(0.0, 0.0); 4];
        map_bits(0b0011, &mut symbols);

        let a = FRAC_1_SQRT_2;
        assert_eq!(symbols[0], Complex32::new(a, a));
        assert_eq!(symbols[1], Complex32::new(-a, a));
        assert_eq!(symbols[2], Complex32::new(-a, -a));
        assert_eq!(symbols[3], Complex32::new(a, -a));
        for s in &symbols {
            assert!((s.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_coherent_demapping() {
        let bits = 0xDEAD_BEEF_0123_4567u64;
        let mut symbols = [Complex32::new(0.0, 0.0); 64];
        map_bits(bits, &mut symbols);
        assert_eq!(demap_hard(&symbols), bits);

        let mut soft = [0.0f32; 64];
        demap_soft(&symbols, &mut soft);
        for (i, s) in soft.iter().enumerate() {
            let expected = if msb_bit(bits, 64, i) == 1 { -1.0 } else { 1.0 };
            assert!((s - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_differential_decisions_ignore_rotation() {
        let bits = 0x719D_83C9_5342_2DFAu64;
        // Reference symbol at the odd position before the block carries bit 0
        let mut symbols = vec![reference_point(1)];
        let mut block = [Complex32::new(0.0, 0.0); 64];
        map_bits(bits, &mut block);
        symbols.extend_from_slice(&block);

        let changes = bits ^ (bits >> 1);
        assert_eq!(demap_diff(&symbols), changes);
        for phase in [0.3f32, 1.9, -2.7] {
            assert_eq!(demap_diff(&rotate(&symbols, phase)), changes);
        }
    }

    #[test]
    fn test_inverted_tail_changes_one_decision() {
        let mut symbols = vec![reference_point(1)];
        let mut block = [Complex32::new(0.0, 0.0); 64];
        map_bits(0x0123_4567_89AB_CDEF, &mut block);
        symbols.extend_from_slice(&block);
        let clean = demap_diff(&symbols);

        for start in [1usize, 17, 40, 64] {
            let mut slipped = symbols.clone();
            for s in slipped[start..].iter_mut() {
                *s = -*s;
            }
            assert_eq!(demap_diff(&slipped) ^ clean, 1u64 << (64 - start));
        }
    }
}
