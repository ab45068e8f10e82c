/// First-order Reed-Muller (32,6) code protecting the PLS code
/// Based on ETSI EN 302 307 Section 5.5.2.4

use tracing::trace;

/// Number of information bits (K)
pub const RM_K: usize = 6;
/// Codeword length (N)
pub const RM_N: usize = 32;
/// Number of codewords
pub const RM_CODEWORDS: usize = 1 << RM_K;

/// Generator matrix rows (EN 302 307 Figure 13). The MSB of each row is the
/// first transmitted code bit and the dataword MSB selects row 0.
pub const RM_GENERATOR: [u32; RM_K] = [
    0x5555_5555,
    0x3333_3333,
    0x0F0F_0F0F,
    0x00FF_00FF,
    0x0000_FFFF,
    0xFFFF_FFFF,
];

/// All 64 codewords indexed by dataword
pub const RM_CODEBOOK: [u32; RM_CODEWORDS] = build_codebook();

const fn encode_dataword(dataword: u8) -> u32 {
    let mut codeword = 0u32;
    let mut i = 0;
    while i < RM_K {
        if ((dataword as usize) >> (RM_K - 1 - i)) & 1 == 1 {
            codeword ^= RM_GENERATOR[i];
        }
        i += 1;
    }
    codeword
}

const fn build_codebook() -> [u32; RM_CODEWORDS] {
    let mut codebook = [0u32; RM_CODEWORDS];
    let mut dataword = 0;
    while dataword < RM_CODEWORDS {
        codebook[dataword] = encode_dataword(dataword as u8);
        dataword += 1;
    }
    codebook
}

/// Result of a hard-decision decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardDecision {
    /// Closest 6-bit dataword
    pub dataword: u8,
    /// Hamming distance between the received word and its codeword
    pub distance: u32,
}

/// Result of a soft-decision decode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftDecision {
    /// Most likely 6-bit dataword
    pub dataword: u8,
    /// Correlation between the soft input and the +/-1 codeword
    pub correlation: f32,
}

/// Reed-Muller (32,6) codec
///
/// Decoding never fails: the closest codeword is always returned together
/// with a metric the caller can use to judge confidence. Ties are resolved
/// towards the lowest dataword.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReedMuller;

impl ReedMuller {
    pub fn new() -> Self {
        Self
    }

    /// Encode a 6-bit dataword into a 32-bit codeword
    pub fn encode(&self, dataword: u8) -> u32 {
        debug_assert!(
            (dataword as usize) < RM_CODEWORDS,
            "dataword {} exceeds 6 bits",
            dataword
        );
        RM_CODEBOOK[(dataword & 0x3F) as usize]
    }

    /// Minimum Hamming distance decoding
    pub fn decode_hard(&self, word: u32) -> HardDecision {
        self.decode_hard_masked(word, u32::MAX)
    }

    /// Minimum Hamming distance decoding over the positions set in `mask`
    ///
    /// Positions outside the mask are treated as erasures and do not
    /// contribute to the distance.
    pub fn decode_hard_masked(&self, word: u32, mask: u32) -> HardDecision {
        let mut best = HardDecision {
            dataword: 0,
            distance: u32::MAX,
        };

        for (dataword, &codeword) in RM_CODEBOOK.iter().enumerate() {
            let distance = ((codeword ^ word) & mask).count_ones();
            if distance < best.distance {
                best = HardDecision {
                    dataword: dataword as u8,
                    distance,
                };
                if distance == 0 {
                    break;
                }
            }
        }

        trace!("RM hard decode: word={:08x} mask={:08x} -> {:?}", word, mask, best);
        best
    }

    /// Maximum-likelihood soft decoding
    ///
    /// A positive soft value favours bit 0. The correlation with every
    /// codeword is obtained from one 32-point Walsh-Hadamard transform.
    pub fn decode_soft(&self, soft: &[f32; RM_N]) -> SoftDecision {
        let spectrum = walsh_hadamard(soft);

        let mut best = SoftDecision {
            dataword: 0,
            correlation: f32::NEG_INFINITY,
        };

        for dataword in 0..RM_CODEWORDS as u8 {
            // The five MSBs pick a Walsh function and the LSB (all-ones row)
            // flips its sign.
            let coefficient = spectrum[walsh_index(dataword >> 1)];
            let correlation = if dataword & 1 == 0 {
                coefficient
            } else {
                -coefficient
            };
            if correlation > best.correlation {
                best = SoftDecision {
                    dataword,
                    correlation,
                };
            }
        }

        trace!("RM soft decode -> {:?}", best);
        best
    }
}

/// Map the five linear-row bits of a dataword to the Walsh function index.
///
/// Row `i` of the generator is bit `i` of the code position, so the row
/// selected by the dataword MSB corresponds to the position LSB.
fn walsh_index(rows: u8) -> usize {
    let mut index = 0usize;
    for i in 0..(RM_K - 1) {
        index |= (((rows >> i) & 1) as usize) << (RM_K - 2 - i);
    }
    index
}

/// In-place fast Walsh-Hadamard transform of a 32-point vector
fn walsh_hadamard(input: &[f32; RM_N]) -> [f32; RM_N] {
    let mut out = *input;
    let mut half = 1;
    while half < RM_N {
        for block in (0..RM_N).step_by(2 * half) {
            for i in block..block + half {
                let a = out[i];
                let b = out[i + half];
                out[i] = a + b;
                out[i + half] = a - b;
            }
        }
        half <<= 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// +/-1 rendition of a codeword, bit 0 -> +1
    fn to_soft(word: u32) -> [f32; RM_N] {
        let mut soft = [0.0; RM_N];
        for (i, s) in soft.iter_mut().enumerate() {
            *s = if (word >> (RM_N - 1 - i)) & 1 == 1 { -1.0 } else { 1.0 };
        }
        soft
    }

    fn direct_correlation(soft: &[f32; RM_N], codeword: u32) -> f32 {
        to_soft(codeword).iter().zip(soft.iter()).map(|(c, s)| c * s).sum()
    }

    #[test]
    fn test_codebook_structure() {
        let rm = ReedMuller::new();
        assert_eq!(rm.encode(0), 0);
        // Dataword 1 selects the all-ones row only
        assert_eq!(rm.encode(1), 0xFFFF_FFFF);
        assert_eq!(rm.encode(0b100000), 0x5555_5555);

        for a in 0..RM_CODEWORDS as u8 {
            for b in 0..RM_CODEWORDS as u8 {
                assert_eq!(rm.encode(a ^ b), rm.encode(a) ^ rm.encode(b));
            }
        }
    }

    #[test]
    fn test_minimum_distance() {
        let mut min_distance = u32::MAX;
        for a in 0..RM_CODEWORDS {
            for b in (a + 1)..RM_CODEWORDS {
                min_distance = min_distance.min((RM_CODEBOOK[a] ^ RM_CODEBOOK[b]).count_ones());
            }
        }
        assert_eq!(min_distance, 16);
    }

    #[test]
    fn test_hard_decode_corrects_seven_errors() {
        let rm = ReedMuller::new();
        for dataword in 0..RM_CODEWORDS as u8 {
            let codeword = rm.encode(dataword);
            assert_eq!(rm.decode_hard(codeword), HardDecision { dataword, distance: 0 });

            // Spread seven errors over the word
            let errors = 0b1000_0100_0010_0001_0000_1000_0100_0010u32;
            let decoded = rm.decode_hard(codeword ^ errors);
            assert_eq!(decoded.dataword, dataword);
            assert_eq!(decoded.distance, 7);
        }
    }

    #[test]
    fn test_hard_decode_tie_prefers_lowest_dataword() {
        let rm = ReedMuller::new();
        // Eight errors put the word halfway between dataword 0 and 0b100000
        let word = rm.encode(0b100000) & 0xFFFF_0000;
        assert_eq!((word ^ rm.encode(0)).count_ones(), 8);
        assert_eq!((word ^ rm.encode(0b100000)).count_ones(), 8);
        assert_eq!(rm.decode_hard(word).dataword, 0);
    }

    #[test]
    fn test_masked_decode_ignores_erasures() {
        let rm = ReedMuller::new();
        let codeword = rm.encode(0b101101);
        let erasures = 0x00FF_F000u32;
        let corrupted = codeword ^ erasures;
        let decoded = rm.decode_hard_masked(corrupted, !erasures);
        assert_eq!(decoded.dataword, 0b101101);
        assert_eq!(decoded.distance, 0);
    }

    #[test]
    fn test_walsh_hadamard_matches_direct_correlation() {
        let rm = ReedMuller::new();
        let soft: [f32; RM_N] = std::array::from_fn(|i| ((i * 7 + 3) % 11) as f32 - 5.0);
        let decoded = rm.decode_soft(&soft);

        let mut best = (0u8, f32::NEG_INFINITY);
        for dataword in 0..RM_CODEWORDS as u8 {
            let correlation = direct_correlation(&soft, rm.encode(dataword));
            if correlation > best.1 {
                best = (dataword, correlation);
            }
        }
        assert_eq!(decoded.dataword, best.0);
        assert!((decoded.correlation - best.1).abs() < 1e-4);
    }

    #[test]
    fn test_soft_decode_agrees_with_hard_decode() {
        let rm = ReedMuller::new();
        let error_patterns = [0u32, 0x8000_0001, 0x0101_0101, 0xF000_000F, 0x00FF_0000];
        for dataword in 0..RM_CODEWORDS as u8 {
            for &errors in &error_patterns {
                let word = rm.encode(dataword) ^ errors;
                let hard = rm.decode_hard(word);
                let soft = rm.decode_soft(&to_soft(word));
                assert_eq!(
                    soft.dataword, hard.dataword,
                    "dataword {} errors {:08x}",
                    dataword, errors
                );
                assert_eq!(soft.correlation, (RM_N as u32 - 2 * hard.distance) as f32);
            }
        }
    }
}
