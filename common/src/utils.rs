//! Common Utilities
//!
//! Bit and level helpers used by the PLSC codec and the tool

/// Read bit `index` of a `width`-bit word, counting from the MSB
pub fn msb_bit(word: u64, width: u32, index: usize) -> u8 {
    ((word >> (width as usize - 1 - index)) & 1) as u8
}

/// Format the `width` LSBs of a word as a binary string (MSB first)
pub fn format_bits(word: u64, width: u32) -> String {
    (0..width as usize)
        .map(|i| if msb_bit(word, width, i) == 1 { '1' } else { '0' })
        .collect()
}

/// Convert a level in dB to a linear power ratio
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 10.0)
}
