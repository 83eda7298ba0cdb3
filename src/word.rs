//! Machine words and bounded arithmetic.
//!
//! Every memory cell and register of the Hypothetical Machine holds a signed
//! decimal value in the closed range -99999..=99999. Arithmetic never wraps:
//! results outside the range saturate at the nearest bound.

/// Number of memory cells.
pub const MEMORY_SIZE: usize = 50;

/// Largest representable word.
pub const WORD_MAX: i32 = 99_999;

/// Smallest representable word.
pub const WORD_MIN: i32 = -99_999;

/// Clamp an arbitrary integer to the legal word range.
///
/// Values above [`WORD_MAX`] become `WORD_MAX`, values below [`WORD_MIN`]
/// become `WORD_MIN`, anything in between passes through unchanged.
#[inline]
pub fn clamp(value: i64) -> i32 {
    value.clamp(WORD_MIN as i64, WORD_MAX as i64) as i32
}

/// Check whether an address names a memory cell.
#[inline]
pub fn in_bounds(addr: i32) -> bool {
    addr >= 0 && (addr as usize) < MEMORY_SIZE
}

/// Render a word the way every dump shows it: a sign column (blank for
/// non-negative values) followed by five zero-padded digits.
pub fn format_word(value: i32) -> String {
    let sign = if value < 0 { '-' } else { ' ' };
    format!("{}{:05}", sign, value.unsigned_abs())
}
