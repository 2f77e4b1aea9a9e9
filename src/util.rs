//! Rounding helpers for hardware allocation granularities.

/// Rounds `size` up to the next multiple of `granularity`.
#[must_use]
pub fn pad_size(size: usize, granularity: usize) -> usize {
    ceil_divide(size, granularity) * granularity
}

/// Divides `numerator` by `denominator`, rounding up.
#[must_use]
pub fn ceil_divide(numerator: usize, denominator: usize) -> usize {
    (numerator + denominator - 1) / denominator
}
