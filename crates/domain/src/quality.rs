//! Data-quality screening for hardware notification batches.
//!
//! Some DTS units occasionally emit a large batch where every reading is
//! zero. Checking six evenly spaced samples catches those batches cheaply;
//! a batch is only discarded when every sample is exactly zero, so a real
//! reading can never be rejected by this check.

/// Batches at or below this size are never sampled.
pub const SAMPLING_THRESHOLD: usize = 10;

/// Indices sampled from a batch of `len` items: first, the four inner
/// fifths, and last.
#[must_use]
pub fn sample_indices(len: usize) -> [usize; 6] {
    let step = len / 5;
    [0, step, 2 * step, 3 * step, 4 * step, len.saturating_sub(1)]
}

/// Whether a batch looks like an all-zero hardware glitch.
///
/// Returns `false` for batches of [`SAMPLING_THRESHOLD`] items or fewer.
pub fn is_zero_glitch<T>(items: &[T], value: impl Fn(&T) -> f32) -> bool {
    if items.len() <= SAMPLING_THRESHOLD {
        return false;
    }
    sample_indices(items.len())
        .iter()
        .filter_map(|&index| items.get(index))
        .all(|item| value(item) == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_sample_first_quintiles_and_last() {
        assert_eq!(sample_indices(20), [0, 4, 8, 12, 16, 19]);
        assert_eq!(sample_indices(11), [0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn should_never_flag_small_batches() {
        let zeros = vec![0.0_f32; SAMPLING_THRESHOLD];
        assert!(!is_zero_glitch(&zeros, |v| *v));
    }

    #[test]
    fn should_flag_all_zero_samples_regardless_of_other_values() {
        let mut batch = vec![5.0_f32; 20];
        for index in sample_indices(batch.len()) {
            batch[index] = 0.0;
        }
        assert!(is_zero_glitch(&batch, |v| *v));
    }

    #[test]
    fn should_pass_when_any_sample_is_non_zero() {
        for hot in sample_indices(25) {
            let mut batch = vec![0.0_f32; 25];
            batch[hot] = 21.5;
            assert!(!is_zero_glitch(&batch, |v| *v), "sample {hot} is hot");
        }
    }

    #[test]
    fn should_read_values_through_accessor() {
        let batch: Vec<(u32, f32)> = (0..12).map(|i| (i, 0.0)).collect();
        assert!(is_zero_glitch(&batch, |(_, avg)| *avg));
    }
}
