//! Grain amplitude window.

// -------------------------------------------------------------------------------------------------

/// Evaluate a Hann window of the given length at the given sample index.
///
/// Tapers a grain's volume from 0 up to 1 around the midpoint and back down to 0, which
/// removes the clicks that hard grain boundaries otherwise produce. Evaluated once per
/// output sample per voice, so this stays branch-free and allocation-free.
///
/// Returns a gain in `[0.0, 1.0]`. Lengths below 2 have no meaningful window shape and
/// evaluate to 0.
#[inline]
pub fn hann(index: usize, length: usize) -> f32 {
    if length < 2 {
        return 0.0;
    }
    let phase = index as f32 / (length - 1) as f32;
    0.5 - 0.5 * (2.0 * std::f32::consts::PI * phase).cos()
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetry() {
        let length = 22050;
        for index in 0..length {
            let mirrored = hann(length - 1 - index, length);
            assert!(
                (hann(index, length) - mirrored).abs() < 1e-5,
                "window must be symmetric around its midpoint (index {index})"
            );
        }
    }

    #[test]
    fn endpoints_and_peak() {
        for length in [4, 101, 11025, 22050] {
            assert!(hann(0, length).abs() < 1e-6);
            assert!(hann(length - 1, length).abs() < 1e-3);

            // maximum sits at the midpoint
            let peak_index = (0..length)
                .max_by(|a, b| hann(*a, length).total_cmp(&hann(*b, length)))
                .unwrap();
            assert!(peak_index.abs_diff((length - 1) / 2) <= 1);
            assert!(hann(peak_index, length) <= 1.0);
        }
        // with enough samples the peak reaches the window's full gain
        assert!(hann(11025, 22050) > 0.9999);
    }

    #[test]
    fn degenerate_lengths() {
        assert_eq!(hann(0, 0), 0.0);
        assert_eq!(hann(0, 1), 0.0);
    }
}
