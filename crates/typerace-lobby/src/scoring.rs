//! Server-side accuracy check for submitted final texts.
//!
//! Client telemetry is display-only. The win decision uses this score,
//! computed against the text the server assigned to the racer.

/// Percentage of positions in `assigned` that `final_input` reproduces.
///
/// Both strings are compared character by character (Unicode scalar
/// values) from the start. Characters typed past the end of the
/// assigned text don't count for or against. An empty assigned text
/// scores 0.
pub fn score_accuracy(final_input: &str, assigned: &str) -> f64 {
    let total = assigned.chars().count();
    if total == 0 {
        return 0.0;
    }

    let correct = final_input
        .chars()
        .zip(assigned.chars())
        .filter(|(typed, expected)| typed == expected)
        .count();

    100.0 * correct as f64 / total as f64
}

/// Returns `true` if `accuracy` meets the winning bar.
pub fn passes(accuracy: f64, threshold: f64) -> bool {
    accuracy >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_input_scores_full() {
        let text = "Rain had been falling on the valley for three days.";
        assert_eq!(score_accuracy(text, text), 100.0);
    }

    #[test]
    fn test_completely_different_input_scores_zero() {
        assert_eq!(score_accuracy("zzzz", "abcd"), 0.0);
    }

    #[test]
    fn test_short_input_counts_missing_chars_as_wrong() {
        assert_eq!(score_accuracy("abc", "abcdef"), 50.0);
    }

    #[test]
    fn test_extra_trailing_input_is_ignored() {
        assert_eq!(score_accuracy("abcdef and more", "abcdef"), 100.0);
    }

    #[test]
    fn test_empty_assigned_text_scores_zero() {
        assert_eq!(score_accuracy("anything", ""), 0.0);
        assert_eq!(score_accuracy("", ""), 0.0);
    }

    #[test]
    fn test_multibyte_characters_compare_per_char() {
        assert_eq!(score_accuracy("café", "café"), 100.0);
        assert_eq!(score_accuracy("cafe", "café"), 75.0);
    }

    #[test]
    fn test_passes_is_inclusive() {
        assert!(passes(70.0, 70.0));
        assert!(passes(99.0, 70.0));
        assert!(!passes(69.9, 70.0));
    }
}
