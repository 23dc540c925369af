//! Confidence presentation helpers.

use hacxorz_core::types::Confidence;

/// Advisory shown under low-confidence replies.
pub const LOW_CONFIDENCE_ADVICE: &str = "Lower confidence - verify information independently";

/// Narrowest rendered bar, so a near-zero score is still visible.
const MIN_BAR_WIDTH: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Low,
    Normal,
}

pub fn classify(confidence: Confidence, threshold: f64) -> ConfidenceLevel {
    if confidence.is_below(threshold) {
        ConfidenceLevel::Low
    } else {
        ConfidenceLevel::Normal
    }
}

/// Bar width as a percentage, clamped to `[10, 100]`.
pub fn bar_width(confidence: Confidence) -> u8 {
    confidence.value().clamp(MIN_BAR_WIDTH, Confidence::MAX).round() as u8
}

/// Text of the low-confidence warning nudge.
pub fn warning_text(confidence: Confidence) -> String {
    format!(
        "⚠️ AI confidence is ~{}% on this answer. Use your judgement.",
        confidence.percent()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(Confidence::new(45.0), 60.0), ConfidenceLevel::Low);
        assert_eq!(classify(Confidence::new(59.9), 60.0), ConfidenceLevel::Low);
        assert_eq!(classify(Confidence::new(60.0), 60.0), ConfidenceLevel::Normal);
        assert_eq!(classify(Confidence::new(85.0), 60.0), ConfidenceLevel::Normal);
    }

    #[test]
    fn test_bar_width_clamped() {
        assert_eq!(bar_width(Confidence::new(0.0)), 10);
        assert_eq!(bar_width(Confidence::new(9.4)), 10);
        assert_eq!(bar_width(Confidence::new(55.4)), 55);
        assert_eq!(bar_width(Confidence::new(100.0)), 100);
    }

    #[test]
    fn test_warning_text_rounds() {
        assert_eq!(
            warning_text(Confidence::new(39.6)),
            "⚠️ AI confidence is ~40% on this answer. Use your judgement."
        );
    }
}
