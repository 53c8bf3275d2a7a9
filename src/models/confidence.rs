//! The shared confidence adjustment rule.
//!
//! Explicit feedback and task outcomes move the same field by the same amounts.

/// Confidence assigned to every new memory or scoped entry.
pub const INITIAL_CONFIDENCE: f32 = 0.5;

/// Increase applied for a helpful rating or a successful outcome.
pub const HELPFUL_DELTA: f32 = 0.1;

/// Decrease applied for an unhelpful rating or a failed outcome.
pub const UNHELPFUL_DELTA: f32 = 0.15;

/// Clamps a confidence value into `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Applies one feedback signal to a confidence value.
#[must_use]
pub fn adjust_confidence(current: f32, helpful: bool) -> f32 {
    let delta = if helpful {
        HELPFUL_DELTA
    } else {
        -UNHELPFUL_DELTA
    };
    clamp_confidence(clamp_confidence(current) + delta)
}

/// Before/after view of a confidence change.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ConfidenceUpdate {
    /// Confidence before the signal.
    pub previous: f32,
    /// Confidence after the signal.
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0.5, true, 0.6 ; "helpful from initial")]
    #[test_case(0.6, false, 0.45 ; "unhelpful after success")]
    #[test_case(0.95, true, 1.0 ; "capped at one")]
    #[test_case(0.1, false, 0.0 ; "floored at zero")]
    fn test_adjust_confidence(current: f32, helpful: bool, expected: f32) {
        assert!((adjust_confidence(current, helpful) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_nan() {
        assert!(clamp_confidence(f32::NAN).abs() < f32::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_adjust_stays_in_unit_interval(current in -2.0f32..3.0, helpful in any::<bool>()) {
            let next = adjust_confidence(current, helpful);
            prop_assert!((0.0..=1.0).contains(&next));
        }

        #[test]
        fn prop_helpful_strictly_increases_below_one(current in 0.0f32..0.999) {
            prop_assert!(adjust_confidence(current, true) > current);
        }

        #[test]
        fn prop_unhelpful_strictly_decreases_above_zero(current in 0.001f32..=1.0) {
            prop_assert!(adjust_confidence(current, false) < current);
        }
    }
}
