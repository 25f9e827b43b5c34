use std::fmt;

use serde::{Deserialize, Serialize};

use super::score::round2;

/// Qualitative rating tier for a 1-5 score.
///
/// | Range       | Code | Label              |
/// |-------------|------|--------------------|
/// | [0, 1.5]    | BS   | Basic              |
/// | (1.5, 2.5]  | ID   | Intermediate       |
/// | (2.5, 3.5]  | UI   | Upper Intermediate |
/// | (3.5, 4.5]  | AD   | Advanced           |
/// | (4.5, 5.0]  | EX   | Expert             |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    Basic,
    Intermediate,
    #[serde(rename = "Upper Intermediate")]
    UpperIntermediate,
    Advanced,
    Expert,
}

impl Rating {
    pub const ALL: [Rating; 5] = [
        Rating::Basic,
        Rating::Intermediate,
        Rating::UpperIntermediate,
        Rating::Advanced,
        Rating::Expert,
    ];

    /// Classify a score. The score is rounded to two decimals first, the
    /// same precision the report prints, so 3.504 is still Upper Intermediate.
    /// Returns `None` for NaN and anything outside [0, 5].
    pub fn classify(score: f64) -> Option<Rating> {
        if !(0.0..=5.0).contains(&score) {
            return None;
        }
        let rating = match round2(score) {
            s if s <= 1.5 => Rating::Basic,
            s if s <= 2.5 => Rating::Intermediate,
            s if s <= 3.5 => Rating::UpperIntermediate,
            s if s <= 4.5 => Rating::Advanced,
            _ => Rating::Expert,
        };
        Some(rating)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Rating::Basic => "BS",
            Rating::Intermediate => "ID",
            Rating::UpperIntermediate => "UI",
            Rating::Advanced => "AD",
            Rating::Expert => "EX",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Basic => "Basic",
            Rating::Intermediate => "Intermediate",
            Rating::UpperIntermediate => "Upper Intermediate",
            Rating::Advanced => "Advanced",
            Rating::Expert => "Expert",
        }
    }

    /// Range as printed in the rating-scale legend
    pub fn range(&self) -> &'static str {
        match self {
            Rating::Basic => "1.0 - 1.5",
            Rating::Intermediate => "1.6 - 2.5",
            Rating::UpperIntermediate => "2.6 - 3.5",
            Rating::Advanced => "3.6 - 4.5",
            Rating::Expert => "4.6 - 5.0",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Rating::Basic => "Performance is poor and very far to achieve goals.",
            Rating::Intermediate => "Performance needs improvement and almost to achieve goals.",
            Rating::UpperIntermediate => "Performance is average and break-even to achieve goals.",
            Rating::Advanced => "Performance exceeds target goals.",
            Rating::Expert => "Performance and goals achievement is exceptional.",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}
