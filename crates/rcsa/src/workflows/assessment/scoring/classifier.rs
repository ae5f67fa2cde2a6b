use serde::{Deserialize, Serialize};

/// Qualitative band used for factor cells and overall score badges alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreBand {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl ScoreBand {
    /// Lower bounds are inclusive: 4 and above is High, 3 Medium, 2 Low.
    pub fn classify(score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score };

        if score >= 4.0 {
            Self::High
        } else if score >= 3.0 {
            Self::Medium
        } else if score >= 2.0 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    /// Classifies a stored score string; unparsable input reads as 0.
    pub fn classify_str(raw: &str) -> Self {
        Self::classify(raw.trim().parse::<f64>().unwrap_or(0.0))
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub const fn color_class(self) -> &'static str {
        match self {
            Self::VeryLow => "bg-green-100 text-green-800",
            Self::Low => "bg-yellow-100 text-yellow-800",
            Self::Medium => "bg-orange-100 text-orange-800",
            Self::High => "bg-red-100 text-red-800",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_inclusive_on_the_lower_value() {
        assert_eq!(ScoreBand::classify(4.0), ScoreBand::High);
        assert_eq!(ScoreBand::classify(3.99), ScoreBand::Medium);
        assert_eq!(ScoreBand::classify(3.0), ScoreBand::Medium);
        assert_eq!(ScoreBand::classify(2.99), ScoreBand::Low);
        assert_eq!(ScoreBand::classify(2.0), ScoreBand::Low);
        assert_eq!(ScoreBand::classify(1.99), ScoreBand::VeryLow);
        assert_eq!(ScoreBand::classify(0.0), ScoreBand::VeryLow);
        assert_eq!(ScoreBand::classify(5.0), ScoreBand::High);
    }

    #[test]
    fn unparsable_scores_classify_as_very_low() {
        assert_eq!(ScoreBand::classify_str(""), ScoreBand::VeryLow);
        assert_eq!(ScoreBand::classify_str("pending"), ScoreBand::VeryLow);
        assert_eq!(ScoreBand::classify_str("4.2"), ScoreBand::High);
        assert_eq!(ScoreBand::classify(f64::NAN), ScoreBand::VeryLow);
    }

    #[test]
    fn labels_serialize_with_display_text() {
        let json = serde_json::to_string(&ScoreBand::VeryLow).expect("serialize band");
        assert_eq!(json, "\"Very Low\"");
        assert_eq!(ScoreBand::High.label(), "High");
    }
}
