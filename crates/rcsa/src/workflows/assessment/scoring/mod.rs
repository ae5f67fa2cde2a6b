//! Weighted aggregation of rating factors into one-decimal section scores.
//!
//! Inherent factors, controls, and residual factors all flow through
//! [`compute_weighted_score`]. Only entries carrying both a rating and a
//! weighting contribute, and the weighted total is normalized by the weight
//! actually present, so a half-filled section still yields a 0-5 score.

mod classifier;
mod manual_override;

pub use classifier::ScoreBand;
pub use manual_override::{ManualOverride, OverrideInputError};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const MAX_SCORE: f64 = 5.0;

/// Entry that can take part in a weighted section score.
pub trait WeightedFactor {
    fn id(&self) -> u32;
    /// Rating on the 1-5 scale, `None` while unrated.
    fn rating(&self) -> Option<f64>;
    /// Weighting percentage, `None` while unset.
    fn weight(&self) -> Option<f64>;
}

/// Section score held at one decimal place, serialized as e.g. `"3.5"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);

    pub fn new(raw: f64) -> Self {
        if !raw.is_finite() {
            return Self::ZERO;
        }
        Self(round_to_tenth(raw))
    }

    /// Clamps into the 0-5 rating scale before rounding.
    pub fn clamped(raw: f64) -> Self {
        if raw.is_nan() {
            return Self::ZERO;
        }
        Self::new(raw.clamp(0.0, MAX_SCORE))
    }

    /// Unparsable or missing input reads as zero.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim()
            .parse::<f64>()
            .map(Self::new)
            .unwrap_or(Self::ZERO)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn band(self) -> ScoreBand {
        ScoreBand::classify(self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawScore {
            Text(String),
            Number(f64),
        }

        match RawScore::deserialize(deserializer)? {
            RawScore::Number(value) => Ok(Score::new(value)),
            RawScore::Text(text) if text.trim().is_empty() => Ok(Score::ZERO),
            RawScore::Text(text) => text
                .trim()
                .parse::<f64>()
                .map(Score::new)
                .map_err(|_| serde::de::Error::custom(format!("invalid score '{text}'"))),
        }
    }
}

/// Rounds the exact binary value of `raw` to one decimal place.
///
/// A value that only looks like a tie (1.95 is stored as 1.9499...) rounds
/// down. True ties are odd multiples of 0.25 and round away from zero.
fn round_to_tenth(raw: f64) -> f64 {
    let quarters = raw * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        return (raw * 10.0).round() / 10.0;
    }
    format!("{raw:.1}").parse().unwrap_or(raw)
}

/// Weighted mean of the populated entries, normalized by the weight present.
pub fn compute_weighted_score<F: WeightedFactor>(factors: &[F]) -> Score {
    let (total, weight_sum) = factors
        .iter()
        .filter_map(|factor| Some((factor.rating()?, factor.weight()?)))
        .fold((0.0_f64, 0.0_f64), |(total, weight_sum), (rating, weight)| {
            (total + rating * (weight / 100.0), weight_sum + weight)
        });

    if weight_sum > 0.0 {
        Score::new(total / (weight_sum / 100.0))
    } else {
        Score::ZERO
    }
}

/// True when at least one entry would contribute to the weighted score.
pub fn has_rated_entries<F: WeightedFactor>(factors: &[F]) -> bool {
    factors
        .iter()
        .any(|factor| factor.rating().is_some() && factor.weight().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry {
        id: u32,
        rating: Option<f64>,
        weight: Option<f64>,
    }

    impl WeightedFactor for Entry {
        fn id(&self) -> u32 {
            self.id
        }

        fn rating(&self) -> Option<f64> {
            self.rating
        }

        fn weight(&self) -> Option<f64> {
            self.weight
        }
    }

    fn entry(id: u32, rating: Option<f64>, weight: Option<f64>) -> Entry {
        Entry { id, rating, weight }
    }

    #[test]
    fn empty_factor_list_scores_zero() {
        let factors: Vec<Entry> = Vec::new();
        assert_eq!(compute_weighted_score(&factors).to_string(), "0.0");
    }

    #[test]
    fn equal_weights_average_the_ratings() {
        let factors = vec![
            entry(1, Some(4.0), Some(25.0)),
            entry(2, Some(2.0), Some(25.0)),
            entry(3, Some(3.0), Some(25.0)),
            entry(4, Some(5.0), Some(25.0)),
        ];

        let score = compute_weighted_score(&factors);
        assert_eq!(score.to_string(), "3.5");
        assert_eq!(score.band(), ScoreBand::Medium);
    }

    #[test]
    fn partially_filled_lists_normalize_against_present_weight() {
        let factors = vec![
            entry(1, Some(4.0), Some(25.0)),
            entry(2, Some(2.0), Some(25.0)),
            entry(3, None, Some(25.0)),
            entry(4, Some(5.0), None),
        ];

        assert_eq!(compute_weighted_score(&factors).to_string(), "3.0");
    }

    #[test]
    fn uneven_weights_do_not_need_to_sum_to_one_hundred() {
        let factors = vec![
            entry(1, Some(5.0), Some(30.0)),
            entry(2, Some(1.0), Some(10.0)),
        ];

        // (5 * .3 + 1 * .1) / .4 = 4.0
        assert_eq!(compute_weighted_score(&factors).to_string(), "4.0");
    }

    #[test]
    fn zero_weights_and_empty_values_guard_division() {
        let zero_weights = vec![entry(1, Some(4.0), Some(0.0)), entry(2, Some(2.0), Some(0.0))];
        assert_eq!(compute_weighted_score(&zero_weights), Score::ZERO);

        let unrated = vec![entry(1, None, Some(50.0)), entry(2, None, Some(50.0))];
        assert_eq!(compute_weighted_score(&unrated).to_string(), "0.0");
        assert!(!has_rated_entries(&unrated));
    }

    #[test]
    fn half_way_scores_round_up() {
        let factors = vec![
            entry(1, Some(3.0), Some(25.0)),
            entry(2, Some(3.0), Some(25.0)),
            entry(3, Some(3.0), Some(25.0)),
            entry(4, Some(4.0), Some(25.0)),
        ];

        assert_eq!(compute_weighted_score(&factors).to_string(), "3.3");
    }

    #[test]
    fn near_ties_follow_the_stored_binary_value() {
        // 1 * .05 + 2 * .95 lands just under 1.95
        let low = vec![entry(1, Some(1.0), Some(5.0)), entry(2, Some(2.0), Some(95.0))];
        let score = compute_weighted_score(&low);
        assert_eq!(score.to_string(), "1.9");
        assert_eq!(score.band(), ScoreBand::VeryLow);

        let controls = vec![entry(1, Some(1.0), Some(5.0)), entry(2, Some(4.0), Some(95.0))];
        assert_eq!(compute_weighted_score(&controls).to_string(), "3.8");

        assert_eq!(Score::new(1.15).to_string(), "1.1");
        assert_eq!(Score::new(1.95).to_string(), "1.9");
        assert_eq!(Score::clamped(1.95).to_string(), "1.9");
    }

    #[test]
    fn exact_quarter_ties_round_away_from_zero() {
        assert_eq!(Score::new(3.25).to_string(), "3.3");
        assert_eq!(Score::new(0.75).to_string(), "0.8");
        assert_eq!(Score::new(2.25).band(), ScoreBand::Low);
        assert_eq!(Score::new(-0.25).to_string(), "-0.3");
    }

    #[test]
    fn score_serializes_as_one_decimal_string() {
        let json = serde_json::to_string(&Score::new(3.0)).expect("serialize score");
        assert_eq!(json, "\"3.0\"");

        let parsed: Score = serde_json::from_str("\"2.46\"").expect("parse text");
        assert_eq!(parsed.to_string(), "2.5");
        let numeric: Score = serde_json::from_str("4").expect("parse number");
        assert_eq!(numeric.to_string(), "4.0");
        assert!(serde_json::from_str::<Score>("\"high\"").is_err());
    }

    #[test]
    fn lenient_parse_defaults_to_zero() {
        assert_eq!(Score::parse_lenient("n/a"), Score::ZERO);
        assert_eq!(Score::parse_lenient(""), Score::ZERO);
        assert_eq!(Score::parse_lenient(" 4.25 ").to_string(), "4.3");
    }
}
